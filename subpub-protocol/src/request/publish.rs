use bytes::{BufMut, Bytes, BytesMut};

use crate::utils::{read_bytes, read_string};
use crate::ProtocolError;

//frame: [u32 subject_len][subject bytes][u32 data_len][data bytes]

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub subject: String,
    pub data: Bytes,
}

impl PublishRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8 + self.subject.len() + self.data.len());
        buf.put_u32(self.subject.len() as u32);
        buf.extend_from_slice(self.subject.as_bytes());
        buf.put_u32(self.data.len() as u32);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let subject = read_string(&mut buf, "subject")?;
        let data = read_bytes(&mut buf, "publish data")?;
        Ok(PublishRequest { subject, data })
    }
}
