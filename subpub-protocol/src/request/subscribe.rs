use bytes::{BufMut, Bytes, BytesMut};

use crate::utils::read_string;
use crate::ProtocolError;

//frame: [u32 subject_len][subject bytes]

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub subject: String,
}

impl SubscribeRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.subject.len());
        buf.put_u32(self.subject.len() as u32);
        buf.extend_from_slice(self.subject.as_bytes());
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let subject = read_string(&mut buf, "subject")?;
        Ok(SubscribeRequest { subject })
    }
}
