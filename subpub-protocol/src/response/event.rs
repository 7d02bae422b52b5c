use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::utils::{read_bytes, read_string};
use crate::ProtocolError;

/*
[ subject_len  : u32 ]
[ subject      : [u8] ]
[ published_at : u64 ]   unix epoch millis, stamped by the server
[ data_len     : u32 ]
[ data         : [u8] ]
*/

/// A message delivered to a live subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub subject: String,
    pub published_at: u64,
    pub data: Bytes,
}

impl Event {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.subject.len() + self.data.len());
        buf.put_u32(self.subject.len() as u32);
        buf.extend_from_slice(self.subject.as_bytes());
        buf.put_u64(self.published_at);
        buf.put_u32(self.data.len() as u32);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let subject = read_string(&mut buf, "event subject")?;
        if buf.remaining() < 8 {
            return Err(ProtocolError::PayloadError(
                "Insufficient data for event timestamp".into(),
            ));
        }
        let published_at = buf.get_u64();
        let data = read_bytes(&mut buf, "event data")?;
        Ok(Event {
            subject,
            published_at,
            data,
        })
    }
}
