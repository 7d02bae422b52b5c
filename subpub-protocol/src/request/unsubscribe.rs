use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;

/// Cancels the subscription created by the Subscribe request whose
/// correlation id was `subscription_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeRequest {
    pub subscription_id: u32,
}

impl UnsubscribeRequest {
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u32(self.subscription_id);
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        if buf.remaining() < 4 {
            return Err(ProtocolError::PayloadError(
                "Incomplete unsubscribe payload".into(),
            ));
        }
        Ok(UnsubscribeRequest {
            subscription_id: buf.get_u32(),
        })
    }
}
