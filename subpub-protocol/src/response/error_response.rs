use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::status::StatusCode;
use crate::utils::read_string;
use crate::ProtocolError;

//frame: [u8 status][u32 message_len][message bytes]

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ErrorResponse {
            status,
            message: message.into(),
        }
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.message.len());
        buf.put_u8(self.status as u8);
        buf.put_u32(self.message.len() as u32);
        buf.extend_from_slice(self.message.as_bytes());
        buf.freeze()
    }

    pub fn deserialize(mut buf: Bytes) -> Result<Self, ProtocolError> {
        if buf.remaining() < 1 {
            return Err(ProtocolError::PayloadError("Empty error payload".into()));
        }
        let status = StatusCode::try_from(buf.get_u8())?;
        let message = read_string(&mut buf, "error message")?;
        Ok(ErrorResponse { status, message })
    }

    pub fn into_error(self) -> ProtocolError {
        ProtocolError::Rejected {
            status: self.status,
            message: self.message,
        }
    }
}
