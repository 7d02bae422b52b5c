use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::ProtocolError;
use crate::op_code::OpCode;

/// Body of a `Request` frame: `[op_code: u8][op data]`.
#[derive(Debug)]
pub struct RequestPayload {
    pub op_code: OpCode,
    pub data: Bytes,
}

/// Body of a `Response` frame, echoing the request's op code. `Error` frames
/// skip this wrapper and carry an [`ErrorResponse`](crate::ErrorResponse)
/// directly, since the failed request may not even have a readable op code.
#[derive(Debug)]
pub struct ResponsePayload {
    pub op_code: OpCode,
    pub data: Bytes,
}

fn encode(op_code: OpCode, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + data.len());
    buf.put_u8(op_code as u8);
    buf.extend_from_slice(data);
    buf.freeze()
}

fn decode(mut buf: Bytes, kind: &str) -> Result<(OpCode, Bytes), ProtocolError> {
    if buf.remaining() < 1 {
        return Err(ProtocolError::PayloadError(format!("Empty {} payload", kind)));
    }
    let op_code = OpCode::try_from(buf.get_u8())?;
    Ok((op_code, buf))
}

impl RequestPayload {
    pub fn new(op_code: OpCode, data: Bytes) -> Self {
        RequestPayload { op_code, data }
    }

    pub fn serialize(&self) -> Bytes {
        encode(self.op_code, &self.data)
    }

    pub fn deserialize(buf: Bytes) -> Result<Self, ProtocolError> {
        let (op_code, data) = decode(buf, "request")?;
        Ok(RequestPayload { op_code, data })
    }
}

impl ResponsePayload {
    /// A bare acknowledgement.
    pub fn ack(op_code: OpCode) -> Self {
        ResponsePayload {
            op_code,
            data: Bytes::new(),
        }
    }

    pub fn serialize(&self) -> Bytes {
        encode(self.op_code, &self.data)
    }

    pub fn deserialize(buf: Bytes) -> Result<Self, ProtocolError> {
        let (op_code, data) = decode(buf, "response")?;
        Ok(ResponsePayload { op_code, data })
    }

    /// Fails with [`ProtocolError::UnexpectedOpCode`] unless the response
    /// answers `expected`.
    pub fn expect_op(self, expected: OpCode) -> Result<Bytes, ProtocolError> {
        if self.op_code != expected {
            return Err(ProtocolError::UnexpectedOpCode {
                expected,
                found: self.op_code,
            });
        }
        Ok(self.data)
    }
}
