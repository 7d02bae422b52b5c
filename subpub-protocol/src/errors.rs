use std::io::Error;
use thiserror::Error;

use crate::op_code::OpCode;
use crate::status::StatusCode;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown opcode: {0}")]
    UnknownOpCode(u8),

    #[error("Unexpected opcode, expected: {expected:?} found: {found:?}")]
    UnexpectedOpCode { expected: OpCode, found: OpCode },

    #[error("Payload decode error: {0}")]
    PayloadError(String),

    #[error("Unknown frame type: {0}")]
    UnknownFrameType(u8),

    #[error("Unknown status code: {0}")]
    UnknownStatusCode(u8),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Frame payload of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("Checksum Mismatch expected: {expected} found: {found} ")]
    ChecksumMismatch { expected: u32, found: u32 },

    #[error("IoError :{0} ")]
    IoError(Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Request rejected ({status:?}): {message}")]
    Rejected { status: StatusCode, message: String },
}
