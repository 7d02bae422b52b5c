use crate::ProtocolError;

/// Outcome of a request, numbered like the gRPC status codes they mirror.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StatusCode {
    Ok = 0,
    Cancelled = 1,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    FailedPrecondition = 9,
    Internal = 13,
    Unavailable = 14,
}

impl TryFrom<u8> for StatusCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StatusCode::Ok),
            1 => Ok(StatusCode::Cancelled),
            3 => Ok(StatusCode::InvalidArgument),
            4 => Ok(StatusCode::DeadlineExceeded),
            5 => Ok(StatusCode::NotFound),
            9 => Ok(StatusCode::FailedPrecondition),
            13 => Ok(StatusCode::Internal),
            14 => Ok(StatusCode::Unavailable),
            _ => Err(ProtocolError::UnknownStatusCode(value)),
        }
    }
}
