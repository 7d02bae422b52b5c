use crate::ProtocolError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum OpCode {
    Subscribe = 1,
    Publish = 2,
    Unsubscribe = 3,
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OpCode::Subscribe),
            2 => Ok(OpCode::Publish),
            3 => Ok(OpCode::Unsubscribe),
            _ => Err(ProtocolError::UnknownOpCode(value)),
        }
    }
}
