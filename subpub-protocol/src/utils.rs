use bytes::{Buf, Bytes};

use crate::ProtocolError;

/// Reads a `[u32 len][bytes]` field, naming `what` in the error.
pub fn read_bytes(buf: &mut Bytes, what: &str) -> Result<Bytes, ProtocolError> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::PayloadError(format!(
            "Insufficient data for {} length",
            what
        )));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::PayloadError(format!(
            "Insufficient data for {}",
            what
        )));
    }
    Ok(buf.split_to(len))
}

/// Same as [`read_bytes`] for UTF-8 text.
pub fn read_string(buf: &mut Bytes, what: &str) -> Result<String, ProtocolError> {
    let raw = read_bytes(buf, what)?;
    String::from_utf8(raw.to_vec())
        .map_err(|_| ProtocolError::PayloadError(format!("Invalid UTF-8 in {}", what)))
}
