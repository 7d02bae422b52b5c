/*
[ version: u8 ]
[ frame_type: u8 ]
[ correlation_id: u32 ]
[ payload_len: u32 ]
[ checksum : u32 ]
[ payload bytes... ]
*/

use bytes::{Buf, BufMut, Bytes, BytesMut};
use xxhash_rust::xxh32::xxh32;

use crate::ProtocolError;

pub const PROTOCOL_VERSION: u8 = 1;

pub const HEADER_LEN: usize = 14;

/// Upper bound for a single payload; anything larger is treated as a broken peer.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameType {
    Request = 1,
    Response = 2,
    Error = 3,
    Event = 4, // server push for a live subscription
}

impl TryFrom<u8> for FrameType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(FrameType::Request),
            2 => Ok(FrameType::Response),
            3 => Ok(FrameType::Error),
            4 => Ok(FrameType::Event),
            _ => Err(ProtocolError::UnknownFrameType(value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub version: u8,
    pub frame_type: FrameType,
    pub correlation_id: u32, // request id; for events, the subscription id
    pub payload: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, correlation_id: u32, payload: Bytes) -> Self {
        Frame {
            version: PROTOCOL_VERSION,
            frame_type,
            correlation_id,
            payload,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_LEN + self.payload.len());
        buf.put_u8(self.version);
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.correlation_id);
        buf.put_u32(self.payload.len() as u32);
        buf.put_u32(xxh32(&self.payload, 0));
        buf.extend_from_slice(&self.payload);
    }

    /// Returns `Ok(None)` until a whole frame is buffered. Consumed bytes are
    /// removed from `buf`.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut cursor = &buf[..];

        let version = cursor.get_u8();
        let frame_type_raw = cursor.get_u8();
        let correlation_id = cursor.get_u32();
        let payload_len = cursor.get_u32() as usize;
        let checksum_expected = cursor.get_u32();

        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::FrameTooLarge(payload_len));
        }
        if cursor.remaining() < payload_len {
            buf.reserve(HEADER_LEN + payload_len - buf.len());
            return Ok(None);
        }

        buf.advance(HEADER_LEN);
        let payload = buf.split_to(payload_len).freeze();
        let checksum_actual = xxh32(&payload, 0);

        if checksum_actual != checksum_expected {
            return Err(ProtocolError::ChecksumMismatch {
                expected: checksum_expected,
                found: checksum_actual,
            });
        }

        Ok(Some(Frame {
            version,
            frame_type: FrameType::try_from(frame_type_raw)?,
            correlation_id,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        buf
    }

    #[test]
    fn decode_waits_for_the_whole_frame() {
        let frame = Frame::new(FrameType::Request, 42, Bytes::from_static(b"payload"));
        let full = encoded(&frame);

        let mut partial = BytesMut::from(&full[..HEADER_LEN + 3]);
        assert!(Frame::decode(&mut partial).unwrap().is_none());
        assert_eq!(partial.len(), HEADER_LEN + 3, "partial input must be left untouched");

        partial.extend_from_slice(&full[HEADER_LEN + 3..]);
        let decoded = Frame::decode(&mut partial).unwrap().expect("frame");
        assert_eq!(decoded.correlation_id, 42);
        assert_eq!(decoded.frame_type, FrameType::Request);
        assert_eq!(&decoded.payload[..], b"payload");
        assert!(partial.is_empty());
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut buf = encoded(&Frame::new(FrameType::Event, 1, Bytes::from_static(b"a")));
        buf.extend_from_slice(&encoded(&Frame::new(FrameType::Event, 2, Bytes::new())));

        assert_eq!(Frame::decode(&mut buf).unwrap().unwrap().correlation_id, 1);
        assert_eq!(Frame::decode(&mut buf).unwrap().unwrap().correlation_id, 2);
        assert!(Frame::decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut buf = encoded(&Frame::new(FrameType::Response, 7, Bytes::from_static(b"data")));
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        assert!(matches!(
            Frame::decode(&mut buf),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn foreign_version_and_oversized_frames_are_rejected() {
        let mut buf = encoded(&Frame::new(FrameType::Request, 1, Bytes::new()));
        buf[0] = 9;
        assert!(matches!(
            Frame::decode(&mut buf),
            Err(ProtocolError::UnsupportedVersion(9))
        ));

        let mut buf = BytesMut::new();
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(FrameType::Request as u8);
        buf.put_u32(1);
        buf.put_u32((MAX_PAYLOAD_LEN + 1) as u32);
        buf.put_u32(0);
        assert!(matches!(
            Frame::decode(&mut buf),
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }
}
