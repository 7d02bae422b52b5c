use bytes::Bytes;
use subpub::SubPub;

/// Payload the gateway carries through the engine for each published message.
#[derive(Debug, Clone)]
pub struct Publication {
    pub data: Bytes,
    pub published_at: u64,
}

pub type SharedEngine = SubPub<Publication>;
