use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubPubError {
    #[error("empty subject")]
    EmptySubject,

    #[error("no subscribers on such subject")]
    NoSubscribers,

    #[error("closed")]
    Closed,

    #[error("deadline exceeded before close started")]
    DeadlineExceeded,

    #[error("could not start delivery loop: {0}")]
    Spawn(#[from] io::Error),
}

/// Coarse classification callers map onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed.
    Validation,
    /// The engine is no longer accepting work.
    State,
    /// Nothing is there to serve the request right now.
    Resource,
    Cancelled,
    Internal,
}

impl SubPubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubPubError::EmptySubject => ErrorKind::Validation,
            SubPubError::Closed => ErrorKind::State,
            SubPubError::NoSubscribers => ErrorKind::Resource,
            SubPubError::DeadlineExceeded => ErrorKind::Cancelled,
            SubPubError::Spawn(_) => ErrorKind::Internal,
        }
    }
}
