use subpub::{ErrorKind, SubPubError};
use subpub_protocol::{ErrorResponse, ProtocolError, StatusCode};

pub(crate) const EMPTY_REQUEST: &str = "empty request";

pub(crate) fn status_for(err: &SubPubError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::InvalidArgument,
        ErrorKind::Resource => StatusCode::FailedPrecondition,
        ErrorKind::State => StatusCode::Unavailable,
        ErrorKind::Cancelled => StatusCode::DeadlineExceeded,
        ErrorKind::Internal => StatusCode::Internal,
    }
}

/// Wire error for an engine failure, prefixed with what was attempted.
pub(crate) fn rejection(action: &str, err: &SubPubError) -> ErrorResponse {
    ErrorResponse::new(status_for(err), format!("{}: {}", action, err))
}

pub(crate) fn malformed(err: ProtocolError) -> ErrorResponse {
    ErrorResponse::new(StatusCode::InvalidArgument, err.to_string())
}

pub(crate) fn empty_request() -> ErrorResponse {
    ErrorResponse::new(StatusCode::InvalidArgument, EMPTY_REQUEST)
}
