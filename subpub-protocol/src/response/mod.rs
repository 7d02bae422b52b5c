mod error_response;
mod event;

pub use error_response::ErrorResponse;
pub use event::Event;
