pub mod errors;
pub mod frame;
pub mod payload;
pub mod status;
mod op_code;
mod request;
mod response;
mod utils;

// Public re-exports for easy access
pub use errors::ProtocolError;
pub use frame::{Frame, FrameType, PROTOCOL_VERSION};
pub use payload::{RequestPayload, ResponsePayload};
pub use status::StatusCode;

pub use request::{PublishRequest, SubscribeRequest, UnsubscribeRequest};
pub use response::{ErrorResponse, Event};

pub use op_code::OpCode;
