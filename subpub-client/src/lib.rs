pub mod client;

pub use client::{ReceivedEvent, SubPubClient};
