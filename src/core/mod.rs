pub mod config;
mod constants;
pub mod error;
pub mod handler;
pub mod registry;
mod subscriber;
pub mod subscription;
