mod publish;
mod subscribe;
mod unsubscribe;

pub use publish::PublishRequest;
pub use subscribe::SubscribeRequest;
pub use unsubscribe::UnsubscribeRequest;
