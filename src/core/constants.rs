/// Pending messages a subscriber's mailbox holds before publishers wait.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

pub const DELIVERY_THREAD_PREFIX: &str = "subpub";
