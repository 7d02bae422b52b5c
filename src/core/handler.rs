/// Receives every message published on the subject it was registered for.
///
/// A handler is owned by exactly one delivery loop and is invoked from that
/// loop's thread only, one message at a time. Closures taking the payload by
/// value implement it automatically.
pub trait MessageHandler<M>: Send + 'static {
    fn handle(&mut self, message: M);
}

impl<M, F> MessageHandler<M> for F
where
    F: FnMut(M) + Send + 'static,
{
    fn handle(&mut self, message: M) {
        self(message)
    }
}
