/*
Process lifecycle around the gateway

Turns OS signals into the shutdown watch every task listens on

Closes the engine once the listener has stopped
*/
mod shutdown;

pub use shutdown::{close_engine, watch_signals};
