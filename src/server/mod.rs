//! Server module
//!
//! The hyper/socket2 transport adapter: a reuse-flagged TCP listener and the
//! accept loop that feeds every connection into the dispatcher.

mod listener;
mod serve;

pub use listener::create_reusable_listener;
pub use serve::serve;
