//! Dispatch module
//!
//! Drives a request through the engine:
//! - `RequestContext`: the per-request mutable bag
//! - `MiddlewareStack`: prefix-scoped middleware in mount order
//! - `handle_request` / `dispatch`: the chain driver and outcome folding

mod chain;
mod context;
mod dispatcher;

pub use chain::MiddlewareStack;
pub use context::{RequestContext, DEFAULT_MAX_BODY_SIZE};
pub use dispatcher::{dispatch, handle_request};
