//! yarde: yet another request-dispatch engine.
//!
//! A minimal HTTP dispatch pipeline on tokio and hyper. Applications
//! assemble an [`App`] from prefix-scoped middleware and pattern routes
//! (`:param`, `*`, `**`), optionally loading handlers lazily on first hit,
//! and serve it over the transport adapter in [`server`]. Handlers return
//! plain values; the [`response`] layer turns them (and any [`HttpError`])
//! into wire responses with uniform JSON error bodies.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod logger;
pub mod response;
pub mod routing;
pub mod server;

pub use app::{App, AppOptions};
pub use dispatch::{dispatch, handle_request, RequestContext};
pub use error::HttpError;
pub use handler::{Handler, HandlerResult};
pub use response::{ChunkStream, ResponseValue};
pub use routing::{RoutePattern, Router};
