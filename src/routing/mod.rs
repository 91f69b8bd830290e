//! Routing module
//!
//! Provides request routing capabilities including:
//! - Path pattern compilation (`:param`, `*`, `**` segments)
//! - Ordered first-match route lookup per method
//! - Lazy handler loading with coalesced concurrent loads

mod lazy;
mod pattern;
mod router;

pub use lazy::{HandlerLoader, LazyHandler, LoaderFuture};
pub use pattern::{PatternError, RoutePattern, WILDCARD_KEY};
pub use router::{RouteEntry, RouteMatch, Router};

pub(crate) use pattern::path_segments;
