//! Handler abstraction
//!
//! Middleware links and routed handlers share one shape: an async function
//! from the request context to `Result<Option<ResponseValue>, HttpError>`.
//! `Ok(None)` means "nothing to say" (the chain continues), `Ok(Some(_))`
//! is a terminal value, `Err(_)` is a terminal error. Async closures and
//! `async fn`s get the trait for free through the blanket impl.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dispatch::RequestContext;
use crate::error::HttpError;
use crate::response::ResponseValue;

/// What one link of the chain produces.
pub type HandlerResult = Result<Option<ResponseValue>, HttpError>;

/// Boxed future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// A middleware link or routed handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}
