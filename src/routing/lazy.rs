//! Lazy handlers
//!
//! A route may register a loader instead of a handler. The loader runs on
//! the first request that resolves the route; concurrent requests arriving
//! mid-load await the same in-flight future instead of starting their own.
//! A successful load is cached for the lifetime of the route. A failed load
//! is not: the error goes to every coalesced waiter and the next request
//! runs the loader again.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::error::HttpError;
use crate::handler::Handler;

/// Future returned by a handler loader.
pub type LoaderFuture = BoxFuture<'static, Result<Arc<dyn Handler>, HttpError>>;

/// Produces a handler on demand. Implemented for any `Fn()` returning a
/// future of `Result<Arc<dyn Handler>, HttpError>`.
pub trait HandlerLoader: Send + Sync + 'static {
    fn load(&self) -> LoaderFuture;
}

impl<F, Fut> HandlerLoader for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn Handler>, HttpError>> + Send + 'static,
{
    fn load(&self) -> LoaderFuture {
        Box::pin(self())
    }
}

type SharedLoad = Shared<LoaderFuture>;

enum LoadState {
    Unloaded,
    Loading(SharedLoad),
    Loaded(Arc<dyn Handler>),
}

/// A handler slot that materializes through its loader on first use.
pub struct LazyHandler {
    loader: Box<dyn HandlerLoader>,
    state: Mutex<LoadState>,
}

impl LazyHandler {
    pub fn new<L: HandlerLoader>(loader: L) -> Self {
        Self {
            loader: Box::new(loader),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Whether a load has already completed. Advisory: the answer can be
    /// stale by the time the caller acts on it.
    pub(crate) async fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock().await, LoadState::Loaded(_))
    }

    /// Resolve to the loaded handler, running the loader if needed.
    ///
    /// The lock is held only to inspect or swap the state, never across the
    /// load itself, so concurrent callers all end up awaiting one shared
    /// future.
    pub async fn resolve(&self) -> Result<Arc<dyn Handler>, HttpError> {
        let shared = {
            let mut state = self.state.lock().await;
            match &*state {
                LoadState::Loaded(handler) => return Ok(Arc::clone(handler)),
                LoadState::Loading(shared) => shared.clone(),
                LoadState::Unloaded => {
                    let shared = self.loader.load().shared();
                    *state = LoadState::Loading(shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        {
            let mut state = self.state.lock().await;
            // Only the load we awaited may transition the state; a later
            // retry could have replaced it already.
            if let LoadState::Loading(current) = &*state {
                if current.ptr_eq(&shared) {
                    *state = match &result {
                        Ok(handler) => LoadState::Loaded(Arc::clone(handler)),
                        Err(_) => LoadState::Unloaded,
                    };
                }
            }
        }

        result
    }
}

impl std::fmt::Debug for LazyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyHandler").finish_non_exhaustive()
    }
}
