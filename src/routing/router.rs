//! Route table
//!
//! Routes are kept in registration order and the first entry whose method
//! and pattern both accept the request wins. There is no specificity
//! ranking: registering `/:name` before `/hello` shadows the latter. An
//! entry with no method matches every method; a method mismatch is not an
//! error, lookup simply moves on (an unmatched request is a plain 404).

use std::collections::HashMap;
use std::sync::Arc;

use hyper::Method;

use crate::error::HttpError;
use crate::handler::Handler;
use crate::routing::lazy::{HandlerLoader, LazyHandler};
use crate::routing::pattern::{PatternError, RoutePattern};

enum RouteTarget {
    Eager(Arc<dyn Handler>),
    Lazy(LazyHandler),
}

/// One registered route.
pub struct RouteEntry {
    method: Option<Method>,
    pattern: RoutePattern,
    target: RouteTarget,
}

impl RouteEntry {
    /// The handler behind this entry, loading it first if the route is
    /// lazy. Repeated calls return the same handler once a load succeeds.
    ///
    /// A failed load never leaks the loader's own status: whatever the
    /// loader reported, the caller sees a 500 with the original text kept
    /// as debug detail.
    pub async fn resolve(&self) -> Result<Arc<dyn Handler>, HttpError> {
        match &self.target {
            RouteTarget::Eager(handler) => Ok(Arc::clone(handler)),
            RouteTarget::Lazy(lazy) => {
                if !lazy.is_loaded().await {
                    crate::logger::log_lazy_load(self.pattern.raw());
                }
                lazy.resolve().await.map_err(|error| {
                    crate::logger::log_lazy_load_failed(self.pattern.raw(), &error);
                    let detail = error
                        .detail
                        .clone()
                        .unwrap_or_else(|| error.to_string());
                    let forced = HttpError::internal(detail);
                    if error.fatal {
                        forced.fatal()
                    } else {
                        forced
                    }
                })
            }
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        matches!(self.target, RouteTarget::Lazy(_))
    }
}

/// A successful lookup: the winning entry plus its parameter bindings.
pub struct RouteMatch<'r> {
    pub entry: &'r RouteEntry,
    pub params: HashMap<String, String>,
}

/// Ordered route table.
#[derive(Default)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a pattern. `method: None` matches any method.
    pub fn add(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PatternError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.routes.push(RouteEntry {
            method,
            pattern,
            target: RouteTarget::Eager(handler),
        });
        Ok(())
    }

    /// Register a loader that produces the handler on first use.
    pub fn add_lazy<L: HandlerLoader>(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        loader: L,
    ) -> Result<(), PatternError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.routes.push(RouteEntry {
            method,
            pattern,
            target: RouteTarget::Lazy(LazyHandler::new(loader)),
        });
        Ok(())
    }

    /// Find the first route accepting this method and path.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|entry| {
            if let Some(required) = &entry.method {
                if required != method {
                    return None;
                }
            }
            entry
                .pattern
                .match_path(path)
                .map(|params| RouteMatch { entry, params })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dispatch::RequestContext;
    use crate::response::ResponseValue;

    fn text_handler(body: &'static str) -> Arc<dyn Handler> {
        Arc::new(move |_ctx: Arc<RequestContext>| async move {
            Ok(Some(ResponseValue::text(body)))
        })
    }

    async fn call(entry: &RouteEntry) -> String {
        let handler = entry.resolve().await.expect("resolve");
        let ctx = Arc::new(RequestContext::new(Method::GET, "/"));
        match handler.call(ctx).await {
            Ok(Some(ResponseValue::Text(text))) => text,
            other => panic!("unexpected handler output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registration_order_beats_specificity() {
        let mut router = Router::new();
        router
            .add(Some(Method::GET), "/:name", text_handler("param"))
            .unwrap();
        router
            .add(Some(Method::GET), "/hello", text_handler("static"))
            .unwrap();

        let matched = router.lookup(&Method::GET, "/hello").expect("match");
        assert_eq!(matched.params.get("name").map(String::as_str), Some("hello"));
        assert_eq!(call(matched.entry).await, "param");
    }

    #[tokio::test]
    async fn test_method_mismatch_skips_to_later_entry() {
        let mut router = Router::new();
        router
            .add(Some(Method::GET), "/thing", text_handler("get"))
            .unwrap();
        router
            .add(Some(Method::POST), "/thing", text_handler("post"))
            .unwrap();

        let matched = router.lookup(&Method::POST, "/thing").expect("match");
        assert_eq!(call(matched.entry).await, "post");
    }

    #[test]
    fn test_method_mismatch_without_fallback_is_no_match() {
        let mut router = Router::new();
        router
            .add(Some(Method::GET), "/thing", text_handler("get"))
            .unwrap();
        assert!(router.lookup(&Method::DELETE, "/thing").is_none());
    }

    #[test]
    fn test_any_method_entry_matches_everything() {
        let mut router = Router::new();
        router.add(None, "/anything", text_handler("any")).unwrap();
        assert!(router.lookup(&Method::GET, "/anything").is_some());
        assert!(router.lookup(&Method::PATCH, "/anything").is_some());
    }

    #[tokio::test]
    async fn test_lazy_route_loads_once_across_lookups() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut router = Router::new();
        router
            .add_lazy(Some(Method::GET), "/lazy", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(text_handler("deferred"))
                }
            })
            .unwrap();

        for _ in 0..2 {
            let matched = router.lookup(&Method::GET, "/lazy").expect("match");
            assert!(matched.entry.is_lazy());
            assert_eq!(call(matched.entry).await, "deferred");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lazy_load_surfaces_as_500() {
        use hyper::StatusCode;

        let mut router = Router::new();
        router
            .add_lazy(Some(Method::GET), "/flaky", || async {
                Err(HttpError::new(StatusCode::BAD_REQUEST).with_message("loader said 400"))
            })
            .unwrap();

        let matched = router.lookup(&Method::GET, "/flaky").expect("match");
        let err = matched.entry.resolve().await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail.as_deref(), Some("400 Bad Request: loader said 400"));
    }

    #[test]
    fn test_unknown_path_is_no_match() {
        let router = Router::new();
        assert!(router.lookup(&Method::GET, "/missing").is_none());
    }
}
