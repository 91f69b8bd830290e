//! Application surface
//!
//! An `App` is what application code assembles at startup: prefix-scoped
//! middleware, the route table, engine options, and the request/error
//! observers. Registration borrows the app mutably; once serving starts the
//! app is shared immutably (behind `Arc`) and the dispatcher only reads it.

use std::sync::Arc;

use hyper::Method;

use crate::dispatch::{MiddlewareStack, RequestContext, DEFAULT_MAX_BODY_SIZE};
use crate::error::HttpError;
use crate::handler::Handler;
use crate::routing::{HandlerLoader, PatternError, Router};

type RequestObserver = Box<dyn Fn(&RequestContext) + Send + Sync>;
type ErrorObserver = Box<dyn Fn(&HttpError, &RequestContext) + Send + Sync>;

/// Engine options, fixed at construction.
pub struct AppOptions {
    /// Include unstructured error detail in error bodies.
    pub debug: bool,
    /// Request body read limit in bytes. Larger bodies fail with 413.
    pub max_body_size: u64,
    /// Access log format (`combined`, `common` or `json`). `None` disables
    /// the per-request log line.
    pub access_log: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            access_log: None,
        }
    }
}

/// The registration boundary of the engine.
pub struct App {
    middleware: MiddlewareStack,
    router: Router,
    options: AppOptions,
    on_request: Option<RequestObserver>,
    on_error: Option<ErrorObserver>,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    #[must_use]
    pub fn with_options(options: AppOptions) -> Self {
        Self {
            middleware: MiddlewareStack::new(),
            router: Router::new(),
            options,
            on_request: None,
            on_error: None,
        }
    }

    /// Mount middleware under a path prefix. Prefix `"/"` runs for every
    /// request; other prefixes are compared on whole path segments.
    pub fn mount<H: Handler>(&mut self, prefix: &str, handler: H) {
        self.middleware.mount(prefix, Arc::new(handler));
    }

    /// Register a handler for a method and pattern. Routes are tried in
    /// registration order; the first structural match wins.
    pub fn route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), PatternError> {
        self.router.add(Some(method), pattern, Arc::new(handler))
    }

    /// Register a handler that matches every method.
    pub fn any<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), PatternError> {
        self.router.add(None, pattern, Arc::new(handler))
    }

    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), PatternError> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), PatternError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Register a loader that produces the handler on the first matching
    /// request; the loaded handler is cached for the app's lifetime.
    pub fn route_lazy<L: HandlerLoader>(
        &mut self,
        method: Method,
        pattern: &str,
        loader: L,
    ) -> Result<(), PatternError> {
        self.router.add_lazy(Some(method), pattern, loader)
    }

    /// Observe every request as it enters the dispatcher.
    pub fn on_request<F>(&mut self, observer: F)
    where
        F: Fn(&RequestContext) + Send + Sync + 'static,
    {
        self.on_request = Some(Box::new(observer));
    }

    /// Observe terminal errors. The response is already computed when the
    /// observer runs; it cannot be changed from here.
    pub fn on_error<F>(&mut self, observer: F)
    where
        F: Fn(&HttpError, &RequestContext) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(observer));
    }

    #[must_use]
    pub const fn debug(&self) -> bool {
        self.options.debug
    }

    #[must_use]
    pub const fn max_body_size(&self) -> u64 {
        self.options.max_body_size
    }

    /// The configured access log format, `None` when logging is off.
    #[must_use]
    pub fn access_log_format(&self) -> Option<&str> {
        self.options.access_log.as_deref()
    }

    pub(crate) const fn middleware(&self) -> &MiddlewareStack {
        &self.middleware
    }

    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }

    pub(crate) fn notify_request(&self, ctx: &RequestContext) {
        if let Some(observer) = &self.on_request {
            observer(ctx);
        }
    }

    pub(crate) fn notify_error(&self, error: &HttpError, ctx: &RequestContext) {
        if let Some(observer) = &self.on_error {
            observer(error, ctx);
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("middleware", &self.middleware.len())
            .field("routes", &self.router.len())
            .field("debug", &self.options.debug)
            .finish_non_exhaustive()
    }
}
