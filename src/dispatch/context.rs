//! Per-request context
//!
//! One `RequestContext` is created when a request enters the dispatcher and
//! dropped once the response has been handed to the transport. Every link
//! in the middleware chain sees the same context, so values written by an
//! early link (a start time, an authenticated identity) are readable by
//! later links and by the routed handler. Contexts are never shared across
//! requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, RwLock};

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode, Version};
use serde_json::Value;

use crate::error::HttpError;

/// Default body-read limit when a context is built without configuration.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10_485_760; // 10MB

/// Where the request body comes from. After the first successful read the
/// source is replaced by the buffered bytes, so repeated reads are cheap
/// and observe identical content.
enum BodySource {
    Empty,
    Buffered(Bytes),
    Incoming(Incoming),
}

/// Response adjustments a handler may make before (or instead of) returning
/// a value: an explicit status, extra headers, and the early-response slot.
#[derive(Default)]
struct ReplyState {
    status: Option<StatusCode>,
    headers: Vec<(HeaderName, HeaderValue)>,
    early: Option<Response<Full<Bytes>>>,
}

/// The per-request mutable bag threaded through the middleware chain.
pub struct RequestContext {
    method: Method,
    path: String,
    query_string: Option<String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    version: Version,
    remote_addr: Option<SocketAddr>,
    body: tokio::sync::Mutex<BodySource>,
    max_body_size: u64,
    params: RwLock<HashMap<String, String>>,
    store: RwLock<HashMap<String, Value>>,
    reply: Mutex<ReplyState>,
}

impl RequestContext {
    /// Build a context from a transport request. The body stays unread
    /// until a handler asks for it.
    pub(crate) fn from_request(
        req: Request<Incoming>,
        max_body_size: u64,
        remote_addr: SocketAddr,
    ) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query_string: parts.uri.query().map(ToString::to_string),
            query: parse_query(parts.uri.query()),
            headers: parts.headers,
            version: parts.version,
            remote_addr: Some(remote_addr),
            body: tokio::sync::Mutex::new(BodySource::Incoming(body)),
            max_body_size,
            params: RwLock::new(HashMap::new()),
            store: RwLock::new(HashMap::new()),
            reply: Mutex::new(ReplyState::default()),
        }
    }

    /// Build a synthetic context with an empty body, mainly for tests and
    /// for driving the dispatcher without a transport.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query_string) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (uri, None),
        };
        Self {
            method,
            path: path.to_string(),
            query: parse_query(query_string.as_deref()),
            query_string,
            headers: HeaderMap::new(),
            version: Version::HTTP_11,
            remote_addr: None,
            body: tokio::sync::Mutex::new(BodySource::Empty),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            params: RwLock::new(HashMap::new()),
            store: RwLock::new(HashMap::new()),
            reply: Mutex::new(ReplyState::default()),
        }
    }

    /// Attach a request header to a synthetic context.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Attach a buffered body to a synthetic context.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = tokio::sync::Mutex::new(BodySource::Buffered(body.into()));
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP version the request arrived with.
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Peer address, when the context came from a live connection.
    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Single query parameter, already percent-decoded.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The full query map.
    pub const fn queries(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request header as a string, `None` when absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Route parameter bound by the matched pattern.
    pub fn param(&self, name: &str) -> Option<String> {
        self.params.read().ok()?.get(name).cloned()
    }

    /// Snapshot of all route parameters.
    pub fn params(&self) -> HashMap<String, String> {
        self.params.read().map(|p| p.clone()).unwrap_or_default()
    }

    /// Bind route parameters. Called by the dispatcher just before the
    /// routed handler runs.
    pub(crate) fn set_params(&self, params: HashMap<String, String>) {
        if let Ok(mut slot) = self.params.write() {
            *slot = params;
        }
    }

    /// Write a value into the request-scoped store.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut store) = self.store.write() {
            store.insert(key.into(), value);
        }
    }

    /// Read a value written earlier in the chain.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.read().ok()?.get(key).cloned()
    }

    /// Override the status used for text replies. Structured replies are
    /// always 200; 204, 404 and error statuses are fixed by their variants.
    pub fn set_status(&self, status: StatusCode) {
        if let Ok(mut reply) = self.reply.lock() {
            reply.status = Some(status);
        }
    }

    /// Add a response header, applied after the reply's own headers.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        if let Ok(mut reply) = self.reply.lock() {
            reply.headers.push((name, value));
        }
    }

    /// Set an early response. The chain stops after the current link and
    /// the response is sent as-is; whatever the link returns afterwards is
    /// discarded.
    pub fn respond_with(&self, response: Response<Full<Bytes>>) {
        if let Ok(mut reply) = self.reply.lock() {
            reply.early = Some(response);
        }
    }

    pub(crate) fn take_early_response(&self) -> Option<Response<Full<Bytes>>> {
        self.reply.lock().ok().and_then(|mut reply| reply.early.take())
    }

    pub(crate) fn status_override(&self) -> Option<StatusCode> {
        self.reply.lock().ok().and_then(|reply| reply.status)
    }

    pub(crate) fn take_extra_headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        self.reply
            .lock()
            .map(|mut reply| std::mem::take(&mut reply.headers))
            .unwrap_or_default()
    }

    /// Read the whole request body, bounded by the configured limit.
    /// The bytes are cached: reading twice returns the same content.
    pub async fn read_body(&self) -> Result<Bytes, HttpError> {
        let mut body = self.body.lock().await;
        match std::mem::replace(&mut *body, BodySource::Empty) {
            BodySource::Empty => Ok(Bytes::new()),
            BodySource::Buffered(bytes) => {
                *body = BodySource::Buffered(bytes.clone());
                Ok(bytes)
            }
            BodySource::Incoming(incoming) => {
                let limit = usize::try_from(self.max_body_size).unwrap_or(usize::MAX);
                match Limited::new(incoming, limit).collect().await {
                    Ok(collected) => {
                        let bytes = collected.to_bytes();
                        *body = BodySource::Buffered(bytes.clone());
                        Ok(bytes)
                    }
                    Err(err) if err.is::<http_body_util::LengthLimitError>() => {
                        Err(HttpError::new(StatusCode::PAYLOAD_TOO_LARGE)
                            .with_message(format!("body exceeds {} bytes", self.max_body_size)))
                    }
                    Err(err) => Err(HttpError::internal(err)),
                }
            }
        }
    }

    /// Read the body and parse it as JSON. An empty body parses to `null`;
    /// malformed JSON is the client's fault and surfaces as 400.
    pub async fn read_body_json(&self) -> Result<Value, HttpError> {
        let bytes = self.read_body().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            HttpError::new(StatusCode::BAD_REQUEST)
                .with_status_message("Bad Request")
                .with_message(format!("invalid JSON body: {err}"))
        })
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    match query {
        Some(query) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing_decodes_values() {
        let ctx = RequestContext::new(Method::GET, "/message?name=Jean%20Luc&x=1");
        assert_eq!(ctx.path(), "/message");
        assert_eq!(ctx.query_string(), Some("name=Jean%20Luc&x=1"));
        assert_eq!(ctx.query("name"), Some("Jean Luc"));
        assert_eq!(ctx.query("x"), Some("1"));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn test_synthetic_context_defaults() {
        let ctx = RequestContext::new(Method::GET, "/plain");
        assert_eq!(ctx.query_string(), None);
        assert_eq!(ctx.remote_addr(), None);
        assert_eq!(ctx.version(), hyper::Version::HTTP_11);
    }

    #[test]
    fn test_store_round_trip() {
        let ctx = RequestContext::new(Method::GET, "/timed/work");
        ctx.insert("startTime", serde_json::json!(1000));
        assert_eq!(ctx.get("startTime"), Some(serde_json::json!(1000)));
        assert_eq!(ctx.get("other"), None);
    }

    #[test]
    fn test_early_response_taken_once() {
        let ctx = RequestContext::new(Method::GET, "/respond-with");
        let response = Response::builder()
            .status(202)
            .body(Full::new(Bytes::from("Early response")))
            .unwrap();
        ctx.respond_with(response);
        assert!(ctx.take_early_response().is_some());
        assert!(ctx.take_early_response().is_none());
    }

    #[tokio::test]
    async fn test_buffered_body_reads_are_idempotent() {
        let mut ctx = RequestContext::new(Method::POST, "/echo");
        ctx.set_body("hello");
        assert_eq!(ctx.read_body().await.unwrap(), Bytes::from("hello"));
        assert_eq!(ctx.read_body().await.unwrap(), Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_body_json_empty_is_null() {
        let ctx = RequestContext::new(Method::POST, "/echo");
        assert_eq!(ctx.read_body_json().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_body_json_malformed_is_bad_request() {
        let mut ctx = RequestContext::new(Method::POST, "/echo");
        ctx.set_body("{not json");
        let err = ctx.read_body_json().await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
