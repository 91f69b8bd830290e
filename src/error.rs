//! Structured HTTP errors
//!
//! `HttpError` is the one error type handlers raise and the dispatcher
//! understands. It carries an explicit status plus optional human-readable
//! fields, mirroring the error object surfaced to clients:
//! `{statusCode, statusMessage, message?, data?}`. Unstructured failures
//! (I/O, serialization) convert into a generic 500 whose source text is
//! kept in `detail` and shown only in debug mode.

use hyper::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error raised by middleware, handlers, or the engine itself.
#[derive(Debug, Clone, Error)]
#[error("{}", display_error(.status, .status_message, .message))]
pub struct HttpError {
    /// Response status. Defaults to 500 for errors built from plain sources.
    pub status: StatusCode,
    /// Short status line override (e.g. "Bad Request").
    pub status_message: Option<String>,
    /// Longer human-readable description.
    pub message: Option<String>,
    /// Structured payload echoed to the client verbatim.
    pub data: Option<Value>,
    /// Advisory flag: the process should be treated as compromised.
    /// The engine logs and continues; supervision policy lives outside.
    pub fatal: bool,
    /// Source text of an unstructured failure. Serialized only in debug mode.
    pub detail: Option<String>,
}

impl HttpError {
    /// Create an error with an explicit status and nothing else set.
    #[must_use]
    pub const fn new(status: StatusCode) -> Self {
        Self {
            status,
            status_message: None,
            message: None,
            data: None,
            fatal: false,
            detail: None,
        }
    }

    /// Shorthand for the routing-failure status.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Wrap an unstructured failure: status 500, source kept as `detail`.
    pub fn internal(source: impl std::fmt::Display) -> Self {
        Self {
            detail: Some(source.to_string()),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }

    #[must_use]
    pub fn with_status_message(mut self, status_message: impl Into<String>) -> Self {
        self.status_message = Some(status_message.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Mark the error fatal (advisory only, see [`HttpError::fatal`]).
    #[must_use]
    pub const fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Status line text: the explicit `status_message`, or the canonical
    /// reason phrase for the status code.
    #[must_use]
    pub fn status_text(&self) -> &str {
        match &self.status_message {
            Some(m) => m.as_str(),
            None => self.status.canonical_reason().unwrap_or("Error"),
        }
    }

    /// JSON body sent to the client. `detail` is attached only when the
    /// app runs in debug mode.
    #[must_use]
    pub fn to_body_json(&self, debug: bool) -> Value {
        let mut body = serde_json::json!({
            "statusCode": self.status.as_u16(),
            "statusMessage": self.status_text(),
        });
        if let Some(message) = &self.message {
            body["message"] = Value::String(message.clone());
        }
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        if debug {
            if let Some(detail) = &self.detail {
                body["detail"] = Value::String(detail.clone());
            }
        }
        body
    }
}

impl Default for HttpError {
    /// An error with no explicit status defaults to 500.
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn display_error(
    status: &StatusCode,
    status_message: &Option<String>,
    message: &Option<String>,
) -> String {
    let text = match status_message {
        Some(m) => m.as_str(),
        None => status.canonical_reason().unwrap_or("Error"),
    };
    match message {
        Some(m) => format!("{} {text}: {m}", status.as_u16()),
        None => format!("{} {text}", status.as_u16()),
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        Self::internal(err)
    }
}
