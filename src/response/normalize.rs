//! Terminal normalization
//!
//! Folds whatever a dispatch produced (a handler value, an early response,
//! no route at all, an error) into a concrete hyper response. Handlers and
//! middleware never build wire responses themselves; everything funnels
//! through here.

use std::convert::Infallible;

use futures_util::StreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::{header, Response, StatusCode};
use serde_json::Value;

use crate::dispatch::RequestContext;
use crate::error::HttpError;
use crate::response::value::{ChunkStream, ResponseValue};

/// Body type of every response leaving the engine. Streams are `Send` but
/// not `Sync`, hence the unsync variant.
pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

/// What a finished dispatch wants sent back.
pub enum ResponseIntent {
    /// A handler produced an explicit empty success.
    NoBody,
    /// No route matched, or the matched handler produced nothing.
    NotFound,
    Text(String),
    Json(Value),
    Stream(ChunkStream),
    /// Response installed via `respond_with`; sent verbatim.
    Early(Response<Full<Bytes>>),
    Error(HttpError),
}

impl From<ResponseValue> for ResponseIntent {
    fn from(value: ResponseValue) -> Self {
        match value {
            ResponseValue::Null => Self::NoBody,
            ResponseValue::Text(text) => Self::Text(text),
            ResponseValue::Json(value) => Self::Json(value),
            ResponseValue::Stream(stream) => Self::Stream(stream),
        }
    }
}

/// Build the wire response for a dispatch outcome.
///
/// A status set on the context applies to text returns only; JSON and
/// stream returns are always 200, `NoBody` is always 204, `NotFound`
/// always 404 and errors carry their own status. Early responses bypass
/// the context entirely.
pub fn normalize(
    intent: ResponseIntent,
    ctx: &RequestContext,
    debug: bool,
) -> Response<ResponseBody> {
    match intent {
        ResponseIntent::Early(response) => response.map(BodyExt::boxed_unsync),
        ResponseIntent::NoBody => build(
            StatusCode::NO_CONTENT,
            None,
            Empty::<Bytes>::new().boxed_unsync(),
            ctx,
        ),
        ResponseIntent::NotFound => build(
            StatusCode::NOT_FOUND,
            None,
            Empty::<Bytes>::new().boxed_unsync(),
            ctx,
        ),
        ResponseIntent::Text(text) => build(
            ctx.status_override().unwrap_or(StatusCode::OK),
            Some("text/plain"),
            Full::new(Bytes::from(text)).boxed_unsync(),
            ctx,
        ),
        ResponseIntent::Json(value) => match serde_json::to_vec(&value) {
            Ok(body) => build(
                StatusCode::OK,
                Some("application/json"),
                Full::new(Bytes::from(body)).boxed_unsync(),
                ctx,
            ),
            Err(e) => error_response(&HttpError::internal(e), ctx, debug),
        },
        ResponseIntent::Stream(stream) => {
            let frames = stream.map(|chunk| Ok::<_, Infallible>(Frame::data(chunk)));
            build(
                StatusCode::OK,
                None,
                StreamBody::new(frames).boxed_unsync(),
                ctx,
            )
        }
        ResponseIntent::Error(error) => error_response(&error, ctx, debug),
    }
}

/// Build the JSON error body response for an `HttpError`.
pub(crate) fn error_response(
    error: &HttpError,
    ctx: &RequestContext,
    debug: bool,
) -> Response<ResponseBody> {
    let body = serde_json::to_vec(&error.to_body_json(debug)).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to serialize error body: {e}"));
        b"{}".to_vec()
    });
    build(
        error.status,
        Some("application/json"),
        Full::new(Bytes::from(body)).boxed_unsync(),
        ctx,
    )
}

fn build(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: ResponseBody,
    ctx: &RequestContext,
) -> Response<ResponseBody> {
    let extra = ctx.take_extra_headers();
    let user_content_type = extra
        .iter()
        .any(|(name, _)| *name == header::CONTENT_TYPE);

    let mut builder = Response::builder().status(status);
    for (name, value) in extra {
        builder = builder.header(name, value);
    }
    if let Some(content_type) = content_type {
        if !user_content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error(status, &e);
        Response::new(Empty::<Bytes>::new().boxed_unsync())
    })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
