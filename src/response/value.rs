//! Handler return values
//!
//! A handler produces at most one `ResponseValue`; returning `None` instead
//! signals "nothing to say" and lets the chain continue. The dispatcher
//! folds the first value (or error) into a terminal response intent.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, Stream};
use hyper::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;

/// Value produced by a middleware link or routed handler.
pub enum ResponseValue {
    /// Explicit empty result, rendered as 204 No Content.
    Null,
    /// Plain text (raw HTML included, never escaped), rendered as
    /// `text/plain`.
    Text(String),
    /// Structured data, rendered as `application/json`.
    Json(Value),
    /// Chunked body, streamed in produced order without buffering.
    Stream(ChunkStream),
}

impl ResponseValue {
    /// Text value from anything string-like.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// JSON value from any serializable type. Serialization failures are
    /// unstructured 500s, so handlers can end with `ResponseValue::json(&v)?`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HttpError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl std::fmt::Debug for ResponseValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An ordered sequence of body chunks, produced lazily.
///
/// The transport sends each chunk as it arrives; the whole body is never
/// assembled in memory first.
pub struct ChunkStream {
    inner: Pin<Box<dyn Stream<Item = Bytes> + Send + 'static>>,
}

impl ChunkStream {
    /// Wrap any `Bytes` stream.
    pub fn new(stream: impl Stream<Item = Bytes> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Stream a fixed sequence of chunks.
    pub fn from_iter<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes> + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(chunks.into_iter().map(Into::into)))
    }

    /// Stream chunks from a channel; the stream ends when the sender side
    /// is dropped.
    pub fn from_receiver(receiver: tokio::sync::mpsc::Receiver<Bytes>) -> Self {
        Self::new(stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (chunk, receiver))
        }))
    }
}

impl Stream for ChunkStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
