//! Middleware stack
//!
//! Middleware are handlers mounted under a path prefix. For each request
//! the stack yields, in mount order, every entry whose prefix covers the
//! request path on whole-segment boundaries: `/ti` does not cover `/time`.
//! The root prefix `/` covers every request.

use std::sync::Arc;

use crate::handler::Handler;
use crate::routing::path_segments;

struct MiddlewareEntry {
    prefix: String,
    segments: Vec<String>,
    handler: Arc<dyn Handler>,
}

/// Ordered list of prefix-scoped middleware.
#[derive(Default)]
pub struct MiddlewareStack {
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewareStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware under a prefix. Empty segments in the prefix are
    /// dropped, so `/` mounts at the root and `/auth/` equals `/auth`.
    pub fn mount(&mut self, prefix: &str, handler: Arc<dyn Handler>) {
        let segments = path_segments(prefix)
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        self.entries.push(MiddlewareEntry {
            prefix: prefix.to_string(),
            segments,
            handler,
        });
    }

    /// The middleware that apply to this path, in mount order.
    #[must_use]
    pub fn select(&self, path: &str) -> Vec<Arc<dyn Handler>> {
        let parts = path_segments(path);
        self.entries
            .iter()
            .filter(|entry| entry.applies_to(&parts))
            .map(|entry| Arc::clone(&entry.handler))
            .collect()
    }

    /// Registered prefixes, in mount order.
    #[must_use]
    pub fn prefixes(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.prefix.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MiddlewareEntry {
    fn applies_to(&self, parts: &[&str]) -> bool {
        if self.segments.len() > parts.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(parts)
            .all(|(own, req)| own.as_str() == *req)
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("entries", &self.entries.len())
            .finish()
    }
}
