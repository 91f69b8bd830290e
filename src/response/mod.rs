//! Response module
//!
//! Provides the values handlers return and their translation to wire
//! responses:
//! - `ResponseValue`: null, text, JSON or a chunk stream
//! - `ResponseIntent` and `normalize`: terminal outcome to hyper response

mod normalize;
mod value;

pub use normalize::{normalize, ResponseBody, ResponseIntent};
pub use value::{ChunkStream, ResponseValue};
