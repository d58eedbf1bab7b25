//! Streaming proxy
//!
//! Serves lessons over HTTP with byte-range support, translating the
//! connector's fixed-size chunk downloads into byte-exact responses.

mod proxy;
mod range;
mod window;

pub use proxy::{stream_router, StreamState};
pub use range::{parse_range, ByteRange, RangeRequest};
pub use window::ByteWindow;
