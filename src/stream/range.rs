//! `Range` header parsing
//!
//! Only the `bytes=<start>-[end]` form is honored. Anything malformed is
//! treated as if no header had been sent and the full resource is served.

/// Inclusive byte window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a resource of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// What the client asked for, resolved against the resource size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range: serve everything with 200
    Full,
    /// Serve the window with 206
    Partial(ByteRange),
    /// The window starts past the end of the resource (416)
    Unsatisfiable,
}

/// Parse `bytes=<start>-[end]` without knowing the resource size
fn parse_bounds(header: &str) -> Option<(u64, Option<u64>)> {
    let (unit, ranges) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    // Multi-range requests are answered with their first range.
    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;

    let start = start.trim();
    if start.is_empty() || !start.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let start: u64 = start.parse().ok()?;

    let end = end.trim();
    let end = if end.is_empty() {
        None
    } else if end.bytes().all(|b| b.is_ascii_digit()) {
        Some(end.parse().ok()?)
    } else {
        return None;
    };

    Some((start, end))
}

/// Resolve an optional `Range` header against a resource of `total` bytes
pub fn parse_range(header: Option<&str>, total: u64) -> RangeRequest {
    let Some((start, end)) = header.and_then(parse_bounds) else {
        return RangeRequest::Full;
    };

    if let Some(end) = end {
        if end < start {
            return RangeRequest::Full;
        }
    }
    if start >= total {
        return RangeRequest::Unsatisfiable;
    }

    let last = total - 1;
    let end = end.map_or(last, |e| e.min(last));
    RangeRequest::Partial(ByteRange { start, end })
}
