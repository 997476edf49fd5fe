//! `Content-Range` header parsing.

use std::sync::OnceLock;

use regex::Regex;

/// A parsed `Content-Range: bytes <start>-<end>/<total>` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte offset in the range.
    pub start: u64,
    /// Last byte offset in the range (inclusive).
    pub end: u64,
    /// Full resource length, `None` when the server sent `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Number of bytes in the range.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }
}

fn content_range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*bytes\s+(\d+)\s*-\s*(\d+)\s*/\s*(\d+|\*)\s*$").unwrap())
}

/// Parse a `Content-Range` header value.
///
/// Returns `None` for malformed values, for `start > end`, and when the
/// range ends at or past a known total.
///
/// # Examples
///
/// ```
/// use httpstash::download::parse_content_range;
///
/// let range = parse_content_range("bytes 100-199/200").unwrap();
/// assert_eq!(range.start, 100);
/// assert_eq!(range.end, 199);
/// assert_eq!(range.total, Some(200));
/// ```
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let captures = content_range_pattern().captures(value)?;
    let start = captures.get(1)?.as_str().parse::<u64>().ok()?;
    let end = captures.get(2)?.as_str().parse::<u64>().ok()?;
    let total = match captures.get(3)?.as_str() {
        "*" => None,
        digits => Some(digits.parse::<u64>().ok()?),
    };

    if start > end {
        return None;
    }
    if let Some(total) = total {
        if end >= total {
            return None;
        }
    }
    Some(ContentRange { start, end, total })
}
