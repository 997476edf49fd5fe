//! Target filename derivation for downloads without an explicit name.

use std::sync::OnceLock;

use regex::Regex;

use crate::http::Response;

fn extended_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?i)filename\*\s*=\s*utf-8''([^;]+)"#).unwrap())
}

fn plain_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?i)filename\s*=\s*(?:"([^"]*)"|([^;]+))"#).unwrap())
}

/// Decode `%XX` escapes. Invalid escapes are kept literally.
pub(crate) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Strip directory components and reject names that cannot be a file.
fn sanitize(name: &str) -> Option<String> {
    let name = name.trim().trim_matches('"');
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Filename from a `Content-Disposition` value.
///
/// `filename*=UTF-8''...` wins over `filename=...`.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    if let Some(captures) = extended_filename_pattern().captures(value) {
        if let Some(name) = captures.get(1).and_then(|m| sanitize(&percent_decode(m.as_str()))) {
            return Some(name);
        }
    }
    let captures = plain_filename_pattern().captures(value)?;
    let raw = captures.get(1).or_else(|| captures.get(2))?;
    sanitize(raw.as_str())
}

/// Filename from the last non-empty path segment of `url`, percent-decoded.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    sanitize(&percent_decode(segment))
}

/// Choose a filename for `response`, fetched from `url`.
///
/// Falls back to `unknown_<now_millis>`.
pub fn derive_filename(response: &Response, url: &str, now_millis: i64) -> String {
    response
        .header("Content-Disposition")
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| format!("unknown_{}", now_millis))
}
