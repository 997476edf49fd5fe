//! Response and streaming body types.

use std::fmt;
use std::io::{self, Cursor, Read};

use super::{Headers, Method};

/// Header attached to responses replayed from the response store.
pub const FROM_CACHE_HEADER: &str = "Is-From-Cache";

/// Lazily-read response body.
///
/// The body is a single-pass stream. Network bodies read from the socket,
/// cached bodies read from a file handle owned by the store entry.
pub struct Body {
    reader: Box<dyn Read + Send>,
    content_length: Option<u64>,
}

impl Body {
    /// Wrap any reader as a body.
    pub fn from_reader(reader: impl Read + Send + 'static, content_length: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            content_length,
        }
    }

    /// In-memory body.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self::from_reader(Cursor::new(bytes), Some(len))
    }

    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Declared length, if known.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read the remaining body into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.content_length.unwrap_or(0).min(1 << 20) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// An HTTP response whose body has not been read yet.
#[derive(Debug)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub message: String,
    /// Protocol label such as `HTTP/1.1`.
    pub protocol: String,
    /// URL that produced this response (after redirects).
    pub url: String,
    /// Method of the request that produced this response.
    pub method: Method,
    /// Response headers.
    pub headers: Headers,
    /// When the request was sent, in epoch milliseconds.
    pub sent_at_millis: i64,
    /// When the response headers arrived, in epoch milliseconds.
    pub received_at_millis: i64,
    body: Body,
}

impl Response {
    /// Create a response with an empty body and no headers.
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            message: String::new(),
            protocol: "HTTP/1.1".to_string(),
            url: url.into(),
            method: Method::Get,
            headers: Headers::new(),
            sent_at_millis: 0,
            received_at_millis: 0,
            body: Body::empty(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timing(mut self, sent_at_millis: i64, received_at_millis: i64) -> Self {
        self.sent_at_millis = sent_at_millis;
        self.received_at_millis = received_at_millis;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 300, 301, 302, 303, 307 or 308.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 300..=303 | 307 | 308)
    }

    /// True when the response was replayed from the response store.
    pub fn is_from_cache(&self) -> bool {
        self.header(FROM_CACHE_HEADER) == Some("true")
    }

    /// Body length from the body itself, falling back to `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.body.content_length().or_else(|| {
            self.header("Content-Length")
                .and_then(|v| v.trim().parse::<u64>().ok())
        })
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Swap the body out, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::empty())
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Read the whole body into memory.
    pub fn bytes(self) -> io::Result<Vec<u8>> {
        self.body.into_bytes()
    }
}
