//! Transport abstraction for testability.
//!
//! The [`Transport`] trait performs exactly one HTTP exchange. Redirects,
//! caching and cancellation live above it, so a transport never follows a
//! `Location` header on its own.

mod blocking;

#[cfg(test)]
pub(crate) mod mock;

pub use blocking::ReqwestTransport;

use thiserror::Error;

use crate::http::{Request, Response};

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange did not finish within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The connection could not be established.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Any other failure while sending the request or reading headers.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The underlying client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Build(String),
}

/// Trait for HTTP transport operations.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling scripted transports in tests.
pub trait Transport: Send + Sync {
    /// Performs one HTTP exchange.
    ///
    /// # Arguments
    ///
    /// * `request` - The request to send
    ///
    /// # Returns
    ///
    /// The response with its body still unread, whatever its status code.
    fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}
