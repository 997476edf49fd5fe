//! Error types for fetch and download operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::StoreError;
use crate::convert::ConvertError;
use crate::download::DigestAlgorithm;
use crate::transport::TransportError;

/// Errors that can occur while resolving a request or running a download.
#[derive(Debug, Error)]
pub enum FetchError {
    /// `OnlyCache` was requested but no fresh entry exists.
    #[error("cache not found")]
    CacheMiss,

    /// `NetworkElseCache` failed on the network and found no cache entry.
    #[error("{network} and cache not found")]
    CompositeFallback {
        /// The network failure that triggered the fallback.
        network: Box<FetchError>,
    },

    /// A redirect response had no usable `Location` header.
    #[error("redirect from {url} has no usable Location header")]
    RedirectLocationMissing { url: String },

    /// The redirect chain exceeded the hop cap.
    #[error("too many redirects (more than {max}) starting at {url}")]
    TooManyRedirects { url: String, max: usize },

    /// The server answered with a non-2xx, non-redirect status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// No converter is registered for the requested result type.
    #[error("no converter registered for {type_name}")]
    ConverterNotFound { type_name: &'static str },

    /// The converter ran and failed.
    #[error(transparent)]
    Conversion(#[from] ConvertError),

    /// Missing or malformed `Content-Range`, or a 416 with no partial file.
    #[error("content range error: {0}")]
    ContentRange(String),

    /// A downloaded file did not match an expected digest.
    #[error("{algorithm} mismatch for {}: expected {expected}, got {actual}", .path.display())]
    FileVerification {
        algorithm: DigestAlgorithm,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The call was cancelled by handle, tag or `cancel_all`.
    #[error("call canceled")]
    CallCanceled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A local file operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An explicit store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The worker thread running an async call panicked.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl FetchError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for [`FetchError::CallCanceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::CallCanceled)
    }
}

/// Result alias for fetch and download operations.
pub type FetchResult<T> = Result<T, FetchError>;
