//! Resumable, integrity-verified downloads.
//!
//! This module provides:
//! - Range continuation of partial files via `Range: bytes=<len>-`
//! - A `<target>.cfg` sidecar recording the negotiated total length
//! - Progress callbacks that stay continuous across resumed attempts
//! - MD5, SHA-1 and SHA-256 verification in that order
//!
//! # Example
//!
//! ```ignore
//! use httpstash::download::DownloadRequest;
//!
//! let download = DownloadRequest::get("https://example.com/big.iso", "/tmp")
//!     .with_filename("big.iso")
//!     .with_resume(true)
//!     .with_sha256("e3b0c442...")
//!     .on_progress(|p| println!("{:?}%", p.percent()));
//! let path = client.download(download)?;
//! ```

mod checksum;
mod content_range;
mod engine;
mod filename;
mod progress;
mod state;

pub use checksum::{file_digest, verify_all, DigestAlgorithm, ExpectedDigests};
pub use content_range::{parse_content_range, ContentRange};
pub use engine::DownloadEngine;
pub use filename::{derive_filename, filename_from_content_disposition, filename_from_url};
pub use progress::{copy_with_progress, TransferProgress};
pub use state::{sidecar_path, DownloadState};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::http::Request;
use crate::resolver::ErrorCallback;

/// Receives transfer progress.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Receives verification progress for each digest step.
pub type VerifyCallback = Arc<dyn Fn(DigestAlgorithm, TransferProgress) + Send + Sync>;

/// Receives the final path of a completed download.
pub type DownloadSuccessCallback = Box<dyn FnOnce(&Path) + Send>;

/// A download: the request, where to put the file, and how to check it.
pub struct DownloadRequest {
    pub(crate) request: Request,
    pub(crate) directory: PathBuf,
    pub(crate) filename: Option<String>,
    pub(crate) overwrite: bool,
    pub(crate) resume: bool,
    pub(crate) expected: ExpectedDigests,
    pub(crate) on_progress: Option<ProgressCallback>,
    pub(crate) on_verify: Option<VerifyCallback>,
    pub(crate) on_success: Option<DownloadSuccessCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl DownloadRequest {
    /// Download `request` into `directory`.
    pub fn new(request: Request, directory: impl Into<PathBuf>) -> Self {
        Self {
            request,
            directory: directory.into(),
            filename: None,
            overwrite: false,
            resume: false,
            expected: ExpectedDigests::default(),
            on_progress: None,
            on_verify: None,
            on_success: None,
            on_error: None,
        }
    }

    /// GET `url` into `directory`.
    pub fn get(url: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self::new(Request::get(url), directory)
    }

    /// Target filename. Without one the name is derived from the response.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Delete any existing target and sidecar before transferring.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Continue a partial file with a range request.
    ///
    /// Needs a filename; `overwrite` takes precedence.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_expected_digests(mut self, expected: ExpectedDigests) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_md5(mut self, hex: impl Into<String>) -> Self {
        self.expected.md5 = Some(hex.into());
        self
    }

    pub fn with_sha1(mut self, hex: impl Into<String>) -> Self {
        self.expected.sha1 = Some(hex.into());
        self
    }

    pub fn with_sha256(mut self, hex: impl Into<String>) -> Self {
        self.expected.sha256 = Some(hex.into());
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_verify(
        mut self,
        callback: impl Fn(DigestAlgorithm, TransferProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_verify = Some(Arc::new(callback));
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&Path) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Receive the error of an async download.
    ///
    /// Synchronous downloads return the error instead and never invoke this.
    pub fn on_error(mut self, callback: impl FnOnce(&crate::FetchError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.request.tag.as_deref()
    }

    /// Target path when the filename is known up front.
    pub fn known_target(&self) -> Option<PathBuf> {
        self.filename.as_ref().map(|name| self.directory.join(name))
    }
}

impl std::fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.request.url)
            .field("directory", &self.directory)
            .field("filename", &self.filename)
            .field("overwrite", &self.overwrite)
            .field("resume", &self.resume)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}
