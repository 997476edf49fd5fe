//! httpstash - HTTP client layer with a persistent response cache
//!
//! This library resolves requests against a disk-backed response store
//! according to a per-request cache mode, and runs resumable downloads that
//! verify the finished file against expected digests.
//!
//! - [`Client`]: facade for sync and async calls, downloads and cancellation
//! - [`cache`]: response store, cache modes and freshness windows
//! - [`download`]: range continuation, sidecar files and verification
//! - [`calls`]: in-flight call registry

pub mod cache;
pub mod calls;
pub mod client;
pub mod config;
pub mod convert;
pub mod download;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod handle;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod transport;

pub use cache::{CacheMode, ValidDuration};
pub use calls::CallId;
pub use client::Client;
pub use config::{ClientConfig, ConfigError};
pub use download::{DownloadRequest, ExpectedDigests, TransferProgress};
pub use error::{FetchError, FetchResult};
pub use handle::CallHandle;
pub use http::{Method, Request, Response};
pub use resolver::FetchRequest;
