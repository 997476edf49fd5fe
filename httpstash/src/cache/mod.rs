//! Persistent response cache.
//!
//! - [`CacheMode`]: per-request choice between store and network
//! - [`ValidDuration`]: freshness window applied on write and read
//! - [`ResponseStore`]: disk-backed, size-bounded, LRU-evicted store
//! - [`Clock`]: time source for entry timestamps

mod body;
mod clock;
mod entry;
mod mode;
mod store;
mod validity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use mode::CacheMode;
pub use store::{ResponseStore, DEFAULT_MAX_SIZE_BYTES};
pub use validity::ValidDuration;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by explicit store operations.
///
/// Lookups and writes swallow these and degrade to cache misses.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on a store path.
    #[error("cache I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An entry exists but cannot be decoded.
    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
