//! Transfer progress and the cancellable copy loop.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::ProgressCallback;
use crate::error::{FetchError, FetchResult};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Snapshot of transfer or verification progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// Bytes processed so far, including bytes from earlier attempts.
    pub bytes: u64,
    /// Total bytes, when known.
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(bytes: u64, total: Option<u64>) -> Self {
        Self { bytes, total }
    }

    /// Percent complete (0-100), when the total is known.
    pub fn percent(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes as f64 / total as f64 * 100.0) as f32),
            None => None,
        }
    }
}

/// Copy `reader` into `file` at its current position.
///
/// The token is checked before every read so a cancelled transfer stops
/// within one buffer. Progress is reported as `offset + copied` against
/// `total`, which keeps resumed transfers continuous.
///
/// # Returns
///
/// The number of bytes copied by this call.
pub fn copy_with_progress(
    reader: &mut dyn Read,
    file: &mut File,
    path: &Path,
    offset: u64,
    total: Option<u64>,
    token: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> FetchResult<u64> {
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut copied: u64 = 0;

    loop {
        if token.is_cancelled() {
            return Err(FetchError::CallCanceled);
        }
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::io(path, e)),
        };
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| FetchError::io(path, e))?;
        copied += bytes_read as u64;

        if let Some(callback) = on_progress {
            callback(TransferProgress::new(offset + copied, total));
        }
    }

    writer.flush().map_err(|e| FetchError::io(path, e))?;
    Ok(copied)
}
