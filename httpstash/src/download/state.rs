//! Download state and the `<target>.cfg` sidecar.
//!
//! The sidecar records the total length negotiated by the first transfer
//! attempt as a single line `ContentLength=<n>`. It exists exactly while a
//! partial download is in progress, so resumed attempts can report progress
//! against the original total.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIX: &str = ".cfg";
const CONTENT_LENGTH_KEY: &str = "ContentLength=";

/// Sidecar path for a target file: `<target>.cfg`.
pub fn sidecar_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIDECAR_SUFFIX);
    target.with_file_name(name)
}

/// State of one download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadState {
    /// Final file location.
    pub target_file: PathBuf,
    /// `<target>.cfg`.
    pub sidecar_file: PathBuf,
    /// Length of the partial file when the transfer started.
    pub resume_offset: u64,
    /// Total length from the sidecar, else from the response.
    pub total_expected_bytes: Option<u64>,
}

impl DownloadState {
    pub fn new(target_file: PathBuf) -> Self {
        let sidecar_file = sidecar_path(&target_file);
        Self {
            target_file,
            sidecar_file,
            resume_offset: 0,
            total_expected_bytes: None,
        }
    }

    /// Current length of the target file, 0 if it does not exist.
    pub fn existing_length(&self) -> u64 {
        fs::metadata(&self.target_file)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn target_exists(&self) -> bool {
        self.target_file.is_file()
    }

    /// Total length recorded in the sidecar, if any.
    pub fn read_sidecar(&self) -> Option<u64> {
        let content = fs::read_to_string(&self.sidecar_file).ok()?;
        content
            .lines()
            .find_map(|line| line.trim().strip_prefix(CONTENT_LENGTH_KEY))
            .and_then(|value| value.trim().parse::<u64>().ok())
    }

    pub fn write_sidecar(&self, total: u64) -> io::Result<()> {
        fs::write(&self.sidecar_file, format!("{}{}", CONTENT_LENGTH_KEY, total))
    }

    /// Remove the sidecar. A missing sidecar is not an error.
    pub fn remove_sidecar(&self) -> io::Result<()> {
        remove_if_exists(&self.sidecar_file)
    }

    /// Remove the target and its sidecar.
    pub fn discard(&self) -> io::Result<()> {
        remove_if_exists(&self.target_file)?;
        remove_if_exists(&self.sidecar_file)
    }

    /// Percent complete, when the total is known.
    pub fn percent(&self, bytes: u64) -> Option<f32> {
        match self.total_expected_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((bytes as f64 / total as f64 * 100.0) as f32),
            None => None,
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
