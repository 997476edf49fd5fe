//! Digest calculation and verification for downloaded files.
//!
//! Supplied digests are checked in a fixed order, MD5 then SHA-1 then
//! SHA-256, and every supplied digest must match.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{TransferProgress, VerifyCallback};
use crate::error::{FetchError, FetchResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms, in verification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
        })
    }
}

/// Expected digests for a download. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedDigests {
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

impl ExpectedDigests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_md5(mut self, hex: impl Into<String>) -> Self {
        self.md5 = Some(hex.into());
        self
    }

    pub fn with_sha1(mut self, hex: impl Into<String>) -> Self {
        self.sha1 = Some(hex.into());
        self
    }

    pub fn with_sha256(mut self, hex: impl Into<String>) -> Self {
        self.sha256 = Some(hex.into());
        self
    }

    /// Supplied digests in verification order.
    pub fn checks(&self) -> Vec<(DigestAlgorithm, &str)> {
        [
            (DigestAlgorithm::Md5, self.md5.as_deref()),
            (DigestAlgorithm::Sha1, self.sha1.as_deref()),
            (DigestAlgorithm::Sha256, self.sha256.as_deref()),
        ]
        .into_iter()
        .filter_map(|(algorithm, digest)| {
            digest
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(|h| (algorithm, h))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.checks().is_empty()
    }
}

/// Hash a file with `D`, polling `token` between reads.
///
/// `progress` receives `(bytes_hashed, file_length)` after each read.
fn hash_file<D: Digest>(
    path: &Path,
    token: &CancellationToken,
    progress: &mut dyn FnMut(u64, u64),
) -> FetchResult<String> {
    let mut file = File::open(path).map_err(|e| FetchError::io(path, e))?;
    let total = file.metadata().map_err(|e| FetchError::io(path, e))?.len();

    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut hashed: u64 = 0;

    loop {
        if token.is_cancelled() {
            return Err(FetchError::CallCanceled);
        }
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::io(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
        hashed += bytes_read as u64;
        progress(hashed, total);
    }
    if total == 0 {
        progress(0, 0);
    }

    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Calculate the lowercase hex digest of a file.
///
/// # Arguments
///
/// * `algorithm` - Digest to compute
/// * `path` - File to hash
/// * `token` - Cancellation token polled between reads
/// * `progress` - Receives `(bytes_hashed, file_length)`
pub fn file_digest(
    algorithm: DigestAlgorithm,
    path: &Path,
    token: &CancellationToken,
    progress: &mut dyn FnMut(u64, u64),
) -> FetchResult<String> {
    match algorithm {
        DigestAlgorithm::Md5 => hash_file::<Md5>(path, token, progress),
        DigestAlgorithm::Sha1 => hash_file::<Sha1>(path, token, progress),
        DigestAlgorithm::Sha256 => hash_file::<Sha256>(path, token, progress),
    }
}

/// Verify every supplied digest, stopping at the first mismatch.
///
/// Comparison is case-insensitive. Files are never removed here.
pub fn verify_all(
    path: &Path,
    expected: &ExpectedDigests,
    token: &CancellationToken,
    on_verify: Option<&VerifyCallback>,
) -> FetchResult<()> {
    for (algorithm, expected_hex) in expected.checks() {
        let mut report = |bytes: u64, total: u64| {
            if let Some(callback) = on_verify {
                callback(algorithm, TransferProgress::new(bytes, Some(total)));
            }
        };
        let actual = file_digest(algorithm, path, token, &mut report)?;

        if !actual.eq_ignore_ascii_case(expected_hex) {
            return Err(FetchError::FileVerification {
                algorithm,
                path: path.to_path_buf(),
                expected: expected_hex.to_ascii_lowercase(),
                actual,
            });
        }
        debug!(path = %path.display(), %algorithm, "Digest verified");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn no_progress() -> impl FnMut(u64, u64) {
        |_, _| {}
    }

    #[test]
    fn test_empty_file_digests() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        fs::write(&path, b"").unwrap();
        let token = CancellationToken::new();

        assert_eq!(file_digest(DigestAlgorithm::Md5, &path, &token, &mut no_progress()).unwrap(), EMPTY_MD5);
        assert_eq!(file_digest(DigestAlgorithm::Sha1, &path, &token, &mut no_progress()).unwrap(), EMPTY_SHA1);
        assert_eq!(file_digest(DigestAlgorithm::Sha256, &path, &token, &mut no_progress()).unwrap(), EMPTY_SHA256);
    }

    #[test]
    fn test_verify_all_passes_case_insensitively() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        fs::write(&path, b"").unwrap();

        let expected = ExpectedDigests::new()
            .with_md5(EMPTY_MD5.to_uppercase())
            .with_sha1(EMPTY_SHA1)
            .with_sha256(EMPTY_SHA256);
        verify_all(&path, &expected, &CancellationToken::new(), None).unwrap();
    }

    #[test]
    fn test_every_digest_is_checked() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello");
        fs::write(&path, b"hello").unwrap();

        // MD5 passes, SHA-256 does not: the mismatch must still be reported.
        let expected = ExpectedDigests::new()
            .with_md5("5d41402abc4b2a76b9719d911017c592")
            .with_sha256(EMPTY_SHA256);
        let err = verify_all(&path, &expected, &CancellationToken::new(), None).unwrap_err();
        match err {
            FetchError::FileVerification { algorithm, actual, .. } => {
                assert_eq!(algorithm, DigestAlgorithm::Sha256);
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(path.exists());
    }

    #[test]
    fn test_verify_reports_progress_in_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello");
        fs::write(&path, b"hello").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: VerifyCallback = Arc::new(move |algorithm: DigestAlgorithm, progress: TransferProgress| {
            sink.lock().push((algorithm, progress.bytes, progress.total));
        });

        let expected = ExpectedDigests::new()
            .with_sha256(HELLO_SHA256)
            .with_md5("5d41402abc4b2a76b9719d911017c592");
        verify_all(&path, &expected, &CancellationToken::new(), Some(&callback)).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                (DigestAlgorithm::Md5, 5, Some(5)),
                (DigestAlgorithm::Sha256, 5, Some(5)),
            ]
        );
    }

    #[test]
    fn test_blank_digests_are_skipped() {
        let expected = ExpectedDigests::new().with_md5("").with_sha1("  ");
        assert!(expected.is_empty());
    }

    #[test]
    fn test_cancelled_hashing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data");
        fs::write(&path, vec![1u8; 1024]).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = file_digest(DigestAlgorithm::Sha256, &path, &token, &mut no_progress()).unwrap_err();
        assert!(err.is_canceled());
    }
}
