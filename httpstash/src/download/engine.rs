//! Download state machine.
//!
//! ```text
//! NEGOTIATING -> { FULL_TRANSFER | RESUMED_TRANSFER | ALREADY_COMPLETE | RANGE_REJECTED }
//!             -> VERIFYING -> { DONE | FAILED }
//! ```
//!
//! Redirects re-enter negotiation against the new location with the same
//! download parameters.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::checksum::verify_all;
use super::content_range::parse_content_range;
use super::filename::derive_filename;
use super::progress::{copy_with_progress, TransferProgress};
use super::state::DownloadState;
use super::DownloadRequest;
use crate::error::{FetchError, FetchResult};
use crate::executor::{redirect_target, DEFAULT_MAX_REDIRECTS};
use crate::http::{Request, Response};
use crate::transport::Transport;

/// Runs downloads over a [`Transport`].
#[derive(Clone)]
pub struct DownloadEngine {
    transport: Arc<dyn Transport>,
    max_redirects: usize,
}

impl DownloadEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Run `download` to completion and return the final file path.
    ///
    /// Any outcome observed while `token` is cancelled is reported as
    /// [`FetchError::CallCanceled`]. Partial files and sidecars are left in
    /// place on every failure so a later attempt can resume.
    pub fn run(&self, download: &DownloadRequest, token: &CancellationToken) -> FetchResult<PathBuf> {
        match self.run_attempts(download, token) {
            _ if token.is_cancelled() => Err(FetchError::CallCanceled),
            other => other,
        }
    }

    fn run_attempts(&self, download: &DownloadRequest, token: &CancellationToken) -> FetchResult<PathBuf> {
        fs::create_dir_all(&download.directory).map_err(|e| FetchError::io(&download.directory, e))?;

        let mut request = download.request.clone();
        for _ in 0..=self.max_redirects {
            if token.is_cancelled() {
                return Err(FetchError::CallCanceled);
            }

            let attempt = self.negotiate(download, &request)?;
            let response = self.transport.execute(&attempt)?;

            if response.is_redirect() {
                let target = redirect_target(&attempt.url, &response).ok_or_else(|| {
                    FetchError::RedirectLocationMissing {
                        url: attempt.url.clone(),
                    }
                })?;
                debug!(from = %attempt.url, to = %target, "Download redirected");
                request = request.redirected_to(target);
                continue;
            }

            return self.handle_response(download, &attempt.url, response, token);
        }

        Err(FetchError::TooManyRedirects {
            url: download.request.url.clone(),
            max: self.max_redirects,
        })
    }

    /// Apply overwrite and resume rules for a known target.
    fn negotiate(&self, download: &DownloadRequest, request: &Request) -> FetchResult<Request> {
        let mut attempt = request.clone();
        let Some(target) = download.known_target() else {
            return Ok(attempt);
        };
        let state = DownloadState::new(target);

        if download.overwrite {
            state
                .discard()
                .map_err(|e| FetchError::io(&state.target_file, e))?;
            attempt.headers.remove("Range");
        } else if download.resume {
            let existing = state.existing_length();
            if existing > 0 {
                debug!(path = %state.target_file.display(), existing, "Requesting range continuation");
                attempt.headers.insert("Range", format!("bytes={}-", existing));
            }
        }
        Ok(attempt)
    }

    fn handle_response(
        &self,
        download: &DownloadRequest,
        url: &str,
        mut response: Response,
        token: &CancellationToken,
    ) -> FetchResult<PathBuf> {
        let target = download.known_target().unwrap_or_else(|| {
            let name = derive_filename(&response, url, chrono::Utc::now().timestamp_millis());
            download.directory.join(name)
        });
        let mut state = DownloadState::new(target);

        match response.status {
            206 => self.resumed_transfer(download, &mut state, &mut response, token)?,
            416 => {
                let existing = state.existing_length();
                if existing == 0 {
                    return Err(FetchError::ContentRange(format!(
                        "range not satisfiable for {} and no partial file at {}",
                        url,
                        state.target_file.display()
                    )));
                }
                info!(path = %state.target_file.display(), bytes = existing, "Range rejected, file already complete");
                report_complete(download, existing);
            }
            status if (200..300).contains(&status) => {
                self.full_transfer(download, &mut state, &mut response, token)?
            }
            status => {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status,
                })
            }
        }
        drop(response);

        verify_all(
            &state.target_file,
            &download.expected,
            token,
            download.on_verify.as_ref(),
        )?;
        state
            .remove_sidecar()
            .map_err(|e| FetchError::io(&state.sidecar_file, e))?;

        info!(path = %state.target_file.display(), "Download complete");
        Ok(state.target_file)
    }

    fn resumed_transfer(
        &self,
        download: &DownloadRequest,
        state: &mut DownloadState,
        response: &mut Response,
        token: &CancellationToken,
    ) -> FetchResult<()> {
        let header = response
            .header("Content-Range")
            .ok_or_else(|| FetchError::ContentRange("206 response without Content-Range".to_string()))?;
        let range = parse_content_range(header)
            .ok_or_else(|| FetchError::ContentRange(format!("malformed Content-Range '{}'", header)))?;

        let recorded = state.read_sidecar();
        state.resume_offset = range.start;
        state.total_expected_bytes = recorded.or(range.total);
        if recorded.is_none() {
            if let Some(total) = range.total {
                state
                    .write_sidecar(total)
                    .map_err(|e| FetchError::io(&state.sidecar_file, e))?;
            }
        }

        let path = state.target_file.clone();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| FetchError::io(&path, e))?;
        file.seek(SeekFrom::Start(range.start))
            .map_err(|e| FetchError::io(&path, e))?;

        info!(
            path = %path.display(),
            start = range.start,
            total = ?state.total_expected_bytes,
            "Resuming transfer"
        );
        let mut body = response.take_body();
        copy_with_progress(
            &mut body,
            &mut file,
            &path,
            range.start,
            state.total_expected_bytes,
            token,
            download.on_progress.as_ref(),
        )?;

        // A longer stale partial must not survive past the real end.
        if state.total_expected_bytes == Some(range.end + 1) {
            file.set_len(range.end + 1)
                .map_err(|e| FetchError::io(&path, e))?;
        }
        Ok(())
    }

    fn full_transfer(
        &self,
        download: &DownloadRequest,
        state: &mut DownloadState,
        response: &mut Response,
        token: &CancellationToken,
    ) -> FetchResult<()> {
        if download.overwrite && download.filename.is_none() {
            state
                .discard()
                .map_err(|e| FetchError::io(&state.target_file, e))?;
        }

        let content_length = response.content_length();
        state.total_expected_bytes = content_length;

        if let Some(length) = content_length {
            if state.target_exists() && state.existing_length() == length {
                info!(path = %state.target_file.display(), bytes = length, "File already downloaded");
                report_complete(download, length);
                return Ok(());
            }
        }

        match content_length {
            Some(length) => state.write_sidecar(length),
            None => state.remove_sidecar(),
        }
        .map_err(|e| FetchError::io(&state.sidecar_file, e))?;

        let path = state.target_file.clone();
        let mut file = File::create(&path).map_err(|e| FetchError::io(&path, e))?;
        debug!(path = %path.display(), length = ?content_length, "Starting full transfer");

        let mut body = response.take_body();
        copy_with_progress(
            &mut body,
            &mut file,
            &path,
            0,
            content_length,
            token,
            download.on_progress.as_ref(),
        )?;
        Ok(())
    }
}

fn report_complete(download: &DownloadRequest, length: u64) {
    if let Some(callback) = &download.on_progress {
        callback(TransferProgress::new(length, Some(length)));
    }
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}
