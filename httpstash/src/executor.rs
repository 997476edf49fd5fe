//! Redirect-following request executor.
//!
//! Runs a request through a [`Transport`] and re-issues it against the
//! `Location` of every redirect response, up to a fixed number of hops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::http::{Request, Response};
use crate::transport::Transport;

/// Default maximum number of redirects followed for one call.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Resolve the `Location` of a redirect response against the URL it came from.
///
/// Returns `None` when the header is missing or cannot be resolved.
pub fn redirect_target(current_url: &str, response: &Response) -> Option<String> {
    let location = response.header("Location")?.trim();
    if location.is_empty() {
        return None;
    }
    let base = reqwest::Url::parse(current_url).ok();
    let resolved = match base {
        Some(base) => base.join(location).ok()?,
        None => reqwest::Url::parse(location).ok()?,
    };
    Some(resolved.to_string())
}

/// Executes requests, following redirects with an explicit bounded loop.
#[derive(Clone)]
pub struct RedirectExecutor {
    transport: Arc<dyn Transport>,
    max_redirects: usize,
}

impl RedirectExecutor {
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

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Execute `request`, returning only 2xx responses.
    ///
    /// # Errors
    ///
    /// - [`FetchError::CallCanceled`] when `token` is cancelled before a hop
    /// - [`FetchError::RedirectLocationMissing`] for a redirect without a usable `Location`
    /// - [`FetchError::TooManyRedirects`] past the hop cap
    /// - [`FetchError::HttpStatus`] for any other non-2xx status
    /// - [`FetchError::Transport`] when the exchange itself fails
    pub fn execute(&self, request: &Request, token: &CancellationToken) -> Result<Response, FetchError> {
        let mut current = request.clone();

        for hop in 0..=self.max_redirects {
            if token.is_cancelled() {
                return Err(FetchError::CallCanceled);
            }

            let response = self.transport.execute(&current)?;

            if response.is_redirect() {
                let target = redirect_target(&current.url, &response).ok_or_else(|| {
                    FetchError::RedirectLocationMissing {
                        url: current.url.clone(),
                    }
                })?;
                debug!(
                    from = %current.url,
                    to = %target,
                    status = response.status,
                    hop = hop + 1,
                    "Following redirect"
                );
                current = current.redirected_to(target);
                continue;
            }

            if response.is_success() {
                return Ok(response);
            }

            return Err(FetchError::HttpStatus {
                url: current.url,
                status: response.status,
            });
        }

        Err(FetchError::TooManyRedirects {
            url: request.url.clone(),
            max: self.max_redirects,
        })
    }
}

impl std::fmt::Debug for RedirectExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectExecutor")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}
