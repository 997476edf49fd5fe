//! Cache-policy resolution.
//!
//! The [`Resolver`] decides, per request, whether the response comes from the
//! [`ResponseStore`], the network, or the network with a store fallback. It
//! is stateless between calls; everything it needs travels with the
//! [`FetchRequest`].
//!
//! | Mode | Store hit | Store miss | Network failure |
//! |------|-----------|------------|-----------------|
//! | `OnlyCache` | return | `CacheMiss` | n/a |
//! | `OnlyNetwork` | ignored | network | propagate |
//! | `CacheElseNetwork` | return | network | propagate |
//! | `NetworkElseCache` | fallback only | n/a | store, else `CompositeFallback` |

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheMode, ResponseStore, ValidDuration};
use crate::convert::{Converter, ConverterRegistry};
use crate::error::{FetchError, FetchResult};
use crate::executor::RedirectExecutor;
use crate::fingerprint::request_fingerprint;
use crate::http::{Request, Response};

/// Observer of the raw response before conversion.
pub type ResponseCallback = Box<dyn FnOnce(&Response) + Send>;

/// Receives the converted value of a successful call.
pub type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send>;

/// Receives the error of a failed async call.
pub type ErrorCallback = Box<dyn FnOnce(&FetchError) + Send>;

/// A request plus its cache policy, conversion and callbacks.
pub struct FetchRequest<R> {
    request: Request,
    cache_mode: Option<CacheMode>,
    valid_duration: Option<ValidDuration>,
    cache_key: Option<String>,
    cache_salt: Option<String>,
    converter: Option<Arc<dyn Converter<R>>>,
    on_response: Option<ResponseCallback>,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
}

impl<R> FetchRequest<R> {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            cache_mode: None,
            valid_duration: None,
            cache_key: None,
            cache_salt: None,
            converter: None,
            on_response: None,
            on_success: None,
            on_error: None,
        }
    }

    /// GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Request::get(url))
    }

    /// Override the client's default cache mode.
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    /// Override the client's default freshness window.
    pub fn with_valid_duration(mut self, valid: ValidDuration) -> Self {
        self.valid_duration = Some(valid);
        self
    }

    /// Use an explicit store key instead of the request fingerprint.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Mix a salt into the request fingerprint.
    pub fn with_cache_salt(mut self, salt: impl Into<String>) -> Self {
        self.cache_salt = Some(salt.into());
        self
    }

    /// Convert with `converter` instead of the registry entry for `R`.
    pub fn with_converter(mut self, converter: Arc<dyn Converter<R>>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Observe the raw response before conversion.
    pub fn on_response(mut self, callback: impl FnOnce(&Response) + Send + 'static) -> Self {
        self.on_response = Some(Box::new(callback));
        self
    }

    /// Receive the converted value.
    pub fn on_success(mut self, callback: impl FnOnce(&R) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Receive the error of an async call.
    ///
    /// Synchronous calls return the error instead and never invoke this.
    pub fn on_error(mut self, callback: impl FnOnce(&FetchError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn tag(&self) -> Option<&str> {
        self.request.tag.as_deref()
    }

    /// Store key this request resolves to.
    pub fn cache_key(&self) -> String {
        self.cache_key
            .clone()
            .unwrap_or_else(|| request_fingerprint(&self.request, self.cache_salt.as_deref()))
    }

    pub(crate) fn take_error_callback(&mut self) -> Option<ErrorCallback> {
        self.on_error.take()
    }
}

/// Resolves fetch requests against the store and the network.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<ResponseStore>,
    executor: RedirectExecutor,
    converters: Arc<ConverterRegistry>,
    default_mode: CacheMode,
    default_valid: ValidDuration,
}

impl Resolver {
    pub fn new(
        store: Arc<ResponseStore>,
        executor: RedirectExecutor,
        converters: Arc<ConverterRegistry>,
    ) -> Self {
        Self {
            store,
            executor,
            converters,
            default_mode: CacheMode::default(),
            default_valid: ValidDuration::default(),
        }
    }

    pub fn with_defaults(mut self, mode: CacheMode, valid: ValidDuration) -> Self {
        self.default_mode = mode;
        self.default_valid = valid;
        self
    }

    /// Resolve `fetch` and convert the response.
    ///
    /// Callbacks run in order: `on_response`, conversion, `on_success`.
    /// When `token` is cancelled any failure is reported as
    /// [`FetchError::CallCanceled`].
    pub fn resolve<R: 'static>(
        &self,
        mut fetch: FetchRequest<R>,
        token: &CancellationToken,
    ) -> FetchResult<R> {
        let result = self
            .select_response(&fetch, token)
            .and_then(|response| {
                if token.is_cancelled() {
                    return Err(FetchError::CallCanceled);
                }
                self.deliver(&mut fetch, response)
            });

        match result {
            Err(_) if token.is_cancelled() => Err(FetchError::CallCanceled),
            other => other,
        }
    }

    fn select_response<R>(
        &self,
        fetch: &FetchRequest<R>,
        token: &CancellationToken,
    ) -> FetchResult<Response> {
        let mode = fetch.cache_mode.unwrap_or(self.default_mode);
        let valid = fetch.valid_duration.unwrap_or(self.default_valid);
        let key = fetch.cache_key();
        debug!(url = %fetch.request.url, mode = %mode, key = %key, "Resolving request");

        match mode {
            CacheMode::OnlyCache => self.store.get(&key, valid).ok_or(FetchError::CacheMiss),
            CacheMode::OnlyNetwork => self.fetch_network(&fetch.request, &key, valid, token),
            CacheMode::CacheElseNetwork => match self.store.get(&key, valid) {
                Some(response) => Ok(response),
                None => self.fetch_network(&fetch.request, &key, valid, token),
            },
            CacheMode::NetworkElseCache => {
                match self.fetch_network(&fetch.request, &key, valid, token) {
                    Ok(response) => Ok(response),
                    Err(e) if e.is_canceled() || token.is_cancelled() => Err(FetchError::CallCanceled),
                    Err(network) => {
                        warn!(error = %network, url = %fetch.request.url, "Network failed, trying cache");
                        self.store
                            .get(&key, valid)
                            .ok_or_else(|| FetchError::CompositeFallback {
                                network: Box::new(network),
                            })
                    }
                }
            }
        }
    }

    /// Network round trip with write-through on success.
    fn fetch_network(
        &self,
        request: &Request,
        key: &str,
        valid: ValidDuration,
        token: &CancellationToken,
    ) -> FetchResult<Response> {
        let response = self.executor.execute(request, token)?;
        Ok(self.store.put(key, response, valid))
    }

    fn deliver<R: 'static>(&self, fetch: &mut FetchRequest<R>, response: Response) -> FetchResult<R> {
        if let Some(observer) = fetch.on_response.take() {
            observer(&response);
        }

        let converter = match fetch.converter.take() {
            Some(converter) => converter,
            None => self
                .converters
                .get::<R>()
                .ok_or(FetchError::ConverterNotFound {
                    type_name: type_name::<R>(),
                })?,
        };
        let value = converter.convert(response)?;

        if let Some(callback) = fetch.on_success.take() {
            callback(&value);
        }
        Ok(value)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("default_mode", &self.default_mode)
            .field("default_valid", &self.default_valid)
            .finish_non_exhaustive()
    }
}
