//! Client facade.
//!
//! [`Client`] ties the response store, the resolver, the download engine and
//! the call registry together. It is cheap to clone; clones share all state.
//!
//! # Example
//!
//! ```ignore
//! use httpstash::{CacheMode, Client, ClientConfig, FetchRequest, ValidDuration};
//!
//! let client = Client::configure(ClientConfig::default())?;
//! let body: String = client.execute(
//!     FetchRequest::get("https://example.com/feed.json")
//!         .with_cache_mode(CacheMode::CacheElseNetwork)
//!         .with_valid_duration("10m".parse()?),
//! )?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ResponseStore;
use crate::calls::{CallId, CallRegistry};
use crate::config::ClientConfig;
use crate::convert::{Converter, ConverterRegistry};
use crate::download::{DownloadEngine, DownloadRequest};
use crate::error::FetchResult;
use crate::executor::RedirectExecutor;
use crate::handle::CallHandle;
use crate::resolver::{ErrorCallback, FetchRequest, Resolver};
use crate::transport::{ReqwestTransport, Transport};

/// Entry point for cached requests and downloads.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    store: Arc<ResponseStore>,
    converters: Arc<ConverterRegistry>,
    resolver: Resolver,
    downloads: DownloadEngine,
    calls: CallRegistry,
}

impl Client {
    /// Open the store and build reqwest transports from `config`.
    ///
    /// Downloads get their own transport with `download_timeout`.
    pub fn configure(config: ClientConfig) -> FetchResult<Self> {
        let requests = ReqwestTransport::with_options(config.timeout, Some(config.user_agent.as_str()))?;
        let downloads = ReqwestTransport::with_options(config.download_timeout, Some(config.user_agent.as_str()))?;
        Self::with_transports(config, Arc::new(requests), Arc::new(downloads))
    }

    /// Use one transport for requests and downloads.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> FetchResult<Self> {
        Self::with_transports(config, transport.clone(), transport)
    }

    pub fn with_transports(
        config: ClientConfig,
        requests: Arc<dyn Transport>,
        downloads: Arc<dyn Transport>,
    ) -> FetchResult<Self> {
        let store = Arc::new(ResponseStore::open(&config.cache_dir, config.cache_max_bytes)?);
        Ok(Self::from_parts(config, store, requests, downloads))
    }

    /// Assemble a client around an already opened store.
    pub fn from_parts(
        config: ClientConfig,
        store: Arc<ResponseStore>,
        requests: Arc<dyn Transport>,
        downloads: Arc<dyn Transport>,
    ) -> Self {
        let converters = Arc::new(ConverterRegistry::with_defaults());
        let executor = RedirectExecutor::new(requests).with_max_redirects(config.max_redirects);
        let resolver = Resolver::new(store.clone(), executor, converters.clone())
            .with_defaults(config.default_cache_mode, config.default_valid_duration);
        let downloads = DownloadEngine::new(downloads).with_max_redirects(config.max_redirects);

        info!(
            cache_dir = %store.root().display(),
            max_bytes = config.cache_max_bytes,
            mode = %config.default_cache_mode,
            "Client configured"
        );

        Self {
            inner: Arc::new(ClientInner {
                config,
                store,
                converters,
                resolver,
                downloads,
                calls: CallRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<ResponseStore> {
        &self.inner.store
    }

    pub fn cache_dir(&self) -> &Path {
        self.inner.store.root()
    }

    /// Register a converter for `T`. The last registration wins.
    pub fn register_converter<T: 'static>(&self, converter: Arc<dyn Converter<T>>) {
        self.inner.converters.register(converter);
    }

    /// Run a request on the calling thread.
    ///
    /// Errors are returned; `on_error` is not invoked.
    pub fn execute<R: 'static>(&self, fetch: FetchRequest<R>) -> FetchResult<R> {
        let guard = self.inner.calls.register(fetch.tag().map(str::to_string));
        let result = self.inner.resolver.resolve(fetch, guard.token());
        guard.finish(&result);
        result
    }

    /// Run a request on a worker thread.
    ///
    /// Callbacks fire on the worker. A failed call invokes `on_error` exactly
    /// once; the same error is returned by [`CallHandle::wait`].
    pub fn enqueue<R: Send + 'static>(&self, mut fetch: FetchRequest<R>) -> CallHandle<R> {
        let tag = fetch.tag().map(str::to_string);
        let on_error = fetch.take_error_callback();
        let resolver = self.inner.resolver.clone();
        self.spawn_call(tag, on_error, move |token| resolver.resolve(fetch, token))
    }

    /// Download on the calling thread and return the final path.
    ///
    /// `on_success` receives the path; errors are returned.
    pub fn download(&self, mut download: DownloadRequest) -> FetchResult<PathBuf> {
        let guard = self.inner.calls.register(download.tag().map(str::to_string));
        let result = self.inner.downloads.run(&download, guard.token());
        guard.finish(&result);

        if let (Ok(path), Some(callback)) = (&result, download.on_success.take()) {
            callback(path);
        }
        result
    }

    /// Download on a worker thread.
    pub fn download_async(&self, mut download: DownloadRequest) -> CallHandle<PathBuf> {
        let tag = download.tag().map(str::to_string);
        let on_error = download.on_error.take();
        let engine = self.inner.downloads.clone();
        self.spawn_call(tag, on_error, move |token| {
            let result = engine.run(&download, token);
            if let (Ok(path), Some(callback)) = (&result, download.on_success.take()) {
                callback(path);
            }
            result
        })
    }

    fn spawn_call<T, F>(&self, tag: Option<String>, on_error: Option<ErrorCallback>, work: F) -> CallHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> FetchResult<T> + Send + 'static,
    {
        let guard = self.inner.calls.register(tag);
        let id = guard.id();
        let token = guard.token().clone();

        let join = thread::spawn(move || {
            let result = work(guard.token());
            guard.finish(&result);
            drop(guard);

            if let (Err(e), Some(callback)) = (&result, on_error) {
                callback(e);
            }
            result
        });
        CallHandle::new(id, token, join)
    }

    /// Cancel one call. Returns false if it already finished.
    pub fn cancel(&self, id: CallId) -> bool {
        self.inner.calls.cancel(id)
    }

    /// Cancel every in-flight call carrying `tag`.
    pub fn cancel_by_tag(&self, tag: &str) -> usize {
        self.inner.calls.cancel_by_tag(tag)
    }

    pub fn cancel_all(&self) -> usize {
        self.inner.calls.cancel_all()
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.calls.len()
    }

    /// Cancel everything and flush pending store maintenance.
    pub fn shutdown(&self) {
        let cancelled = self.cancel_all();
        self.inner.store.run_maintenance();
        debug!(cancelled, "Client shut down");
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("cache_dir", &self.inner.store.root())
            .field("in_flight", &self.inner.calls.len())
            .finish_non_exhaustive()
    }
}
