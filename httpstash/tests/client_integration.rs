//! End-to-end behavior of the client against a scripted transport.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tempfile::TempDir;

use httpstash::cache::{ManualClock, ResponseStore};
use httpstash::download::sidecar_path;
use httpstash::http::Body;
use httpstash::transport::{Transport, TransportError};
use httpstash::{
    CacheMode, Client, ClientConfig, DownloadRequest, FetchError, FetchRequest, Request, Response,
    ValidDuration,
};

type Route = Arc<dyn Fn(&Request) -> Result<Response, TransportError> + Send + Sync>;

/// Transport answering by URL and counting requests.
#[derive(Default)]
struct RoutedTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: AtomicUsize,
}

impl RoutedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn route(
        &self,
        url: &str,
        handler: impl Fn(&Request) -> Result<Response, TransportError> + Send + Sync + 'static,
    ) {
        self.routes.lock().insert(url.to_string(), Arc::new(handler));
    }

    fn ok(&self, url: &str, body: &'static [u8]) {
        self.route(url, move |req| {
            Ok(Response::new(200, req.url.clone())
                .with_header("Content-Type", "text/plain")
                .with_body(Body::from_bytes(body.to_vec())))
        });
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for RoutedTransport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Handlers may block, so they run outside the routes lock.
        let route = self.routes.lock().get(&request.url).cloned();
        match route {
            Some(handler) => handler(request),
            None => Err(TransportError::Connect {
                url: request.url.clone(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// One-shot gate that blocks threads until opened.
#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    clock: Arc<ManualClock>,
    transport: Arc<RoutedTransport>,
    client: Client,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    let clock = Arc::new(ManualClock::new(1_000_000));
    let store = Arc::new(
        ResponseStore::open_with_clock(root.join("cache"), 64 * 1024 * 1024, clock.clone()).unwrap(),
    );
    let transport = RoutedTransport::new();
    let config = ClientConfig::default().with_cache_dir(root.join("cache"));
    let client = Client::from_parts(config, store, transport.clone(), transport.clone());
    Fixture {
        _temp: temp,
        root,
        clock,
        transport,
        client,
    }
}

fn seed(client: &Client, key: &str, body: &'static [u8]) {
    let response = Response::new(200, "http://origin.example/seed")
        .with_header("ETag", "\"v1\"")
        .with_body(Body::from_bytes(body.to_vec()));
    client
        .store()
        .put(key, response, ValidDuration::Forever)
        .bytes()
        .unwrap();
}

#[test]
fn test_cache_modes_serve_store_without_network() {
    let fx = fixture();
    seed(&fx.client, "feed", b"cached");
    fx.transport.ok("http://origin.example/feed", b"network");

    for mode in [CacheMode::OnlyCache, CacheMode::CacheElseNetwork] {
        let body: String = fx
            .client
            .execute(
                FetchRequest::get("http://origin.example/feed")
                    .with_cache_key("feed")
                    .with_cache_mode(mode),
            )
            .unwrap();
        assert_eq!(body, "cached", "mode {mode}");
    }
    assert_eq!(fx.transport.calls(), 0);

    let body: String = fx
        .client
        .execute(
            FetchRequest::get("http://origin.example/feed")
                .with_cache_key("feed")
                .with_cache_mode(CacheMode::OnlyNetwork),
        )
        .unwrap();
    assert_eq!(body, "network");
    assert_eq!(fx.transport.calls(), 1);
}

#[test]
fn test_network_else_cache_fallback() {
    let fx = fixture();
    seed(&fx.client, "stable", b"from disk");

    let body: String = fx
        .client
        .execute(
            FetchRequest::get("http://down.example/a")
                .with_cache_key("stable")
                .with_cache_mode(CacheMode::NetworkElseCache),
        )
        .unwrap();
    assert_eq!(body, "from disk");

    let err = fx
        .client
        .execute(
            FetchRequest::<String>::get("http://down.example/b")
                .with_cache_key("absent")
                .with_cache_mode(CacheMode::NetworkElseCache),
        )
        .unwrap_err();
    assert!(matches!(err, FetchError::CompositeFallback { .. }));
    assert!(err.to_string().ends_with("and cache not found"));
}

#[test]
fn test_store_round_trip_is_identical() {
    let fx = fixture();
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let original = Response::new(201, "http://origin.example/bin")
        .with_message("Created")
        .with_header("Content-Type", "application/octet-stream")
        .with_header("X-Trace", "abc")
        .with_body(Body::from_bytes(payload.clone()));

    let written = fx.client.store().put("bin", original, ValidDuration::Forever);
    assert_eq!(written.bytes().unwrap(), payload);

    let read = fx.client.store().get("bin", ValidDuration::Forever).unwrap();
    assert_eq!(read.status, 201);
    assert_eq!(read.message, "Created");
    assert_eq!(read.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(read.header("X-Trace"), Some("abc"));
    assert!(read.is_from_cache());
    assert_eq!(read.bytes().unwrap(), payload);
}

#[test]
fn test_freshness_boundary() {
    let fx = fixture();
    let window = ValidDuration::For(Duration::from_millis(5_000));
    let response = Response::new(200, "http://origin.example/t").with_body(Body::from_bytes(b"t".to_vec()));
    fx.client.store().put("t", response, window).bytes().unwrap();

    fx.clock.advance(Duration::from_millis(4_999));
    assert!(fx.client.store().get("t", window).is_some());

    fx.clock.advance(Duration::from_millis(2));
    assert!(fx.client.store().get("t", window).is_none());
}

#[test]
fn test_resume_completes_partial_file() {
    let fx = fixture();
    let dir = fx.root.join("downloads");
    fs::create_dir_all(&dir).unwrap();
    let target = dir.join("image.bin");
    fs::write(&target, vec![7u8; 100]).unwrap();
    fs::write(sidecar_path(&target), "ContentLength=200").unwrap();

    fx.transport.route("http://files.example/image.bin", |req| {
        assert_eq!(req.headers.get("Range"), Some("bytes=100-"));
        Ok(Response::new(206, req.url.clone())
            .with_header("Content-Range", "bytes 100-199/200")
            .with_body(Body::from_bytes(vec![9u8; 100])))
    });

    let path = fx
        .client
        .download(
            DownloadRequest::get("http://files.example/image.bin", &dir)
                .with_filename("image.bin")
                .with_resume(true),
        )
        .unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 200);
    assert!(!sidecar_path(&path).exists());
}

#[test]
fn test_range_not_satisfiable_means_complete() {
    let fx = fixture();
    let dir = fx.root.join("downloads");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("done.bin"), b"all bytes").unwrap();

    fx.transport
        .route("http://files.example/done.bin", |req| Ok(Response::new(416, req.url.clone())));

    let path = fx
        .client
        .download(
            DownloadRequest::get("http://files.example/done.bin", &dir)
                .with_filename("done.bin")
                .with_resume(true),
        )
        .unwrap();
    assert_eq!(fs::read(path).unwrap(), b"all bytes");
    assert_eq!(fx.transport.calls(), 1);
}

#[test]
fn test_verification_cascade() {
    let fx = fixture();
    let dir = fx.root.join("downloads");
    fx.transport.ok("http://files.example/empty", b"");
    fx.transport.ok("http://files.example/data", b"data");

    fx.client
        .download(
            DownloadRequest::get("http://files.example/empty", &dir)
                .with_filename("empty")
                .with_md5("d41d8cd98f00b204e9800998ecf8427e"),
        )
        .unwrap();

    let err = fx
        .client
        .download(
            DownloadRequest::get("http://files.example/data", &dir)
                .with_filename("data")
                .with_sha256("0000000000000000000000000000000000000000000000000000000000000000"),
        )
        .unwrap_err();
    assert!(matches!(err, FetchError::FileVerification { .. }));
    assert_eq!(fs::read(dir.join("data")).unwrap(), b"data");
}

/// Body that hands out one chunk, signals, then blocks until released.
struct StallingBody {
    started: Option<mpsc::Sender<()>>,
    release: Arc<Gate>,
}

impl Read for StallingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.started.take() {
            Some(started) => {
                let _ = started.send(());
            }
            None => self.release.wait(),
        }
        let n = buf.len().min(1024);
        buf[..n].fill(1);
        Ok(n)
    }
}

#[test]
fn test_cancel_by_tag_during_transfer() {
    let fx = fixture();
    let dir = fx.root.join("downloads");
    let (started_tx, started_rx) = mpsc::channel();
    let started_tx = Mutex::new(Some(started_tx));
    let release = Arc::new(Gate::default());
    let body_release = release.clone();

    fx.transport.route("http://files.example/big.iso", move |req| {
        let body = StallingBody {
            started: started_tx.lock().take(),
            release: body_release.clone(),
        };
        Ok(Response::new(200, req.url.clone()).with_body(Body::from_reader(body, Some(1 << 30))))
    });

    let succeeded = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let (success_sink, error_sink) = (succeeded.clone(), errors.clone());

    let request = Request::get("http://files.example/big.iso").with_tag("iso");
    let handle = fx.client.download_async(
        DownloadRequest::new(request, &dir)
            .with_filename("big.iso")
            .on_success(move |_| {
                success_sink.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |e| error_sink.lock().push(e.is_canceled())),
    );

    started_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(fx.client.cancel_by_tag("iso"), 1);
    release.open();

    let err = handle.wait().unwrap_err();
    assert!(err.is_canceled(), "unexpected error: {err}");
    assert_eq!(succeeded.load(Ordering::SeqCst), 0);
    assert_eq!(*errors.lock(), vec![true]);
    assert!(dir.join("big.iso").exists());
}

#[test]
fn test_cancel_by_tag_only_matches_tag() {
    let fx = fixture();
    let gate = Arc::new(Gate::default());
    for name in ["a", "b"] {
        let gate = gate.clone();
        fx.transport.route(&format!("http://slow.example/{name}"), move |req| {
            gate.wait();
            Ok(Response::new(200, req.url.clone()).with_body(Body::from_bytes(req.url.clone().into_bytes())))
        });
    }

    let tagged = |name: &str, tag: &str| {
        let request = Request::get(format!("http://slow.example/{name}")).with_tag(tag);
        FetchRequest::<String>::new(request).with_valid_duration(ValidDuration::Never)
    };
    let first = fx.client.enqueue(tagged("a", "sync"));
    let second = fx.client.enqueue(tagged("b", "ui"));
    assert_eq!(fx.client.in_flight(), 2);

    assert_eq!(fx.client.cancel_by_tag("sync"), 1);
    assert_eq!(fx.client.in_flight(), 1);
    assert_eq!(fx.client.cancel_by_tag("sync"), 0);
    gate.open();

    assert!(first.wait().unwrap_err().is_canceled());
    assert_eq!(second.wait().unwrap(), "http://slow.example/b");
    assert_eq!(fx.client.in_flight(), 0);
}

#[test]
fn test_redirects_followed_and_written_through() {
    let fx = fixture();
    fx.transport.route("http://old.example/x", |req| {
        Ok(Response::new(301, req.url.clone()).with_header("Location", "/moved"))
    });
    fx.transport.ok("http://old.example/moved", b"moved body");

    let fetch = FetchRequest::<String>::get("http://old.example/x").with_cache_mode(CacheMode::CacheElseNetwork);
    let key = fetch.cache_key();
    assert_eq!(fx.client.execute(fetch).unwrap(), "moved body");
    assert_eq!(fx.transport.calls(), 2);

    let cached = fx.client.store().get(&key, ValidDuration::Forever).unwrap();
    assert_eq!(cached.bytes().unwrap(), b"moved body");
}
