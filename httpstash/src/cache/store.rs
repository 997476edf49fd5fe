//! Disk-backed response store with LRU eviction.
//!
//! Writes are staged in `<root>/.staging` and committed with a directory
//! rename under a per-key write lock, so a reader never sees a half-written
//! entry. Size bookkeeping is delegated to a weighted `moka` index that
//! deletes the evicted entry's directory when the byte budget is exceeded.
//!
//! # Example
//!
//! ```ignore
//! use httpstash::cache::{ResponseStore, ValidDuration};
//!
//! let store = ResponseStore::open("/tmp/httpstash", 3 * 1024 * 1024 * 1024)?;
//! let response = store.put(&key, response, ValidDuration::Forever);
//! let cached = store.get(&key, ValidDuration::Forever);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use md5::{Digest, Md5};
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache as MokaCache;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::body::{replay_body, Tail};
use super::clock::{Clock, SystemClock};
use super::entry::{EntryMetadata, BODY_FILE, METADATA_FILE, TIMESTAMP_FILE};
use super::{StoreError, ValidDuration};
use crate::http::{Body, Response, FROM_CACHE_HEADER};

/// Default byte budget (3 GiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 3 * 1024 * 1024 * 1024;

/// Name of the staging directory under the store root.
const STAGING_DIR: &str = ".staging";

/// Number of lock stripes.
const LOCK_STRIPES: usize = 64;

/// Buffer size for streaming bodies into the store (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Per-key read/write locks, striped by key hash.
struct StripedLocks {
    stripes: Vec<RwLock<()>>,
}

impl StripedLocks {
    fn new(count: usize) -> Self {
        Self {
            stripes: (0..count).map(|_| RwLock::new(())).collect(),
        }
    }

    fn stripe(&self, key: &str) -> &RwLock<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % self.stripes.len()]
    }
}

/// Persistent response store.
///
/// Keys are mapped to directory names; keys made only of ASCII
/// alphanumerics, `-`, `_` and `.` are used as-is, anything else is hashed.
///
/// Index calls are never made while a stripe lock is held, because the
/// eviction listener takes stripe locks itself.
pub struct ResponseStore {
    root: PathBuf,
    staging: PathBuf,
    index: MokaCache<String, u64>,
    locks: Arc<StripedLocks>,
    clock: Arc<dyn Clock>,
    max_size_bytes: u64,
}

impl ResponseStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding one sub-directory per entry
    /// * `max_size_bytes` - Total byte budget before LRU eviction kicks in
    pub fn open(root: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self, StoreError> {
        Self::open_with_clock(root, max_size_bytes, Arc::new(SystemClock))
    }

    /// Open a store that reads time from `clock`.
    pub fn open_with_clock(
        root: impl Into<PathBuf>,
        max_size_bytes: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);

        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        // Leftovers from a crashed process are never committed.
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;

        let locks = Arc::new(StripedLocks::new(LOCK_STRIPES));
        let index = Self::build_index(&root, max_size_bytes, Arc::clone(&locks));

        let store = Self {
            root,
            staging,
            index,
            locks,
            clock,
            max_size_bytes,
        };
        store.rebuild_index()?;
        Ok(store)
    }

    fn build_index(root: &Path, max_size_bytes: u64, locks: Arc<StripedLocks>) -> MokaCache<String, u64> {
        let root = root.to_path_buf();
        MokaCache::builder()
            // Weight each entry by its size on disk
            .weigher(|_key: &String, size: &u64| -> u32 { (*size).min(u32::MAX as u64) as u32 })
            .max_capacity(max_size_bytes)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key: Arc<String>, size: u64, cause: RemovalCause| {
                if cause != RemovalCause::Size {
                    return;
                }
                let dir = root.join(key.as_str());
                let _guard = locks.stripe(&key).write();
                match fs::remove_dir_all(&dir) {
                    Ok(()) => debug!(key = %key, size, "Evicted cache entry"),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!(error = %e, key = %key, "Failed to delete evicted cache entry"),
                }
            })
            .build()
    }

    /// Scan the root and register every committed entry, oldest first.
    fn rebuild_index(&self) -> Result<(), StoreError> {
        let mut found = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let dir = entry.path();
            let stored_at = read_timestamp(&dir).unwrap_or(0);
            found.push((stored_at, name, dir_size(&dir)));
        }

        found.sort();
        let count = found.len();
        for (_, name, size) in found {
            self.index.insert(name, size);
        }
        self.index.run_pending_tasks();

        if count > 0 {
            info!(
                root = %self.root.display(),
                entries = count,
                bytes = self.index.weighted_size(),
                "Loaded response store"
            );
        }
        Ok(())
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a response and hand back a store-backed copy.
    ///
    /// With [`ValidDuration::Never`] the response is returned untouched.
    /// Any I/O failure aborts the write and the returned response still
    /// yields the full original body.
    pub fn put(&self, key: &str, mut response: Response, valid: ValidDuration) -> Response {
        if valid.is_never() {
            return response;
        }
        let dir_name = entry_dir_name(key);

        let staging = match tempfile::Builder::new()
            .prefix(&format!("{}.", dir_name))
            .tempdir_in(&self.staging)
        {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to create staging directory");
                return response;
            }
        };

        if let Err(e) = self.write_header_files(staging.path(), &response) {
            warn!(error = %e, key = %key, "Failed to stage cache metadata");
            return response;
        }

        let body_path = staging.path().join(BODY_FILE);
        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&body_path)
        {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to create staged body");
                return response;
            }
        };

        let content_length = response.content_length();
        let mut body = response.take_body();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, key = %key, "Body read failed while caching, entry not stored");
                    let replay = replay_body(file, written, Vec::new(), Tail::Failed(e), staging, content_length);
                    return response.with_body(replay);
                }
            };
            if let Err(e) = file.write_all(&buffer[..n]) {
                warn!(error = %e, key = %key, "Cache write failed, entry not stored");
                let pending = buffer[..n].to_vec();
                let replay = replay_body(file, written, pending, Tail::Rest(body), staging, content_length);
                return response.with_body(replay);
            }
            written += n as u64;
        }

        let committed = {
            let _guard = self.locks.stripe(&dir_name).write();
            self.commit(staging.path(), &dir_name)
        };

        match committed {
            Ok((body_file, size)) => {
                drop(staging);
                self.index.insert(dir_name, size);
                debug!(key = %key, bytes = written, "Stored response");
                response.with_body(Body::from_reader(body_file, Some(written)))
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to commit cache entry");
                self.index.invalidate(&dir_name);
                let replay = replay_body(file, written, Vec::new(), Tail::Done, staging, Some(written));
                response.with_body(replay)
            }
        }
    }

    fn write_header_files(&self, dir: &Path, response: &Response) -> Result<(), StoreError> {
        let metadata = EntryMetadata::from_response(response);
        let json = serde_json::to_vec(&metadata).map_err(|e| StoreError::Corrupt {
            key: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let meta_path = dir.join(METADATA_FILE);
        fs::write(&meta_path, json).map_err(|e| StoreError::io(&meta_path, e))?;

        let ts_path = dir.join(TIMESTAMP_FILE);
        fs::write(&ts_path, self.clock.now_millis().to_string())
            .map_err(|e| StoreError::io(&ts_path, e))?;
        Ok(())
    }

    /// Replace the committed entry with the staged one. Caller holds the write lock.
    fn commit(&self, staged: &Path, dir_name: &str) -> Result<(File, u64), StoreError> {
        let dest = self.root.join(dir_name);
        match fs::remove_dir_all(&dest) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&dest, e)),
        }
        fs::rename(staged, &dest).map_err(|e| StoreError::io(&dest, e))?;

        let body_path = dest.join(BODY_FILE);
        let file = File::open(&body_path).map_err(|e| StoreError::io(&body_path, e))?;
        Ok((file, dir_size(&dest)))
    }

    /// Look up a fresh entry.
    ///
    /// Missing, stale and corrupt entries all read as `None`; corrupt ones
    /// are removed.
    pub fn get(&self, key: &str, valid: ValidDuration) -> Option<Response> {
        if valid.is_never() {
            return None;
        }
        let dir_name = entry_dir_name(key);

        let result = {
            let _guard = self.locks.stripe(&dir_name).read();
            self.read_entry(&dir_name, valid)
        };

        match result {
            Ok(Some(response)) => {
                // Touch for LRU ordering; re-register entries the index lost.
                if self.index.get(&dir_name).is_none() {
                    self.index.insert(dir_name.clone(), dir_size(&self.root.join(&dir_name)));
                }
                debug!(key = %key, "Cache hit");
                Some(response)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Discarding unreadable cache entry");
                self.remove_quietly(&dir_name);
                None
            }
        }
    }

    fn read_entry(&self, dir_name: &str, valid: ValidDuration) -> Result<Option<Response>, StoreError> {
        let dir = self.root.join(dir_name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let stored_at = read_timestamp(&dir)?;
        if !valid.is_fresh(stored_at, self.clock.now_millis()) {
            return Ok(None);
        }

        let meta_path = dir.join(METADATA_FILE);
        let raw = fs::read(&meta_path).map_err(|e| StoreError::io(&meta_path, e))?;
        let metadata: EntryMetadata = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            key: dir_name.to_string(),
            reason: e.to_string(),
        })?;

        let body_path = dir.join(BODY_FILE);
        let file = File::open(&body_path).map_err(|e| StoreError::io(&body_path, e))?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::io(&body_path, e))?
            .len();

        let mut response = metadata
            .into_response(Body::from_reader(file, Some(len)))
            .map_err(|reason| StoreError::Corrupt {
                key: dir_name.to_string(),
                reason,
            })?;
        response.headers.insert(FROM_CACHE_HEADER, "true");
        Ok(Some(response))
    }

    /// Delete one entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let dir_name = entry_dir_name(key);
        let existed = {
            let _guard = self.locks.stripe(&dir_name).write();
            remove_dir_if_exists(&self.root.join(&dir_name))?
        };
        self.index.invalidate(&dir_name);
        Ok(existed)
    }

    /// Delete every entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut removed = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let _guard = self.locks.stripe(&name).write();
            if remove_dir_if_exists(&entry.path())? {
                removed += 1;
            }
        }
        self.index.invalidate_all();
        self.index.run_pending_tasks();
        info!(root = %self.root.display(), removed, "Cleared response store");
        Ok(())
    }

    fn remove_quietly(&self, dir_name: &str) {
        let result = {
            let _guard = self.locks.stripe(dir_name).write();
            remove_dir_if_exists(&self.root.join(dir_name))
        };
        if let Err(e) = result {
            warn!(error = %e, key = %dir_name, "Failed to remove cache entry");
        }
        self.index.invalidate(dir_name);
    }

    /// Total bytes tracked by the index.
    pub fn size_bytes(&self) -> u64 {
        self.index.weighted_size()
    }

    /// Number of entries tracked by the index.
    pub fn entry_count(&self) -> u64 {
        self.index.entry_count()
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Flush pending index bookkeeping, including evictions.
    pub fn run_maintenance(&self) {
        self.index.run_pending_tasks();
    }
}

impl std::fmt::Debug for ResponseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStore")
            .field("root", &self.root)
            .field("max_size_bytes", &self.max_size_bytes)
            .finish_non_exhaustive()
    }
}

/// Directory name for a key.
pub(crate) fn entry_dir_name(key: &str) -> String {
    let safe = !key.is_empty()
        && !key.starts_with('.')
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        key.to_string()
    } else {
        format!("{:x}", Md5::digest(key.as_bytes()))
    }
}

fn read_timestamp(dir: &Path) -> Result<i64, StoreError> {
    let path = dir.join(TIMESTAMP_FILE);
    let raw = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    raw.trim().parse::<i64>().map_err(|e| StoreError::Corrupt {
        key: dir.display().to_string(),
        reason: format!("bad timestamp: {}", e),
    })
}

fn dir_size(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn remove_dir_if_exists(dir: &Path) -> Result<bool, StoreError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(dir, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::http::Method;
    use std::io;
    use tempfile::TempDir;
    use std::time::Duration;

    fn sample_response(body: &[u8]) -> Response {
        Response::new(200, "http://a.example/data")
            .with_message("OK")
            .with_method(Method::Get)
            .with_header("Content-Type", "application/json")
            .with_header("Set-Cookie", "a=1")
            .with_header("Set-Cookie", "b=2")
            .with_timing(100, 200)
            .with_body(Body::from_bytes(body.to_vec()))
    }

    /// Reader that hands out `data` then fails.
    struct BrokenReader {
        data: io::Cursor<Vec<u8>>,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                Err(io::Error::new(ErrorKind::ConnectionAborted, "peer went away"))
            } else {
                Ok(n)
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();

        let returned = store.put("k1", sample_response(b"{\"v\":1}"), ValidDuration::Forever);
        assert!(!returned.is_from_cache());
        assert_eq!(returned.bytes().unwrap(), b"{\"v\":1}");

        let cached = store.get("k1", ValidDuration::Forever).unwrap();
        assert!(cached.is_from_cache());
        assert_eq!(cached.status, 200);
        assert_eq!(cached.message, "OK");
        assert_eq!(cached.url, "http://a.example/data");
        assert_eq!(cached.sent_at_millis, 100);
        assert_eq!(cached.received_at_millis, 200);
        assert_eq!(cached.header("content-type"), Some("application/json"));
        assert_eq!(
            cached.headers.get_all("set-cookie").collect::<Vec<_>>(),
            vec!["a=1", "b=2"]
        );
        assert_eq!(cached.content_length(), Some(7));
        assert_eq!(cached.bytes().unwrap(), b"{\"v\":1}");
    }

    #[test]
    fn test_layout_on_disk() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
        store
            .put("abc123", sample_response(b"body"), ValidDuration::Forever)
            .bytes()
            .unwrap();

        let dir = temp.path().join("abc123");
        assert!(dir.join("metadata.json").is_file());
        assert_eq!(fs::read(dir.join("body")).unwrap(), b"body");
        assert!(fs::read_to_string(dir.join("timestamp"))
            .unwrap()
            .parse::<i64>()
            .is_ok());
        // Staging is emptied by the commit.
        assert_eq!(fs::read_dir(temp.path().join(".staging")).unwrap().count(), 0);
    }

    #[test]
    fn test_never_is_not_written_or_read() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();

        let returned = store.put("k", sample_response(b"x"), ValidDuration::Never);
        assert_eq!(returned.bytes().unwrap(), b"x");
        assert!(!temp.path().join("k").exists());

        store.put("k", sample_response(b"x"), ValidDuration::Forever);
        assert!(store.get("k", ValidDuration::Never).is_none());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();

        store.put("k", sample_response(b"first"), ValidDuration::Forever);
        store.put(
            "k",
            Response::new(201, "u").with_body(Body::from_bytes(b"second".to_vec())),
            ValidDuration::Forever,
        );

        let cached = store.get("k", ValidDuration::Forever).unwrap();
        assert_eq!(cached.status, 201);
        assert!(cached.header("set-cookie").is_none());
        assert_eq!(cached.bytes().unwrap(), b"second");
    }

    #[test]
    fn test_freshness_boundary() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store =
            ResponseStore::open_with_clock(temp.path(), DEFAULT_MAX_SIZE_BYTES, clock.clone()).unwrap();
        let window = ValidDuration::For(Duration::from_millis(5_000));

        store.put("k", sample_response(b"x"), window);

        clock.set(1_000_000 + 5_000 - 1);
        assert!(store.get("k", window).is_some());
        clock.set(1_000_000 + 5_000 + 1);
        assert!(store.get("k", window).is_none());
        // Stale entries are kept; a longer window still reads them.
        assert!(store.get("k", ValidDuration::Forever).is_some());
    }

    #[test]
    fn test_read_failure_aborts_and_replays() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();

        let broken = Response::new(200, "u").with_body(Body::from_reader(
            BrokenReader {
                data: io::Cursor::new(b"half of it".to_vec()),
            },
            None,
        ));
        let mut returned = store.put("k", broken, ValidDuration::Forever);

        let mut seen = Vec::new();
        let err = returned.body_mut().read_to_end(&mut seen).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
        assert_eq!(seen, b"half of it");

        assert!(store.get("k", ValidDuration::Forever).is_none());
        assert!(!temp.path().join("k").exists());
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
        store.put("k", sample_response(b"x"), ValidDuration::Forever);

        fs::write(temp.path().join("k").join("metadata.json"), b"not json").unwrap();
        assert!(store.get("k", ValidDuration::Forever).is_none());
        assert!(!temp.path().join("k").exists());
    }

    #[test]
    fn test_delete_and_clear() {
        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
        store.put("a", sample_response(b"1"), ValidDuration::Forever);
        store.put("b", sample_response(b"2"), ValidDuration::Forever);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.get("a", ValidDuration::Forever).is_none());

        store.clear().unwrap();
        assert!(store.get("b", ValidDuration::Forever).is_none());
        assert_eq!(store.entry_count(), 0);
        assert!(temp.path().join(".staging").is_dir());
    }

    #[test]
    fn test_unsafe_keys_are_hashed() {
        assert_eq!(entry_dir_name("abc-DEF_1.2"), "abc-DEF_1.2");
        let hashed = entry_dir_name("../etc/passwd");
        assert_eq!(hashed.len(), 32);
        assert_ne!(entry_dir_name(".staging"), ".staging");

        let temp = TempDir::new().unwrap();
        let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
        store.put("user/profile?id=1", sample_response(b"p"), ValidDuration::Forever);
        assert_eq!(
            store
                .get("user/profile?id=1", ValidDuration::Forever)
                .unwrap()
                .bytes()
                .unwrap(),
            b"p"
        );
    }

    #[test]
    fn test_index_rebuilt_on_open() {
        let temp = TempDir::new().unwrap();
        {
            let store = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
            store.put("a", sample_response(b"aaaa"), ValidDuration::Forever);
            store.put("b", sample_response(b"bb"), ValidDuration::Forever);
        }
        let reopened = ResponseStore::open(temp.path(), DEFAULT_MAX_SIZE_BYTES).unwrap();
        reopened.run_maintenance();
        assert_eq!(reopened.entry_count(), 2);
        assert!(reopened.size_bytes() > 6);
        assert!(reopened.get("a", ValidDuration::Forever).is_some());
    }

    #[test]
    fn test_budget_evicts_least_recent() {
        let temp = TempDir::new().unwrap();
        let big = vec![7u8; 4_000];
        // Room for two entries of roughly 4.3KB each, not three.
        let store = ResponseStore::open(temp.path(), 10_000).unwrap();

        store.put("old", sample_response(&big), ValidDuration::Forever);
        store.run_maintenance();
        store.put("mid", sample_response(&big), ValidDuration::Forever);
        store.run_maintenance();
        store.put("new", sample_response(&big), ValidDuration::Forever);
        store.run_maintenance();

        assert!(store.size_bytes() <= 10_000);
        assert!(!temp.path().join("old").exists());
        assert!(store.get("new", ValidDuration::Forever).is_some());
    }
}
