//! In-flight call tracking and cooperative cancellation.
//!
//! Every dispatched call registers a [`CallGuard`] holding a
//! [`CancellationToken`]. Worker loops poll the token; cancelling by id, by
//! tag or globally removes the entry from the registry first and then
//! cancels its token, so each call is cancelled at most once.
//!
//! # Example
//!
//! ```ignore
//! let registry = CallRegistry::new();
//! let guard = registry.register(Some("sync".to_string()));
//! assert_eq!(registry.cancel_by_tag("sync"), 1);
//! assert!(guard.token().is_cancelled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Identifier of a registered call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// A registered call.
#[derive(Debug, Clone)]
struct InFlightCall {
    tag: Option<String>,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct RegistryInner {
    calls: DashMap<CallId, InFlightCall>,
    next_id: AtomicU64,
}

/// Registry of in-flight calls.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct CallRegistry {
    inner: Arc<RegistryInner>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call and return the guard that unregisters it on drop.
    pub fn register(&self, tag: Option<String>) -> CallGuard {
        let id = CallId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let token = CancellationToken::new();
        self.inner.calls.insert(
            id,
            InFlightCall {
                tag: tag.clone(),
                token: token.clone(),
            },
        );
        debug!(call = %id, tag = ?tag, "Call started");

        CallGuard {
            id,
            tag,
            token,
            registry: self.clone(),
        }
    }

    /// Cancel one call. Returns false if it was not registered.
    pub fn cancel(&self, id: CallId) -> bool {
        match self.inner.calls.remove(&id) {
            Some((_, call)) => {
                call.token.cancel();
                info!(call = %id, tag = ?call.tag, "Call canceled");
                true
            }
            None => false,
        }
    }

    /// Cancel every call registered with `tag`. Returns how many were cancelled.
    pub fn cancel_by_tag(&self, tag: &str) -> usize {
        let mut cancelled = Vec::new();
        self.inner.calls.retain(|id, call| {
            if call.tag.as_deref() == Some(tag) {
                cancelled.push((*id, call.token.clone()));
                false
            } else {
                true
            }
        });
        // Tokens are cancelled outside the shard locks.
        for (id, token) in &cancelled {
            token.cancel();
            info!(call = %id, tag, "Call canceled");
        }
        cancelled.len()
    }

    /// Cancel every registered call. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = Vec::new();
        self.inner.calls.retain(|id, call| {
            cancelled.push((*id, call.token.clone()));
            false
        });
        for (id, token) in &cancelled {
            token.cancel();
            info!(call = %id, "Call canceled");
        }
        cancelled.len()
    }

    /// Number of registered calls.
    pub fn len(&self) -> usize {
        self.inner.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.calls.is_empty()
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.inner.calls.contains_key(&id)
    }

    fn unregister(&self, id: CallId) {
        self.inner.calls.remove(&id);
    }
}

/// Registration of one call. Dropping it unregisters the call.
pub struct CallGuard {
    id: CallId,
    tag: Option<String>,
    token: CancellationToken,
    registry: CallRegistry,
}

impl CallGuard {
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Log the terminal outcome of the call.
    pub fn finish<T, E: fmt::Display>(&self, result: &Result<T, E>) {
        match result {
            Ok(_) => debug!(call = %self.id, tag = ?self.tag, "Call ended"),
            Err(_) if self.token.is_cancelled() => {
                debug!(call = %self.id, tag = ?self.tag, "Call ended after cancellation")
            }
            Err(e) => info!(call = %self.id, tag = ?self.tag, error = %e, "Call failed"),
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl fmt::Debug for CallGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGuard")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
