//! Handles for calls running on background threads.

use std::thread::JoinHandle;

use tokio_util::sync::CancellationToken;

use crate::calls::CallId;
use crate::error::{FetchError, FetchResult};

/// Handle to an enqueued call.
///
/// The call keeps running if the handle is dropped; its callbacks still fire.
#[derive(Debug)]
pub struct CallHandle<T> {
    id: CallId,
    token: CancellationToken,
    join: JoinHandle<FetchResult<T>>,
}

impl<T> CallHandle<T> {
    pub(crate) fn new(id: CallId, token: CancellationToken, join: JoinHandle<FetchResult<T>>) -> Self {
        Self { id, token, join }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    /// Request cancellation. The call finishes with [`FetchError::CallCanceled`]
    /// unless it already completed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the call completes.
    pub fn wait(self) -> FetchResult<T> {
        self.join.join().unwrap_or(Err(FetchError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallRegistry;
    use std::thread;

    #[test]
    fn test_wait_returns_result() {
        let registry = CallRegistry::new();
        let guard = registry.register(None);
        let handle = CallHandle::new(guard.id(), guard.token().clone(), thread::spawn(|| Ok(7)));
        assert_eq!(handle.wait().unwrap(), 7);
    }

    #[test]
    fn test_panicked_worker() {
        let registry = CallRegistry::new();
        let guard = registry.register(None);
        let join = thread::spawn(|| -> FetchResult<u8> { panic!("boom") });
        let handle = CallHandle::new(guard.id(), guard.token().clone(), join);
        assert!(matches!(handle.wait(), Err(FetchError::WorkerPanicked)));
    }

    #[test]
    fn test_cancel_sets_token() {
        let registry = CallRegistry::new();
        let guard = registry.register(Some("t".into()));
        let handle = CallHandle::new(guard.id(), guard.token().clone(), thread::spawn(|| Ok(())));
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(guard.token().is_cancelled());
    }
}
