//! Operation status wrapper.
//!
//! Every state-mutating entry point runs through an [`OperationTracker`]:
//! the status goes `Idle → Loading` while the operation runs and back to
//! `Idle` on success, or to `Error` carrying the failure. Dependencies are
//! passed explicitly at call time, so the operation always works on the
//! values current when it was invoked.
//!
//! Concurrent invocations are neither prevented nor deduplicated; the status
//! reflects whichever invocation finished last.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;

use super::error::SyncError;

/// Observable status of one operation
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OperationStatus {
    #[default]
    Idle,
    Loading,
    Error(Arc<SyncError>),
}

impl OperationStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Resets a `Loading` status to `Idle` if the operation future is dropped
/// before completing (e.g. its task was aborted).
struct LoadingGuard<'a> {
    status: &'a watch::Sender<OperationStatus>,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_if_modified(|status| {
                if status.is_loading() {
                    *status = OperationStatus::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Tracks the status of one named operation
#[derive(Debug)]
pub struct OperationTracker {
    id: &'static str,
    status: watch::Sender<OperationStatus>,
}

impl OperationTracker {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            status: watch::Sender::new(OperationStatus::Idle),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Current status
    pub fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    /// Run `operation` with `deps`, tracking its status.
    ///
    /// The error is recorded in the status and also returned to the caller.
    pub async fn run<D, T, F, Fut>(&self, deps: D, operation: F) -> Result<T, Arc<SyncError>>
    where
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        self.status.send_replace(OperationStatus::Loading);
        let mut guard = LoadingGuard {
            status: &self.status,
            armed: true,
        };

        let result = operation(deps).await;
        guard.armed = false;

        match result {
            Ok(value) => {
                self.status.send_replace(OperationStatus::Idle);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("Operation '{}' failed: {}", self.id, e);
                let e = Arc::new(e);
                self.status.send_replace(OperationStatus::Error(Arc::clone(&e)));
                Err(e)
            }
        }
    }
}
