use crate::orchestration::resource_supervisor::ResourceSupervisor;
use crate::session_management::session::SessionRecord;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A registered session together with its live control state.
///
/// The record is behind a short-lived sync mutex (snapshots and field
/// updates only); the resource supervisor is behind an async mutex because
/// acquisition and release block on process I/O. The stop signal is a watch
/// channel observed by the orchestrator at its next check point, and the
/// done signal flips exactly once when the orchestrator task has finished.
pub struct ActiveSession {
    record: Mutex<SessionRecord>,
    pub supervisor: tokio::sync::Mutex<ResourceSupervisor>,
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ActiveSession {
    /// Builds the session and hands back the sender half of the done signal
    /// for the orchestrator to flip when it exits.
    pub fn new(
        record: SessionRecord,
        supervisor: ResourceSupervisor,
    ) -> (Arc<Self>, watch::Sender<bool>) {
        let (stop_tx, _) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let active = Arc::new(Self {
            record: Mutex::new(record),
            supervisor: tokio::sync::Mutex::new(supervisor),
            stop_tx,
            done_rx,
            task: Mutex::new(None),
        });
        (active, done_tx)
    }

    /// Read-only copy of the record; callers never observe a half-mutated
    /// record.
    pub fn snapshot(&self) -> SessionRecord {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `f` with exclusive access to the record. Only the orchestrator
    /// and the cleanup coordinator mutate through this.
    pub fn with_record<T>(&self, f: impl FnOnce(&mut SessionRecord) -> T) -> T {
        let mut guard = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn request_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }

    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    pub fn is_done(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Waits until the orchestrator task has confirmed teardown, bounded by
    /// `timeout`. A dropped sender (task gone) counts as done.
    pub async fn wait_done(&self, timeout: Duration) -> bool {
        let mut done_rx = self.done_rx.clone();
        let result = match tokio::time::timeout(timeout, done_rx.wait_for(|done| *done)).await {
            Ok(Ok(_)) => true,
            Ok(Err(_)) => true,
            Err(_) => false,
        };
        result
    }

    pub fn set_task(&self, handle: JoinHandle<()>) {
        let mut guard = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(handle);
    }

    /// Force-cancels the orchestrator task after the stop grace period.
    pub fn abort_task(&self) {
        let guard = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = guard.as_ref() {
            handle.abort();
        }
    }
}
