use crate::casting::sender::Sender;
use crate::configuration::Config;
use crate::error_handling::types::SessionError;
use crate::orchestration::cleanup::CleanupCoordinator;
use crate::orchestration::orchestrator::SessionOrchestrator;
use crate::orchestration::resource_supervisor::ResourceSupervisor;
use crate::session_management::active_session::ActiveSession;
use crate::session_management::session::{SessionConfig, SessionRecord};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Concurrent-safe collection of all sessions.
///
/// The registry owns nothing but the map and the display-number allocator;
/// everything session-internal is driven by the session's own orchestrator
/// task. The map lock is held only for insert/lookup/remove/snapshot, never
/// across a blocking call.
pub struct SessionRegistry {
    config: Arc<Config>,
    sender: Arc<Sender>,
    sessions: Mutex<HashMap<Uuid, Arc<ActiveSession>>>,
    next_display: AtomicU32,
}

impl SessionRegistry {
    pub fn new(config: Arc<Config>, sender: Arc<Sender>) -> Arc<Self> {
        let first_display = config.pipeline.first_display;
        Arc::new(Self {
            config,
            sender,
            sessions: Mutex::new(HashMap::new()),
            next_display: AtomicU32::new(first_display),
        })
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<ActiveSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a session and starts its orchestrator.
    ///
    /// The returned record is a snapshot taken in the `starting` state; the
    /// orchestrator runs independently from here on.
    pub fn create(
        self: &Arc<Self>,
        session_config: SessionConfig,
    ) -> Result<SessionRecord, SessionError> {
        {
            let sessions = self.sessions();
            let active = sessions
                .values()
                .filter(|s| s.snapshot().state.is_active())
                .count();
            if active >= self.config.limits.max_sessions {
                return Err(SessionError::LimitReached);
            }
        }

        std::fs::create_dir_all(&self.config.sessions_root)
            .map_err(SessionError::ResourceExhaustion)?;
        let id = Uuid::new_v4();
        let dir = self.config.sessions_root.join(id.simple().to_string());
        std::fs::create_dir(&dir).map_err(SessionError::ResourceExhaustion)?;

        let display = format!(":{}", self.next_display.fetch_add(1, Ordering::Relaxed));
        let record = SessionRecord::new(id, dir, display, session_config);
        let snapshot = record.clone();

        let supervisor = ResourceSupervisor::new(self.config.clone(), self.sender.clone());
        let (active_session, done_tx) = ActiveSession::new(record, supervisor);
        let stop_rx = active_session.subscribe_stop();
        let orchestrator = SessionOrchestrator::new(
            Arc::clone(self),
            active_session.clone(),
            self.config.clone(),
            stop_rx,
            done_tx,
        );

        // Registered before the orchestrator starts so every control path
        // sees the record from the first instant of the task's life.
        self.sessions().insert(id, active_session.clone());
        let task = tokio::spawn(orchestrator.run());
        active_session.set_task(task);
        info!(
            "Created session {} for {} (receiver '{}')",
            id.simple(),
            snapshot.config.source_url,
            snapshot.config.receiver.name
        );
        Ok(snapshot)
    }

    pub fn get(&self, id: Uuid) -> Option<SessionRecord> {
        self.sessions().get(&id).map(|s| s.snapshot())
    }

    pub fn list(&self) -> Vec<SessionRecord> {
        self.sessions().values().map(|s| s.snapshot()).collect()
    }

    #[cfg(test)]
    pub(crate) fn get_active(&self, id: Uuid) -> Option<Arc<ActiveSession>> {
        self.sessions().get(&id).cloned()
    }

    /// Removes a record from the map. Called by the cleanup paths once
    /// teardown has confirmed; removing an absent id is not an error.
    pub(crate) fn remove(&self, id: Uuid) {
        match self.sessions().remove(&id) {
            Some(_) => debug!("Removed session {} from registry", id.simple()),
            None => debug!("Session {} already removed from registry", id.simple()),
        }
    }

    /// Requests a stop and waits for teardown, bounded by the stop grace
    /// period; a session that does not confirm in time is force-cancelled
    /// and torn down from here. Returns the final record snapshot.
    ///
    /// Stopping an errored or already-stopping session is a no-op beyond
    /// converging it to `stopped`.
    pub async fn stop(&self, id: Uuid) -> Result<SessionRecord, SessionError> {
        let active = self
            .sessions()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound)?;

        info!("Stop requested for session {}", id.simple());
        active.request_stop();

        let grace = Duration::from_millis(self.config.limits.stop_grace_ms);
        if !active.wait_done(grace).await {
            warn!(
                "Session {} did not stop within {}ms; forcing teardown",
                id.simple(),
                self.config.limits.stop_grace_ms
            );
            active.abort_task();
        }

        // Idempotent sweep. Covers errored sessions whose orchestrator is
        // long gone and the forced path above; for a graceful stop the
        // orchestrator has already done all of this.
        CleanupCoordinator::teardown(&active).await;
        self.remove(id);
        Ok(active.snapshot())
    }

    /// Stops every session, bounded by the shutdown timeout overall, so no
    /// orphaned pipeline process survives a clean restart. Afterwards the
    /// registry is empty and no session is left `starting` or `playing`.
    pub async fn shutdown_all(&self) {
        let entries: Vec<(Uuid, Arc<ActiveSession>)> = self
            .sessions()
            .iter()
            .map(|(id, active)| (*id, active.clone()))
            .collect();
        if entries.is_empty() {
            return;
        }

        info!("Shutting down {} session(s)", entries.len());
        for (_, active) in &entries {
            active.request_stop();
        }

        let deadline =
            Instant::now() + Duration::from_millis(self.config.limits.shutdown_timeout_ms);
        for (id, active) in &entries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !active.wait_done(remaining).await {
                warn!(
                    "Session {} did not confirm teardown before shutdown deadline; forcing",
                    id.simple()
                );
                active.abort_task();
            }
            CleanupCoordinator::teardown(active).await;
            self.remove(*id);
        }

        // Anything that raced in while we were shutting down is discarded.
        let leftovers: Vec<Uuid> = self.sessions().keys().copied().collect();
        for id in leftovers {
            warn!("Discarding session {} at shutdown", id.simple());
            self.sessions().remove(&id);
        }
    }
}
