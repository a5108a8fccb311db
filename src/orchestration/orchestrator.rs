use crate::capture::freshness::FreshnessMonitor;
use crate::configuration::Config;
use crate::error_handling::types::{ResourceKind, SessionFailure};
use crate::orchestration::cleanup::CleanupCoordinator;
use crate::session_management::active_session::ActiveSession;
use crate::session_management::session::{SessionRecord, SessionState};
use crate::session_management::session_registry::SessionRegistry;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Why the orchestrator left its driving loop.
enum RunOutcome {
    StopRequested,
    Failed(SessionFailure),
}

/// Drives one session from creation to teardown.
///
/// The orchestrator is the only writer of the session's state (the cleanup
/// coordinator it invokes included) and the only task that touches the
/// resource supervisor while the session is healthy. A stop request is a
/// signal observed at the next check point, bounded by the health interval.
pub struct SessionOrchestrator {
    registry: Arc<SessionRegistry>,
    active: Arc<ActiveSession>,
    config: Arc<Config>,
    stop_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl SessionOrchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        active: Arc<ActiveSession>,
        config: Arc<Config>,
        stop_rx: watch::Receiver<bool>,
        done_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            registry,
            active,
            config,
            stop_rx,
            done_tx,
        }
    }

    pub async fn run(mut self) {
        let id = self.active.snapshot().id;
        match self.drive().await {
            RunOutcome::StopRequested => {
                info!("Session {} stopping", id.simple());
                CleanupCoordinator::teardown(&self.active).await;
                self.registry.remove(id);
            }
            RunOutcome::Failed(failure) => {
                error!("Session {} failed: {}", id.simple(), failure);
                let report = {
                    let mut supervisor = self.active.supervisor.lock().await;
                    supervisor.release_all().await
                };
                for e in &report.errors {
                    warn!("Session {} release after failure: {}", id.simple(), e);
                }
                // The record stays registered (state `error`, resources
                // released, directory kept) until an explicit stop.
                self.active.with_record(|record| record.record_failure(failure));
            }
        }
        let _ = self.done_tx.send(true);
    }

    async fn drive(&mut self) -> RunOutcome {
        let record = self.active.snapshot();
        info!(
            "Session {} starting ({} on {})",
            record.id.simple(),
            record.config.source_url,
            record.display
        );

        {
            let mut supervisor = self.active.supervisor.lock().await;
            if let Err(failure) = supervisor.acquire_media_pipeline(&record).await {
                return RunOutcome::Failed(failure);
            }
        }

        if let Some(outcome) = self.await_initial_output(&record).await {
            return outcome;
        }

        self.active.with_record(|record| {
            record.transition(SessionState::Playing);
            record.mark_healthy();
        });
        info!("Session {} playing", record.id.simple());

        let media_url = self.config.media_url(&record.playlist_url_path());
        let linked = {
            let mut supervisor = self.active.supervisor.lock().await;
            supervisor.link_receiver(&record, &media_url).await
        };
        if let Err(e) = linked {
            warn!(
                "Session {} receiver link degraded: {}",
                record.id.simple(),
                e
            );
            self.active
                .with_record(|record| record.receiver_degraded = Some(e.to_string()));
        }

        self.health_loop(&record).await
    }

    /// Sleeps one check period, waking early on a stop request. Returns
    /// whether stop was requested.
    async fn wait_tick(&mut self, period: Duration) -> bool {
        if *self.stop_rx.borrow() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = self.stop_rx.changed() => {}
        }
        *self.stop_rx.borrow()
    }

    /// Waits for the first fresh playlist output, bounded by the
    /// provisioning timeout. Returns `None` on success.
    async fn await_initial_output(&mut self, record: &SessionRecord) -> Option<RunOutcome> {
        let deadline =
            Instant::now() + Duration::from_millis(self.config.limits.provisioning_timeout_ms);
        let poll = Duration::from_millis(self.config.limits.health_interval_ms.min(500));

        loop {
            if self.wait_tick(poll).await {
                return Some(RunOutcome::StopRequested);
            }
            {
                let mut supervisor = self.active.supervisor.lock().await;
                if let Err(failure) = supervisor.check_processes() {
                    return Some(RunOutcome::Failed(failure));
                }
            }
            let report = FreshnessMonitor::check(&record.dir);
            if report.is_fresh(self.config.limits.stale_after_ms) {
                return None;
            }
            if Instant::now() >= deadline {
                return Some(RunOutcome::Failed(SessionFailure::Provisioning {
                    resource: ResourceKind::Encoder,
                    message: String::from("timed out waiting for initial playlist output"),
                }));
            }
        }
    }

    /// Periodic health checks while playing: process liveness first, then
    /// output freshness. A tick without any artifact is skipped rather than
    /// treated as fatal; only a measured age beyond the threshold is.
    async fn health_loop(&mut self, record: &SessionRecord) -> RunOutcome {
        let interval = Duration::from_millis(self.config.limits.health_interval_ms);
        let stale_after = self.config.limits.stale_after_ms;

        loop {
            if self.wait_tick(interval).await {
                return RunOutcome::StopRequested;
            }
            {
                let mut supervisor = self.active.supervisor.lock().await;
                if let Err(failure) = supervisor.check_processes() {
                    return RunOutcome::Failed(failure);
                }
            }
            let report = FreshnessMonitor::check(&record.dir);
            match report.output_age_ms {
                Some(age) if age > stale_after => {
                    return RunOutcome::Failed(SessionFailure::StaleOutput { age_ms: age });
                }
                Some(_) => self.active.with_record(|record| record.mark_healthy()),
                None => debug!(
                    "Session {} has no measurable output this tick",
                    record.id.simple()
                ),
            }
        }
    }
}
