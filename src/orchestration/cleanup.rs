use crate::error_handling::types::{TeardownError, TeardownReport};
use crate::session_management::active_session::ActiveSession;
use crate::session_management::session::SessionState;
use log::{debug, info, warn};

/// Runs the full teardown sequence for one session: reverse-order resource
/// release followed by working-directory removal.
///
/// Teardown never fails; everything that goes wrong lands in the returned
/// report. It is also idempotent: released supervisors hold no handles, and
/// an already-removed directory is skipped, so a second invocation has no
/// observable effect.
pub struct CleanupCoordinator;

impl CleanupCoordinator {
    pub async fn teardown(active: &ActiveSession) -> TeardownReport {
        let (id, dir) = {
            let snapshot = active.snapshot();
            (snapshot.id, snapshot.dir)
        };
        debug!("Tearing down session {}", id.simple());

        active.with_record(|record| {
            record.transition(SessionState::Stopping);
        });

        let mut report = {
            let mut supervisor = active.supervisor.lock().await;
            supervisor.release_all().await
        };

        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("Failed to remove session directory {}: {}", dir.display(), e);
                report.record(TeardownError::RemoveDir {
                    path: dir.clone(),
                    message: e.to_string(),
                });
            }
        }

        active.with_record(|record| {
            record.transition(SessionState::Stopped);
        });

        for error in &report.errors {
            warn!("Session {} teardown: {}", id.simple(), error);
        }
        info!(
            "Session {} torn down ({})",
            id.simple(),
            if report.is_clean() { "clean" } else { "with errors" }
        );
        report
    }
}
