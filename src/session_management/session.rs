use crate::capture::encoder::{HlsProfile, MASTER_PLAYLIST};
use crate::casting::sender::ReceiverTarget;
use crate::error_handling::types::SessionFailure;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle state of a session.
///
/// Transitions are restricted to the edges in [`SessionState::can_transition`];
/// only the session's own orchestrator and the cleanup coordinator move a
/// record between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Playing,
    Stopping,
    Stopped,
    Error,
}

impl SessionState {
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Starting, Playing)
                | (Starting, Stopping)
                | (Starting, Error)
                | (Playing, Stopping)
                | (Playing, Error)
                | (Stopping, Stopped)
                | (Stopping, Error)
                | (Error, Stopping)
        )
    }

    /// States in which the session still owns (or may still acquire)
    /// external resources.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Playing | SessionState::Stopping)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Starting => "starting",
            SessionState::Playing => "playing",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Immutable snapshot of the parameters a session was created with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub source_url: String,
    pub receiver: ReceiverTarget,
    pub profile: HlsProfile,
    pub cookies_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub title: String,
    pub hide_browser_ui: bool,
}

/// The persisted state of one casting session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    /// Working directory exclusive to this session; holds the playlist, the
    /// rolling segments and browser scratch.
    pub dir: PathBuf,
    /// X display allocated to this session, e.g. `:99`.
    pub display: String,
    pub config: SessionConfig,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub last_healthy_at: Option<DateTime<Utc>>,
    /// Most recent fatal failure, kept for diagnostics after teardown.
    pub last_error: Option<SessionFailure>,
    /// Set when the receiver link is degraded; the session keeps playing.
    pub receiver_degraded: Option<String>,
}

impl SessionRecord {
    pub fn new(id: Uuid, dir: PathBuf, display: String, config: SessionConfig) -> Self {
        Self {
            id,
            dir,
            display,
            config,
            state: SessionState::Starting,
            started_at: Utc::now(),
            last_healthy_at: None,
            last_error: None,
            receiver_degraded: None,
        }
    }

    /// Applies a state transition if it is legal; returns whether it was.
    pub fn transition(&mut self, to: SessionState) -> bool {
        if self.state.can_transition(to) {
            self.state = to;
            true
        } else {
            false
        }
    }

    pub fn mark_healthy(&mut self) {
        self.last_healthy_at = Some(Utc::now());
    }

    /// Records a fatal failure and moves the record to `Error`.
    pub fn record_failure(&mut self, failure: SessionFailure) {
        self.last_error = Some(failure);
        self.transition(SessionState::Error);
    }

    pub fn master_playlist_path(&self) -> PathBuf {
        self.dir.join(MASTER_PLAYLIST)
    }

    /// URL path of the master playlist under the artifact routes.
    pub fn playlist_url_path(&self) -> String {
        format!("/cast/{}/{}", self.id.simple(), MASTER_PLAYLIST)
    }
}
