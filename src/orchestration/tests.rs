//! Lifecycle tests for the orchestration engine.
//!
//! The pipeline binaries are replaced with shell stubs written into a
//! tempdir, so the full create → playing → stop path runs against real
//! spawned processes without X, Chromium or ffmpeg installed. Playlist
//! output is simulated by a writer task touching artifacts in the session
//! working directory.

use crate::capture::encoder::HlsProfile;
use crate::casting::sender::{ReceiverTarget, Sender};
use crate::configuration::Config;
use crate::error_handling::types::SessionError;
use crate::orchestration::cleanup::CleanupCoordinator;
use crate::orchestration::resource_supervisor::ResourceSupervisor;
use crate::session_management::active_session::ActiveSession;
use crate::session_management::session::{SessionConfig, SessionRecord, SessionState};
use crate::session_management::session_registry::SessionRegistry;
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Writes an executable shell stub and returns its path.
fn fake_bin(dir: &Path, name: &str, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

/// Config with fast timings and stubbed binaries that stay alive.
fn test_config(scratch: &Path) -> Config {
    let mut config = Config::default();
    config.sessions_root = scratch.join("sessions");
    config.limits.max_sessions = 4;
    config.limits.provisioning_timeout_ms = 3_000;
    config.limits.health_interval_ms = 50;
    config.limits.stale_after_ms = 500;
    config.limits.stop_grace_ms = 2_000;
    config.limits.shutdown_timeout_ms = 3_000;
    config.pipeline.xvfb_bin = fake_bin(scratch, "fake-xvfb", "exec sleep 30");
    config.pipeline.chromium_bin = fake_bin(scratch, "fake-chromium", "exec sleep 30");
    config.pipeline.ffmpeg_bin = fake_bin(scratch, "fake-ffmpeg", "exec sleep 30");
    config
}

fn session_config() -> SessionConfig {
    let mut profile = HlsProfile::default();
    profile.width = 1280;
    profile.height = 720;
    profile.fps = 15;
    SessionConfig {
        source_url: String::from("https://example.com/dashboard"),
        receiver: ReceiverTarget {
            name: String::from("living-room"),
            host: None,
            port: 46899,
        },
        profile,
        cookies_path: None,
        user_data_dir: None,
        title: String::from("WebCast"),
        hide_browser_ui: true,
    }
}

fn registry(config: Config) -> Arc<SessionRegistry> {
    let sender = Arc::new(Sender::from_config(&config.receiver));
    SessionRegistry::new(Arc::new(config), sender)
}

/// Keeps the session's output looking live until aborted.
fn spawn_output_writer(dir: PathBuf) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let _ = std::fs::write(dir.join("index.m3u8"), "#EXTM3U\n");
            let _ = std::fs::write(dir.join("seg000.ts"), b"segment");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
}

async fn wait_for_state(
    registry: &SessionRegistry,
    id: Uuid,
    state: SessionState,
    timeout: Duration,
) -> SessionRecord {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Some(record) = registry.get(id) {
            if record.state == state {
                return record;
            }
        }
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for session {} to reach {}",
            id.simple(),
            state
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn session_reaches_playing_then_stops_cleanly() {
    let scratch = tempfile::tempdir().unwrap();
    let registry = registry(test_config(scratch.path()));

    let created = registry.create(session_config()).unwrap();
    assert_eq!(created.state, SessionState::Starting);
    assert!(created.dir.is_dir());

    let writer = spawn_output_writer(created.dir.clone());
    let playing = wait_for_state(&registry, created.id, SessionState::Playing, Duration::from_secs(3)).await;
    assert!(playing.last_healthy_at.is_some());
    assert!(playing.master_playlist_path().exists());
    // The receiver has a name but no address and discovery is unsupported:
    // the link degrades but the session still plays.
    assert!(playing.receiver_degraded.is_some());
    assert!(playing.last_error.is_none());

    // Quiesce the writer first so directory removal cannot race a write.
    writer.abort();
    let stopped = registry.stop(created.id).await.unwrap();
    assert_eq!(stopped.state, SessionState::Stopped);
    assert!(!created.dir.exists(), "working directory must be removed");
    assert!(registry.get(created.id).is_none());

    // Stopping an unknown (already removed) session is NotFound.
    assert!(matches!(
        registry.stop(created.id).await,
        Err(SessionError::NotFound)
    ));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn provisioning_failure_releases_acquired_resources() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = test_config(scratch.path());
    config.pipeline.ffmpeg_bin = String::from("/nonexistent/fake-ffmpeg");
    let registry = registry(config);

    let created = registry.create(session_config()).unwrap();
    let errored =
        wait_for_state(&registry, created.id, SessionState::Error, Duration::from_secs(2)).await;
    assert_eq!(errored.last_error.as_ref().unwrap().kind(), "provisioning");

    // Display and browser were acquired before the encoder failed; all
    // handles must be gone again.
    let active = registry.get_active(created.id).unwrap();
    assert!(active.supervisor.lock().await.is_drained());
    // Errored sessions keep their directory for diagnostics until stopped.
    assert!(created.dir.exists());

    let stopped = registry.stop(created.id).await.unwrap();
    assert_eq!(stopped.state, SessionState::Stopped);
    assert_eq!(stopped.last_error.as_ref().unwrap().kind(), "provisioning");
    assert!(!created.dir.exists());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn missing_output_times_out_within_provisioning_deadline() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = test_config(scratch.path());
    config.limits.provisioning_timeout_ms = 400;
    let registry = registry(config);

    // No output writer: the stubs never produce a playlist.
    let created = registry.create(session_config()).unwrap();
    let errored =
        wait_for_state(&registry, created.id, SessionState::Error, Duration::from_secs(2)).await;
    assert_eq!(errored.last_error.as_ref().unwrap().kind(), "provisioning");

    let active = registry.get_active(created.id).unwrap();
    assert!(active.supervisor.lock().await.is_drained());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn stale_output_moves_session_to_error() {
    let scratch = tempfile::tempdir().unwrap();
    let registry = registry(test_config(scratch.path()));

    let created = registry.create(session_config()).unwrap();
    let writer = spawn_output_writer(created.dir.clone());
    wait_for_state(&registry, created.id, SessionState::Playing, Duration::from_secs(3)).await;

    // Output stops; the next checks see the age grow past the threshold.
    writer.abort();
    let errored =
        wait_for_state(&registry, created.id, SessionState::Error, Duration::from_secs(3)).await;
    assert_eq!(errored.last_error.as_ref().unwrap().kind(), "stale_output");

    let active = registry.get_active(created.id).unwrap();
    assert!(active.supervisor.lock().await.is_drained());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn encoder_exit_is_detected_by_health_checks() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = test_config(scratch.path());
    // Encoder dies shortly after the session starts.
    config.pipeline.ffmpeg_bin = fake_bin(scratch.path(), "dying-ffmpeg", "sleep 1");
    let registry = registry(config);

    let created = registry.create(session_config()).unwrap();
    let writer = spawn_output_writer(created.dir.clone());
    wait_for_state(&registry, created.id, SessionState::Playing, Duration::from_secs(3)).await;

    let errored =
        wait_for_state(&registry, created.id, SessionState::Error, Duration::from_secs(4)).await;
    writer.abort();
    assert_eq!(errored.last_error.as_ref().unwrap().kind(), "process_exit");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn teardown_is_idempotent() {
    let scratch = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(scratch.path()));
    let sender = Arc::new(Sender::from_config(&config.receiver));

    let dir = scratch.path().join("sessions").join("manual");
    std::fs::create_dir_all(&dir).unwrap();
    let record = SessionRecord::new(
        Uuid::new_v4(),
        dir.clone(),
        String::from(":150"),
        session_config(),
    );
    let supervisor = ResourceSupervisor::new(config.clone(), sender);
    let (active, _done_tx) = ActiveSession::new(record, supervisor);

    let first = CleanupCoordinator::teardown(&active).await;
    assert!(first.is_clean());
    assert!(!dir.exists());
    assert_eq!(active.snapshot().state, SessionState::Stopped);

    let second = CleanupCoordinator::teardown(&active).await;
    assert!(second.is_clean());
    assert_eq!(active.snapshot().state, SessionState::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn shutdown_all_leaves_no_session_running() {
    let scratch = tempfile::tempdir().unwrap();
    let registry = registry(test_config(scratch.path()));

    // One session reaches playing, one stays stuck in starting.
    let playing = registry.create(session_config()).unwrap();
    let writer = spawn_output_writer(playing.dir.clone());
    wait_for_state(&registry, playing.id, SessionState::Playing, Duration::from_secs(3)).await;
    let starting = registry.create(session_config()).unwrap();

    writer.abort();
    registry.shutdown_all().await;

    assert!(registry.list().is_empty());
    assert!(!playing.dir.exists());
    assert!(!starting.dir.exists());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn session_limit_is_enforced() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = test_config(scratch.path());
    config.limits.max_sessions = 1;
    let registry = registry(config);

    let first = registry.create(session_config()).unwrap();
    assert!(matches!(
        registry.create(session_config()),
        Err(SessionError::LimitReached)
    ));

    registry.stop(first.id).await.unwrap();
    // Capacity is released once the session is gone.
    let second = registry.create(session_config()).unwrap();
    registry.stop(second.id).await.unwrap();
}
