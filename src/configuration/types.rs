use serde::Deserialize;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub bind_address: String,
    /// Port the HTTP API binds to.
    pub port: u16,
    /// Hostname receivers should use to reach the playlist. Receivers pull
    /// the stream over HTTP, so the bind address is often not routable from
    /// their point of view; this overrides the host part of the media URL.
    pub advertise_host: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 8080,
            advertise_host: None,
        }
    }
}

/// Per-session limits and timings, in milliseconds unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Maximum number of concurrently active sessions.
    pub max_sessions: usize,
    /// Upper bound on the whole provisioning phase, including the wait for
    /// the first playlist output.
    pub provisioning_timeout_ms: u64,
    /// Interval between health checks while a session is playing.
    pub health_interval_ms: u64,
    /// Output older than this is considered stale.
    pub stale_after_ms: u64,
    /// How long an explicit stop waits for graceful teardown before forcing.
    pub stop_grace_ms: u64,
    /// Overall bound on shutting down every session at process exit.
    pub shutdown_timeout_ms: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 8,
            provisioning_timeout_ms: 15_000,
            health_interval_ms: 1_000,
            stale_after_ms: 8_000,
            stop_grace_ms: 10_000,
            shutdown_timeout_ms: 15_000,
        }
    }
}

/// External binaries the capture pipeline is built from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub xvfb_bin: String,
    pub chromium_bin: String,
    pub ffmpeg_bin: String,
    /// Color depth of the virtual display.
    pub color_depth: u32,
    /// First X display number to allocate; sessions count upwards from here.
    pub first_display: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            xvfb_bin: String::from("Xvfb"),
            chromium_bin: String::from("chromium"),
            ffmpeg_bin: String::from("ffmpeg"),
            color_depth: 24,
            first_display: 99,
        }
    }
}

/// Receiver-control capability settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// When false, the sender capability is disabled at startup and sessions
    /// run without a receiver link.
    pub enabled: bool,
    /// Default FCast control port when a request does not specify one.
    pub default_port: u16,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_port: 46899,
        }
    }
}
