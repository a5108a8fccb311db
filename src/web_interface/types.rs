use crate::capture::encoder::{Bitrate, HlsProfile};
use crate::capture::freshness::FreshnessMonitor;
use crate::casting::sender::{Receiver, ReceiverTarget};
use crate::configuration::ReceiverConfig;
use crate::error_handling::types::SessionError;
use crate::session_management::session::{SessionConfig, SessionRecord, SessionState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartRequest {
    pub url: String,
    pub receiver_name: String,
    #[serde(default)]
    pub receiver_host: Option<String>,
    #[serde(default)]
    pub receiver_port: Option<u16>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_bitrate")]
    pub video_bitrate: String,
    #[serde(default)]
    pub audio: bool,
    #[serde(default)]
    pub audio_device: Option<String>,
    #[serde(default)]
    pub cookies_path: Option<PathBuf>,
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub hide_browser_ui: bool,
}

fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_fps() -> u32 {
    15
}
fn default_bitrate() -> String {
    String::from("3500k")
}
fn default_true() -> bool {
    true
}

impl StartRequest {
    /// Validates the request and freezes it into the immutable per-session
    /// config snapshot.
    pub fn into_session_config(
        self,
        receiver_defaults: &ReceiverConfig,
    ) -> Result<SessionConfig, SessionError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| SessionError::InvalidRequest(format!("url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SessionError::InvalidRequest(format!(
                "url scheme '{}' is not http(s)",
                parsed.scheme()
            )));
        }

        if !(16..=7680).contains(&self.width) || !(16..=4320).contains(&self.height) {
            return Err(SessionError::InvalidRequest(format!(
                "geometry {}x{} out of range",
                self.width, self.height
            )));
        }
        if !(1..=60).contains(&self.fps) {
            return Err(SessionError::InvalidRequest(format!(
                "fps {} out of range",
                self.fps
            )));
        }

        let video_bitrate: Bitrate = self
            .video_bitrate
            .parse()
            .map_err(SessionError::InvalidRequest)?;

        let mut profile = HlsProfile::default();
        profile.width = self.width;
        profile.height = self.height;
        profile.fps = self.fps;
        profile.video_bitrate = video_bitrate;
        profile.audio = self.audio;
        if let Some(device) = self.audio_device {
            profile.audio_device = device;
        }

        Ok(SessionConfig {
            source_url: self.url,
            receiver: ReceiverTarget {
                name: self.receiver_name,
                host: self.receiver_host,
                port: self.receiver_port.unwrap_or(receiver_defaults.default_port),
            },
            profile,
            cookies_path: self.cookies_path,
            user_data_dir: self.user_data_dir,
            title: self.title.unwrap_or_else(|| String::from("WebCast")),
            hide_browser_ui: self.hide_browser_ui,
        })
    }
}

/// Recorded fatal error, as exposed by the status API.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

/// Snapshot of one session as returned by the status routes.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub id: String,
    pub state: SessionState,
    pub hls_url: Option<String>,
    pub last_segment_age_ms: Option<u64>,
    pub segment_count: usize,
    pub source_url: String,
    pub receiver_name: String,
    pub receiver_host: Option<String>,
    pub receiver_port: u16,
    pub receiver_degraded: Option<String>,
    pub started_at: String,
    pub last_healthy_at: Option<String>,
    pub width: u32,
    pub height: u32,
    pub error: Option<ErrorInfo>,
}

impl SessionStatus {
    /// Builds the API view of a record, folding in a fresh look at the
    /// on-disk output.
    pub fn from_record(record: &SessionRecord) -> Self {
        let freshness = FreshnessMonitor::check(&record.dir);
        let hls_url = if record.master_playlist_path().exists() {
            Some(record.playlist_url_path())
        } else {
            None
        };
        Self {
            id: record.id.simple().to_string(),
            state: record.state,
            hls_url,
            last_segment_age_ms: freshness.last_segment_age_ms,
            segment_count: freshness.segment_count,
            source_url: record.config.source_url.clone(),
            receiver_name: record.config.receiver.name.clone(),
            receiver_host: record.config.receiver.host.clone(),
            receiver_port: record.config.receiver.port,
            receiver_degraded: record.receiver_degraded.clone(),
            started_at: record.started_at.to_rfc3339(),
            last_healthy_at: record.last_healthy_at.map(|t| t.to_rfc3339()),
            width: record.config.profile.width,
            height: record.config.profile.height,
            error: record.last_error.as_ref().map(|e| ErrorInfo {
                kind: e.kind().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionStatus>,
}

#[derive(Debug, Serialize)]
pub struct ReceiverListResponse {
    pub receivers: Vec<Receiver>,
}

/// Body of a successful `DELETE /sessions/{id}`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub ok: bool,
    pub state: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StartRequest {
        serde_json::from_str(
            r#"{"url": "https://example.com/page", "receiver_name": "tv"}"#,
        )
        .unwrap()
    }

    fn defaults() -> ReceiverConfig {
        ReceiverConfig::default()
    }

    #[test]
    fn minimal_request_gets_documented_defaults() {
        let request = request();
        assert_eq!(request.width, 1920);
        assert_eq!(request.height, 1080);
        assert_eq!(request.fps, 15);
        assert_eq!(request.video_bitrate, "3500k");
        assert!(request.hide_browser_ui);
        assert!(!request.audio);

        let config = request.into_session_config(&defaults()).unwrap();
        assert_eq!(config.receiver.port, 46899);
        assert_eq!(config.title, "WebCast");
    }

    #[test]
    fn rejects_non_http_urls() {
        let mut request = request();
        request.url = String::from("file:///etc/passwd");
        assert!(matches!(
            request.into_session_config(&defaults()),
            Err(SessionError::InvalidRequest(_))
        ));

        let mut request = self::request();
        request.url = String::from("not a url");
        assert!(request.into_session_config(&defaults()).is_err());
    }

    #[test]
    fn rejects_bad_geometry_and_bitrate() {
        let mut request = request();
        request.width = 0;
        assert!(request.into_session_config(&defaults()).is_err());

        let mut request = self::request();
        request.fps = 500;
        assert!(request.into_session_config(&defaults()).is_err());

        let mut request = self::request();
        request.video_bitrate = String::from("fast");
        assert!(request.into_session_config(&defaults()).is_err());
    }

    #[test]
    fn explicit_receiver_port_wins_over_default() {
        let mut request = request();
        request.receiver_port = Some(50_000);
        request.receiver_host = Some(String::from("10.0.0.9"));
        let config = request.into_session_config(&defaults()).unwrap();
        assert_eq!(config.receiver.port, 50_000);
        assert_eq!(config.receiver.host.as_deref(), Some("10.0.0.9"));
    }
}
