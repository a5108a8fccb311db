use super::types::*;
use crate::error_handling::types::ConfigError;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Top-level service configuration.
///
/// Loaded with [`Config::from_file`] or built from [`Config::default`]; either
/// way it must pass [`Config::validate`] before the controller will use it.
///
/// # Fields Overview
///
/// - `server`: HTTP bind address/port and the advertised media hostname
/// - `sessions_root`: directory under which each session gets its own
///   exclusive working directory
/// - `limits`: concurrency limits and the timing constants of the session
///   state machine
/// - `pipeline`: external binary names for the capture pipeline
/// - `receiver`: receiver-control capability settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sessions_root: PathBuf,
    pub limits: SessionLimits,
    pub pipeline: PipelineConfig,
    pub receiver: ReceiverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sessions_root: PathBuf::from("sessions"),
            limits: SessionLimits::default(),
            pipeline: PipelineConfig::default(),
            receiver: ReceiverConfig::default(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the rest of the service relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadBindAddress(self.server.bind_address.clone()))?;
        if self.server.port == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "server.port must be non-zero",
            )));
        }
        if self.limits.max_sessions == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "limits.max_sessions must be at least 1",
            )));
        }
        if self.limits.health_interval_ms == 0 || self.limits.stale_after_ms == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "limits.health_interval_ms and limits.stale_after_ms must be non-zero",
            )));
        }
        if !matches!(self.pipeline.color_depth, 8 | 16 | 24 | 30) {
            return Err(ConfigError::NotInRange(format!(
                "pipeline.color_depth {} is not a valid X depth",
                self.pipeline.color_depth
            )));
        }
        Ok(())
    }

    /// Host part of the media URL handed to receivers.
    pub fn advertised_host(&self) -> &str {
        match &self.server.advertise_host {
            Some(host) => host.as_str(),
            None => self.server.bind_address.as_str(),
        }
    }

    /// Absolute URL of a session's master playlist as seen by a receiver.
    pub fn media_url(&self, playlist_path: &str) -> String {
        format!(
            "http://{}:{}{}",
            self.advertised_host(),
            self.server.port,
            playlist_path
        )
    }
}
