//! Service configuration.
//!
//! Configuration is loaded from an optional TOML file and finished off with
//! command-line overrides in `main`. Every value has a default so the service
//! can start with no file at all.
//!
//! Re-exports:
//! - [`Config`]: the validated top-level configuration.
//! - [`ServerConfig`], [`SessionLimits`], [`PipelineConfig`], [`ReceiverConfig`]: sections.

pub mod config;
pub mod types;

pub use config::Config;
pub use types::{PipelineConfig, ReceiverConfig, ServerConfig, SessionLimits};
