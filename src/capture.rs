//! Screen capture and output liveness.
//!
//! This module owns the ffmpeg side of a session: building and spawning the
//! x11grab → HLS encoder, and inspecting the produced playlist/segments to
//! derive a liveness signal for the orchestrator.
//!
//! Re-exports:
//! - [`HlsEncoder`], [`HlsProfile`], [`Bitrate`]: encoder process adapter.
//! - [`FreshnessMonitor`], [`FreshnessReport`]: output recency inspection.

pub mod encoder;
pub mod freshness;

pub use encoder::{Bitrate, HlsEncoder, HlsProfile};
pub use freshness::{FreshnessMonitor, FreshnessReport};
