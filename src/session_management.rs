//! Session lifecycle data and the registry.
//!
//! A [`SessionRecord`] is the externally visible state of one casting
//! session; an [`ActiveSession`] pairs it with the live resources and control
//! signals owned by that session's orchestrator task. The [`SessionRegistry`]
//! is the single entry point for creating, inspecting and stopping sessions.

pub mod active_session;
pub mod session;
pub mod session_registry;

pub use active_session::ActiveSession;
pub use session::{SessionConfig, SessionRecord, SessionState};
pub use session_registry::SessionRegistry;
