//! Session orchestration engine.
//!
//! One orchestrator task per session drives the state machine
//! (`starting → playing → stopping → stopped`, with `error` reachable from
//! every active state), supervises the external pipeline processes, watches
//! output freshness, and guarantees idempotent teardown.
//!
//! Re-exports:
//! - [`SessionOrchestrator`]: the per-session state machine task.
//! - [`ResourceSupervisor`]: ordered acquire/release of pipeline resources.
//! - [`CleanupCoordinator`]: best-effort, idempotent teardown.

pub mod cleanup;
pub mod orchestrator;
pub mod resource_supervisor;
#[cfg(test)]
pub mod tests;

pub use cleanup::CleanupCoordinator;
pub use orchestrator::SessionOrchestrator;
pub use resource_supervisor::ResourceSupervisor;
