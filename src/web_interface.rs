//! HTTP control API.
//!
//! Thin warp front end over the session registry: create/list/status/stop,
//! receiver listing, artifact retrieval and a liveness probe. Handlers only
//! translate between HTTP and registry calls; no session logic lives here.

pub mod routes;
pub mod types;
pub mod web_server;

pub use web_server::WebServer;
