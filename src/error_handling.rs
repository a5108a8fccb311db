//! Error types shared across the crate.
//!
//! Every subsystem reports failures through an explicit enum defined in
//! [`types`]; conversions between layers go through `From` impls rather than
//! blanket boxing so that callers can match on the failure they care about.

pub mod types;

pub use types::{
    ClientError, ConfigError, ControllerError, ReceiverError, ResourceKind, SessionError,
    SessionFailure, TeardownError, TeardownReport,
};
