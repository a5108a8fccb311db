//! Receiver control over the FCast protocol.
//!
//! The sender capability has exactly two shapes, selected once at startup: a
//! working FCast sender and a disabled no-op. Session logic never asks "is
//! casting available" — it calls the capability and records a degraded link
//! when the call fails.
//!
//! Re-exports:
//! - [`Sender`]: the capability, [`Receiver`], [`ReceiverTarget`].
//! - [`protocol`]: wire framing and message bodies.

pub mod protocol;
pub mod sender;

pub use sender::{Receiver, ReceiverTarget, Sender};
