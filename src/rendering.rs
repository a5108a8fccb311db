//! Off-screen rendering adapters.
//!
//! A session renders its page on a private Xvfb display, with a Chromium
//! process pointed at the target URL. Both adapters only build commands and
//! spawn children; the spawned processes are owned by the session's resource
//! supervisor.

pub mod browser;
pub mod xvfb;

pub use browser::{BrowserLaunch, ChromiumDriver};
pub use xvfb::Xvfb;
