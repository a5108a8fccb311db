use crate::capture::encoder::HlsEncoder;
use crate::casting::sender::{ReceiverTarget, Sender};
use crate::configuration::Config;
use crate::error_handling::types::{
    ReceiverError, ResourceKind, SessionFailure, TeardownError, TeardownReport,
};
use crate::rendering::browser::{BrowserLaunch, ChromiumDriver};
use crate::rendering::xvfb::Xvfb;
use crate::session_management::session::SessionRecord;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::process::Child;

pub struct DisplayHandle {
    child: Child,
}

pub struct BrowserHandle {
    child: Child,
}

pub struct EncoderHandle {
    child: Child,
}

/// Outcome of the receiver-link step. Kept even when degraded so release
/// knows whether playback must be stopped on the device.
pub struct ReceiverLink {
    target: ReceiverTarget,
    established: bool,
}

/// Owns the ordered acquisition and release of one session's external
/// resources: display → browser → encoder → receiver link on the way up,
/// exact reverse on the way down. Handles are absent until acquired and are
/// never shared outside this supervisor.
pub struct ResourceSupervisor {
    config: Arc<Config>,
    sender: Arc<Sender>,
    display: Option<DisplayHandle>,
    browser: Option<BrowserHandle>,
    encoder: Option<EncoderHandle>,
    receiver: Option<ReceiverLink>,
}

impl ResourceSupervisor {
    pub fn new(config: Arc<Config>, sender: Arc<Sender>) -> Self {
        Self {
            config,
            sender,
            display: None,
            browser: None,
            encoder: None,
            receiver: None,
        }
    }

    /// Acquires display, browser and encoder in order. On failure the caller
    /// is expected to run [`ResourceSupervisor::release_all`]; nothing is
    /// rolled back here so the partial acquisition state stays inspectable.
    pub async fn acquire_media_pipeline(
        &mut self,
        record: &SessionRecord,
    ) -> Result<(), SessionFailure> {
        let profile = &record.config.profile;

        let xvfb = Xvfb::new(
            &self.config.pipeline.xvfb_bin,
            &record.display,
            profile.width,
            profile.height,
            self.config.pipeline.color_depth,
        );
        let child = xvfb.spawn().map_err(|e| SessionFailure::Provisioning {
            resource: ResourceKind::Display,
            message: e.to_string(),
        })?;
        self.display = Some(DisplayHandle { child });

        let driver = ChromiumDriver::new(&self.config.pipeline.chromium_bin);
        let launch = BrowserLaunch {
            url: record.config.source_url.clone(),
            display: record.display.clone(),
            width: profile.width,
            height: profile.height,
            hide_ui: record.config.hide_browser_ui,
            cookies_path: record.config.cookies_path.clone(),
            user_data_dir: record.config.user_data_dir.clone(),
        };
        let child = driver
            .prepare(&record.dir, &launch)
            .and_then(|prepared| driver.spawn(&prepared, &launch))
            .map_err(|e| SessionFailure::Provisioning {
                resource: ResourceKind::Browser,
                message: e.to_string(),
            })?;
        self.browser = Some(BrowserHandle { child });

        let encoder = HlsEncoder::new(
            &self.config.pipeline.ffmpeg_bin,
            &record.display,
            &record.dir,
            profile.clone(),
        );
        let child = encoder.spawn().map_err(|e| SessionFailure::Provisioning {
            resource: ResourceKind::Encoder,
            message: e.to_string(),
        })?;
        self.encoder = Some(EncoderHandle { child });

        info!(
            "Session {} media pipeline up on {}",
            record.id.simple(),
            record.display
        );
        Ok(())
    }

    /// Best-effort receiver link, the fourth and last acquisition step.
    pub async fn link_receiver(
        &mut self,
        record: &SessionRecord,
        media_url: &str,
    ) -> Result<(), ReceiverError> {
        let target = record.config.receiver.clone();
        let result = self
            .sender
            .play(&target, media_url, &record.config.title)
            .await;
        self.receiver = Some(ReceiverLink {
            target,
            established: result.is_ok(),
        });
        result
    }

    /// Checks every owned process for an unexpected exit. Exited children
    /// keep their handle so release can skip the kill.
    pub fn check_processes(&mut self) -> Result<(), SessionFailure> {
        let owned = [
            (ResourceKind::Display, self.display.as_mut().map(|h| &mut h.child)),
            (ResourceKind::Browser, self.browser.as_mut().map(|h| &mut h.child)),
            (ResourceKind::Encoder, self.encoder.as_mut().map(|h| &mut h.child)),
        ];
        for (resource, child) in owned {
            if let Some(child) = child {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(SessionFailure::ProcessExit {
                        resource,
                        status: status.code(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Releases everything in reverse-acquisition order. Each step is
    /// collect-and-continue: a failure is recorded in the report and the
    /// remaining steps still run. Handles never acquired are skipped, which
    /// makes repeated release calls no-ops.
    pub async fn release_all(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(link) = self.receiver.take() {
            if link.established {
                if let Err(e) = self.sender.stop(&link.target).await {
                    report.record(TeardownError::Release {
                        resource: ResourceKind::Receiver,
                        message: e.to_string(),
                    });
                }
            } else {
                debug!("Receiver link was never established; skipping stop");
            }
        }

        if let Some(handle) = self.encoder.take() {
            Self::release_child(ResourceKind::Encoder, handle.child, &mut report).await;
        }
        if let Some(handle) = self.browser.take() {
            Self::release_child(ResourceKind::Browser, handle.child, &mut report).await;
        }
        if let Some(handle) = self.display.take() {
            Self::release_child(ResourceKind::Display, handle.child, &mut report).await;
        }

        report
    }

    /// True when no resource handle is held (all released or never acquired).
    pub fn is_drained(&self) -> bool {
        self.display.is_none()
            && self.browser.is_none()
            && self.encoder.is_none()
            && self.receiver.is_none()
    }

    async fn release_child(resource: ResourceKind, mut child: Child, report: &mut TeardownReport) {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("{} process already exited with {:?}", resource, status.code());
            }
            _ => {
                debug!("Terminating {} process pid {:?}", resource, child.id());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {} process: {}", resource, e);
                    report.record(TeardownError::Release {
                        resource,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
