use crate::casting::sender::Sender;
use crate::configuration::Config;
use crate::error_handling::types::ControllerError;
use crate::session_management::session_registry::SessionRegistry;
use crate::web_interface::web_server::WebServer;
use log::info;
use std::sync::Arc;

/// Wires configuration, the sender capability, the session registry and the
/// web server together, and owns the process-wide shutdown sequence.
pub struct Controller {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    sender: Arc<Sender>,
}

impl Controller {
    /// Validates the configuration and selects the sender capability once
    /// for the whole process lifetime.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        let config = Arc::new(config);
        let sender = Arc::new(Sender::from_config(&config.receiver));
        let registry = SessionRegistry::new(config.clone(), sender.clone());
        Ok(Self {
            config,
            registry,
            sender,
        })
    }

    /// Serves the HTTP API until interrupted, then stops every session
    /// before returning so no pipeline process outlives the service.
    pub async fn run(&self) -> Result<(), ControllerError> {
        let server = WebServer::new(
            self.config.clone(),
            self.registry.clone(),
            self.sender.clone(),
        );

        tokio::select! {
            result = server.start() => {
                result?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
            }
        }

        self.registry.shutdown_all().await;
        info!("All sessions stopped; exiting");
        Ok(())
    }
}
