use crate::casting::sender::Sender;
use crate::configuration::Config;
use crate::error_handling::types::ControllerError;
use crate::session_management::session_registry::SessionRegistry;
use crate::web_interface::routes;
use log::info;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

/// Web server for the HTTP control API and artifact retrieval.
pub struct WebServer {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    sender: Arc<Sender>,
}

impl WebServer {
    pub fn new(config: Arc<Config>, registry: Arc<SessionRegistry>, sender: Arc<Sender>) -> Self {
        Self {
            config,
            registry,
            sender,
        }
    }

    /// Composes the full route tree.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        routes::dashboard_route()
            .or(routes::healthz_route())
            .or(routes::create_session_route(
                self.registry.clone(),
                self.config.clone(),
            ))
            .or(routes::list_sessions_route(self.registry.clone()))
            .or(routes::session_status_route(self.registry.clone()))
            .or(routes::stop_session_route(self.registry.clone()))
            .or(routes::receivers_route(self.sender.clone()))
            .or(routes::artifact_route(self.config.clone()))
    }

    /// Runs the server until the process shuts down.
    pub async fn start(&self) -> Result<(), ControllerError> {
        let ip: IpAddr = self
            .config
            .server
            .bind_address
            .parse()
            .map_err(|_| ControllerError::BindError(self.config.server.bind_address.clone()))?;
        let addr = SocketAddr::from((ip, self.config.server.port));

        info!("HTTP API listening on {}", addr);
        warp::serve(self.routes()).run(addr).await;
        Ok(())
    }
}
