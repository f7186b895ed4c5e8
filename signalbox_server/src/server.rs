use crate::{
    args::Config,
    error::ConfigError,
    handler::{health_handler, ws_handler},
    state::{PeerRegistry, ServerState},
};
use axum::{Router, routing::get};
use std::future::Future;
use tokio::{net::TcpListener, sync::watch};
use tracing::{debug, info};

/// A signaling relay ready to be served on a listener
pub struct SignalingServer {
    state: ServerState,
    shutdown: watch::Sender<bool>,
}

impl SignalingServer {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        Ok(Self {
            state: ServerState::new(config, shutdown_rx),
            shutdown,
        })
    }

    /// Handle to the live connections, e.g. for monitoring
    pub fn registry(&self) -> &PeerRegistry {
        &self.state.registry
    }

    /// Routes: WebSocket upgrades on the configured path plus `/health`
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.state.config.path, get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    /// Serve until `signal` resolves, then close every open session.
    ///
    /// Returns once every session has left the registry and its socket
    /// writer has sent the Close frame.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let sessions = self.state.sessions.clone();
        let shutdown = self.shutdown;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("closing open connections");
                let _ = shutdown.send(true);
            })
            .await?;

        sessions.close();
        debug!(remaining = sessions.len(), "waiting for sessions to finish");
        sessions.wait().await;
        info!("all sessions closed");
        Ok(())
    }
}
