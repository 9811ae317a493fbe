use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use rapid_engine::DocumentStore;

use crate::config::{RapidConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Rapid REST server.
pub struct RapidServer {
    config: ServerConfig,
    store: Arc<DocumentStore>,
}

impl RapidServer {
    pub fn new(config: ServerConfig, store: Arc<DocumentStore>) -> Self {
        Self { config, store }
    }

    /// Open the configured table backend and build a server on top of it.
    pub fn from_config(config: &RapidConfig) -> ServerResult<Self> {
        let store = Arc::new(config.open_store()?);
        Ok(Self::new(config.server.clone(), store))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.store))
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Rapid server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
