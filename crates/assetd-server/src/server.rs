use std::sync::Arc;

use assetd_manager::StoragesManager;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// assetd HTTP server.
pub struct AssetServer {
    config: ServerConfig,
    manager: Arc<StoragesManager>,
}

impl AssetServer {
    /// Open the storages manager described by `config.storage`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let manager = Arc::new(StoragesManager::open(config.storage.clone())?);
        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<StoragesManager> {
        &self.manager
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.manager), self.config.max_body_size)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "assetd server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
