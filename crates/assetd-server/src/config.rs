use std::net::SocketAddr;
use std::path::Path;

use assetd_manager::ManagerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest buffer append chunk, in bytes. Asset uploads stream and are
    /// not capped.
    pub max_body_size: usize,
    pub storage: ManagerConfig,
}

impl ServerConfig {
    /// Read a TOML configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8960)),
            max_body_size: 64 * 1024 * 1024,
            storage: ManagerConfig::default(),
        }
    }
}
