//! Server application state

use crate::config::ServerConfig;
use ipfs::Ipfs;
use std::sync::Arc;

/// Shared, read-only state handed to every request
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub ipfs: Arc<dyn Ipfs>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, ipfs: Arc<dyn Ipfs>) -> Self {
        Self { config, ipfs }
    }
}
