//! IPFS connection settings loaded from a TOML file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Default IPFS daemon RPC endpoint
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";

/// Default HTTP gateway used to build browsable URLs
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080/ipfs";

/// Connection settings for the IPFS daemon and the remote pinning service
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IpfsSettings {
    /// IPFS daemon RPC API URL
    pub api_url: String,
    /// HTTP gateway URL
    pub gateway_url: String,
    /// Remote pinning service, required only for pinning
    pub pinning_service: Option<PinningService>,
}

impl Default for IpfsSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            pinning_service: None,
        }
    }
}

/// Remote pinning service credentials
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PinningService {
    pub name: String,
    pub endpoint: String,
    /// API key, or `$NAME` to read it from the environment variable `NAME`
    pub key: String,
}

impl PinningService {
    /// Check that name, endpoint and key are all present
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("No name configured for pinning service");
        }
        if self.endpoint.is_empty() {
            anyhow::bail!("No endpoint configured for pinning service {}", self.name);
        }
        if self.key.is_empty() {
            anyhow::bail!(
                "No key configured for pinning service {}. If the config references an \
                 environment variable, e.g. '$PINATA_API_TOKEN', make sure that the variable is defined.",
                self.name
            );
        }
        Ok(())
    }
}

impl IpfsSettings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("IPFS settings file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read IPFS settings: {:?}", path))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse IPFS settings: {:?}", path))
    }

    /// Parse settings and resolve `$NAME` references against the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut settings: IpfsSettings = toml::from_str(content)?;
        if let Some(service) = settings.pinning_service.as_mut() {
            service.key = resolve_env_reference(&service.key);
        }
        Ok(settings)
    }
}

/// `$NAME` becomes the value of `NAME` (empty when unset); other values pass through
fn resolve_env_reference(value: &str) -> String {
    match value.strip_prefix('$') {
        Some(name) if !name.is_empty() => std::env::var(name).unwrap_or_default(),
        _ => value.to_string(),
    }
}
