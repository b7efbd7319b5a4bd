use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable holding the pinning-service JWT.
pub const PINNING_JWT_ENV: &str = "PINATA_JWT";

/// Application configuration stored at `~/.bazaar/config.json`.
///
/// The pinning JWT is **never** written to the JSON config file. It is read
/// from the `PINATA_JWT` environment variable on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BazaarConfig {
    /// JSON-RPC endpoint of the wallet-provider node. An empty string means
    /// no provider is available ("wallet not installed").
    pub rpc_url: String,
    /// Address of the deployed marketplace contract.
    pub contract_address: String,
    /// Pinning-service upload endpoint.
    pub pinning_endpoint: String,
    /// Public content-addressed gateway used to resolve token images.
    pub ipfs_gateway: String,
    /// Image shown when a token has no resolvable content identifier.
    pub placeholder_image: String,

    // Secret, loaded from the environment. Skipped during JSON serialization.
    #[serde(skip)]
    pub pinning_jwt: Option<String>,
}

impl Default for BazaarConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545/".to_string(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            pinning_endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            ipfs_gateway: "https://ipfs.io/ipfs/".to_string(),
            placeholder_image: "https://via.placeholder.com/300".to_string(),
            pinning_jwt: None,
        }
    }
}

impl BazaarConfig {
    /// Base directory for all application state: `~/.bazaar`.
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let dir = home.join(".bazaar");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Directory for rotated log files: `~/.bazaar/logs`.
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Load the configuration from `~/.bazaar/config.json`, falling back to
    /// defaults when the file is missing or unreadable, then pick up the
    /// pinning JWT from the environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.pinning_jwt = std::env::var(PINNING_JWT_ENV).ok().filter(|v| !v.is_empty());
        Ok(config)
    }

    /// Load from an explicit path (for testing without `~/.bazaar/`).
    ///
    /// A corrupt file degrades to defaults rather than erroring.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config file is corrupt, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Persist the configuration to `~/.bazaar/config.json`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Persist to an explicit path (for testing).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_node() {
        let config = BazaarConfig::default();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545/");
        assert!(config.pinning_endpoint.contains("pinata.cloud"));
        assert!(config.pinning_jwt.is_none());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BazaarConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.contract_address, BazaarConfig::default().contract_address);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BazaarConfig::default();
        config.rpc_url = "http://10.0.0.2:8545/".to_string();
        config.contract_address = "0x0000000000000000000000000000000000000042".to_string();
        config.save_to(&path).unwrap();

        let loaded = BazaarConfig::load_from(&path).unwrap();
        assert_eq!(loaded.rpc_url, "http://10.0.0.2:8545/");
        assert_eq!(
            loaded.contract_address,
            "0x0000000000000000000000000000000000000042"
        );
    }

    #[test]
    fn jwt_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BazaarConfig::default();
        config.pinning_jwt = Some("secret-jwt".to_string());
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret-jwt"));

        let loaded = BazaarConfig::load_from(&path).unwrap();
        assert!(loaded.pinning_jwt.is_none());
    }

    #[test]
    fn corrupt_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let config = BazaarConfig::load_from(&path).unwrap();
        assert_eq!(config.rpc_url, BazaarConfig::default().rpc_url);
    }
}
