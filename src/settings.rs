//! Chain network settings, persisted next to the record store.
//!
//! Settings are handed to the submission routines explicitly; nothing reads
//! them from ambient state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the settings file inside the data directory.
pub(crate) const SETTINGS_FILE: &str = "chain-settings.json";

const DEFAULT_CHAIN_ID: u64 = 1;

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("Invalid JSON format for ABI: {0}")]
    InvalidAbi(serde_json::Error),
    #[error("serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Known networks and their chain ids.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Network {
    Mainnet,
    Goerli,
    Sepolia,
    Polygon,
    Custom,
}

impl Network {
    /// Chain id implied by the network; `None` for custom networks.
    pub(crate) fn chain_id(self) -> Option<u64> {
        match self {
            Network::Mainnet => Some(1),
            Network::Goerli => Some(5),
            Network::Sepolia => Some(11_155_111),
            Network::Polygon => Some(137),
            Network::Custom => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ChainSettings {
    pub(crate) rpc_url: String,
    pub(crate) network_name: Network,
    pub(crate) chain_id: u64,
    pub(crate) contract_abi: String,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            network_name: Network::Mainnet,
            chain_id: DEFAULT_CHAIN_ID,
            contract_abi: String::new(),
        }
    }
}

/// Partial update applied by `settings set`.
#[derive(Debug, Default)]
pub(crate) struct SettingsUpdate {
    pub(crate) rpc_url: Option<String>,
    pub(crate) network: Option<Network>,
    pub(crate) chain_id: Option<u64>,
    pub(crate) contract_abi: Option<String>,
}

impl ChainSettings {
    /// Apply an update. A network change resets the chain id to the
    /// network's own (1 for custom networks); an explicit chain id wins.
    pub(crate) fn apply(&mut self, update: SettingsUpdate) {
        if let Some(url) = update.rpc_url {
            self.rpc_url = url;
        }
        if let Some(network) = update.network {
            self.network_name = network;
            self.chain_id = network.chain_id().unwrap_or(DEFAULT_CHAIN_ID);
        }
        if let Some(id) = update.chain_id {
            self.chain_id = id;
        }
        if self.chain_id == 0 {
            self.chain_id = DEFAULT_CHAIN_ID;
        }
        if let Some(abi) = update.contract_abi {
            self.contract_abi = abi;
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !self.contract_abi.trim().is_empty() {
            serde_json::from_str::<serde_json::Value>(&self.contract_abi)
                .map_err(SettingsError::InvalidAbi)?;
        }
        Ok(())
    }
}

/// Load settings; a missing or malformed file yields defaults.
pub(crate) fn load_settings(path: &Path) -> ChainSettings {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to read settings");
            }
            return ChainSettings::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "settings are malformed, using defaults");
            ChainSettings::default()
        }
    }
}

/// Validate and overwrite the settings file.
pub(crate) fn save_settings(path: &Path, settings: &ChainSettings) -> Result<(), SettingsError> {
    settings.validate()?;
    let json = serde_json::to_vec_pretty(settings)?;
    let write_error = |source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, json).map_err(write_error)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = load_settings(&dir.path().join(SETTINGS_FILE));
        assert_eq!(settings, ChainSettings::default());
        assert_eq!(settings.network_name, Network::Mainnet);
        assert_eq!(settings.chain_id, 1);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{not json").expect("seed settings");
        assert_eq!(load_settings(&path), ChainSettings::default());
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE);
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            rpc_url: Some("https://sepolia.infura.io/v3/key".to_string()),
            network: Some(Network::Sepolia),
            contract_abi: Some(r#"[{"type":"function","name":"store"}]"#.to_string()),
            ..SettingsUpdate::default()
        });
        save_settings(&path, &settings).expect("save");

        let loaded = load_settings(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.chain_id, 11_155_111);

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("parse");
        assert_eq!(raw["networkName"], "sepolia");
        assert_eq!(raw["chainId"], 11_155_111);
    }

    #[test]
    fn invalid_abi_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE);
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            contract_abi: Some("not json".to_string()),
            ..SettingsUpdate::default()
        });

        let err = save_settings(&path, &settings).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidAbi(_)));
        assert!(err.to_string().starts_with("Invalid JSON format for ABI"));
        assert!(!path.exists());
    }

    #[test]
    fn network_change_sets_chain_id() {
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            network: Some(Network::Polygon),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.chain_id, 137);
    }

    #[test]
    fn custom_network_keeps_explicit_chain_id() {
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            network: Some(Network::Custom),
            chain_id: Some(31_337),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.network_name, Network::Custom);
        assert_eq!(settings.chain_id, 31_337);
    }

    #[test]
    fn custom_network_without_chain_id_defaults_to_one() {
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            network: Some(Network::Polygon),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.chain_id, 137);

        settings.apply(SettingsUpdate {
            network: Some(Network::Custom),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.network_name, Network::Custom);
        assert_eq!(settings.chain_id, 1);
    }

    #[test]
    fn chain_id_alone_keeps_network() {
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            network: Some(Network::Custom),
            ..SettingsUpdate::default()
        });
        settings.apply(SettingsUpdate {
            chain_id: Some(31_337),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.network_name, Network::Custom);
        assert_eq!(settings.chain_id, 31_337);
    }

    #[test]
    fn zero_chain_id_falls_back_to_default() {
        let mut settings = ChainSettings::default();
        settings.apply(SettingsUpdate {
            network: Some(Network::Custom),
            chain_id: Some(0),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.chain_id, 1);
    }
}
