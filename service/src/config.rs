//! Service configuration: a persisted TOML file overridden by CLI args.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use oracle_attestation::device::DEFAULT_ATTESTATION_ROOT;

const CONFIG_FILE: &str = "config.toml";
const ORACLE_DIR: &str = ".oracled";
const LISTENING_ADDRESS: &str = "0.0.0.0:8000";

/// CLI values that override the persisted config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub attestation_root: Option<String>,
    pub whitelist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_url: String,
    /// Directory holding the Gramine attestation pseudo-files.
    pub attestation_root: String,
    /// Hosts accepted for user-supplied attestation URLs.
    pub whitelist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_url: LISTENING_ADDRESS.to_string(),
            attestation_root: DEFAULT_ATTESTATION_ROOT.to_string(),
            whitelist: Vec::new(),
        }
    }
}

impl Config {
    /// Load the config from file.
    pub fn load() -> std::io::Result<Self> {
        let config_file = oracle_dir().join(CONFIG_FILE);
        toml::from_str(&std::fs::read_to_string(config_file)?).map_err(|e| {
            std::io::Error::new(
                ErrorKind::InvalidData,
                format!("Could not parse service config file: {e}"),
            )
        })
    }

    /// First try to load the config file and apply the CLI overrides on
    /// top. If loading fails, start from the defaults instead. The final
    /// config is persisted either way.
    pub fn load_or_init(overrides: Overrides) -> Self {
        let mut conf = match Self::load() {
            Ok(conf) => conf,
            Err(e) => {
                tracing::warn!("Could not load config file: {e}");
                tracing::info!("New config created.");
                Self::default()
            }
        };
        conf = conf.apply(overrides);
        if let Err(e) = conf.save() {
            tracing::warn!("Could not persist config file: {e}");
        }
        conf
    }

    /// Overlay CLI overrides onto this config.
    fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(listen) = overrides.listen {
            self.listen_url = listen;
        }
        if let Some(root) = overrides.attestation_root {
            self.attestation_root = root;
        }
        if !overrides.whitelist.is_empty() {
            self.whitelist = overrides.whitelist;
        }
        self
    }

    /// Save the config file.
    pub fn save(&self) -> std::io::Result<()> {
        let dir = oracle_dir();
        if !std::fs::exists(&dir)? {
            std::fs::create_dir_all(&dir)?;
        }
        let rendered = toml::to_string(self)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(dir.join(CONFIG_FILE), rendered)
    }
}

pub fn oracle_dir() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(ORACLE_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let conf = Config::default().apply(Overrides {
            listen: Some("127.0.0.1:9000".into()),
            attestation_root: None,
            whitelist: vec!["api.example.com".into()],
        });
        assert_eq!(conf.listen_url, "127.0.0.1:9000");
        assert_eq!(conf.attestation_root, DEFAULT_ATTESTATION_ROOT);
        assert_eq!(conf.whitelist, vec!["api.example.com".to_string()]);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let conf = Config {
            listen_url: "0.0.0.0:8000".into(),
            attestation_root: "/dev/attestation".into(),
            whitelist: vec!["a.example".into(), "b.example".into()],
        };
        let rendered = toml::to_string(&conf).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.listen_url, conf.listen_url);
        assert_eq!(parsed.whitelist, conf.whitelist);
    }
}
