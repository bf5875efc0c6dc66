use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of the unbound plugin for one server block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct UnboundConfig {
    /// Zones answered by the plugin. Empty means the zones of the server block.
    #[serde(default)]
    pub from: Vec<String>,
    /// Zones below `from` that are left to the next plugin.
    #[serde(default)]
    pub except: Vec<String>,
    /// Engine settings, applied in order.
    #[serde(default)]
    pub settings: Vec<Setting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Setting {
    /// Engine option, see unbound.conf(5).
    Option { key: String, value: String },
    /// Engine configuration file.
    Config { path: PathBuf },
    /// Trust anchor file. Enables strict DNSSEC validation.
    Anchor { path: PathBuf },
}

impl UnboundConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Whether any trust anchor is configured.
    pub fn is_strict(&self) -> bool {
        self.settings.iter().any(|s| matches!(s, Setting::Anchor { .. }))
    }
}
