//! Configuration for the SMS index tool.

use std::path::{Path, PathBuf};

use kdeconnect_sms::{AddressResolver, AddressVariant, FixedResolver, PlatformResolver};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_LEVEL, DEFAULT_QUERY_TIMEOUT_SECS};

/// Which store addresses to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantChoice {
    /// Decide from the API level
    #[default]
    Auto,
    Modern,
    Legacy,
}

/// Tool configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// API level of the phone the database came from
    pub api_level: u32,
    /// Path to the exported `mmssms.db`
    pub database_path: Option<PathBuf>,
    /// Override for the address variant
    pub address_variant: VariantChoice,
    /// Seconds a query may run before it is abandoned
    pub query_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_level: DEFAULT_API_LEVEL,
            database_path: None,
            address_variant: VariantChoice::Auto,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from disk, falling back to defaults if it cannot be read.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::error!(?err, "Failed to read config {}, using defaults", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                tracing::info!("Loaded config: {:?}", config);
                config
            }
            Err(err) => {
                tracing::error!(?err, "Failed to parse config {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Resolver matching the configured API level and override.
    pub fn resolver(&self) -> Box<dyn AddressResolver> {
        match self.address_variant {
            VariantChoice::Auto => Box::new(PlatformResolver::new(self.api_level)),
            VariantChoice::Modern => Box::new(FixedResolver(AddressVariant::Modern)),
            VariantChoice::Legacy => Box::new(FixedResolver(AddressVariant::Legacy)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_partial_config_keeps_defaults() {
        let file = write_config(r#"{ "api_level": 16, "database_path": "/tmp/mmssms.db" }"#);
        let config = Config::load(file.path());

        assert_eq!(config.api_level, 16);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/mmssms.db")));
        assert_eq!(config.address_variant, VariantChoice::Auto);
        assert_eq!(config.query_timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
        assert_eq!(config.resolver().variant(), AddressVariant::Legacy);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let file = write_config("not json");
        assert_eq!(Config::load(file.path()), Config::default());

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(&dir.path().join("missing.json")), Config::default());
    }

    #[test]
    fn test_variant_override_beats_api_level() {
        let file = write_config(r#"{ "api_level": 30, "address_variant": "legacy" }"#);
        let config = Config::load(file.path());
        assert_eq!(config.resolver().variant(), AddressVariant::Legacy);

        let config = Config {
            api_level: 10,
            address_variant: VariantChoice::Modern,
            ..Config::default()
        };
        assert_eq!(config.resolver().variant(), AddressVariant::Modern);
    }
}
