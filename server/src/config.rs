use std::env;

use openscale_store::eeprom::ATMEGA328P_EEPROM_SIZE;
use openscale_store::{Layout, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {source}")]
    Layout {
        var: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{var}: `{value}` is not a byte count")]
    Size { var: &'static str, value: String },
}

/// Server configuration, read from `OPENSCALE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub static_dir: String,
    /// Record layout of the emulated board.
    pub layout: Layout,
    pub eeprom_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://openscale.db?mode=rwc".into(),
            bind_address: "0.0.0.0:3000".into(),
            static_dir: "static".into(),
            layout: Layout::Standard,
            eeprom_size: ATMEGA328P_EEPROM_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to
    /// its value. Unset variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("OPENSCALE_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(address) = lookup("OPENSCALE_BIND_ADDRESS") {
            config.bind_address = address;
        }
        if let Some(dir) = lookup("OPENSCALE_STATIC_DIR") {
            config.static_dir = dir;
        }
        if let Some(layout) = lookup("OPENSCALE_LAYOUT") {
            config.layout = layout.parse().map_err(|source| ConfigError::Layout {
                var: "OPENSCALE_LAYOUT",
                source,
            })?;
        }
        if let Some(size) = lookup("OPENSCALE_EEPROM_SIZE") {
            config.eeprom_size = size.parse().map_err(|_| ConfigError::Size {
                var: "OPENSCALE_EEPROM_SIZE",
                value: size,
            })?;
        }

        Ok(config)
    }
}
