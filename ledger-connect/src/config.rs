//! Configuration management for ledger-connect.
//!
//! This module handles loading configuration from a TOML file. Every field
//! has a default, so a missing file or a partial file are both valid.
//! Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
    types::{EnvironmentType, PlatformKind, TransportType},
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LEDGER_CONNECT_CONFIG";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Ledger connection settings
    pub ledger: LedgerConfig,

    /// Where the UI is running
    pub environment: EnvironmentConfig,

    /// Message catalog settings
    pub i18n: I18nConfig,
}

/// Ledger connection settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Transport the user configured
    pub transport: TransportType,

    /// Show the contract data / blind signing step
    pub show_data_instruction: bool,
}

/// Environment settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub kind: EnvironmentType,
    pub platform: PlatformKind,
}

/// Message catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct I18nConfig {
    /// `messages.json` to load instead of the built-in English text
    pub messages: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Checks `$LEDGER_CONNECT_CONFIG`, then
    /// `$XDG_CONFIG_HOME/ledger-connect/config.toml` (or
    /// `~/.config/ledger-connect/config.toml`). Falls back to defaults when
    /// no file exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::load_from(Path::new(&path));
        }

        match default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::parse(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn default_path() -> Option<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("ledger-connect").join("config.toml"))
}
