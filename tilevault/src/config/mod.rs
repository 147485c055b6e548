//! Engine configuration file handling.
//!
//! Loads and saves user configuration from `~/.tilevault/config.ini`
//! with sensible defaults. Everything here is host-side policy: where
//! packs live, which catalog to talk to, whether unsigned packs may be
//! installed and which publisher keys to trust.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Failed to write the config file.
    #[error("failed to write config file: {0}")]
    Write(String),

    /// A value did not parse.
    #[error("invalid configuration: {section}.{key} = '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding installed pack files.
    pub packs_dir: PathBuf,

    /// Remote catalog URL, if configured.
    pub catalog_url: Option<String>,

    /// Only signature-verified packs may be installed.
    pub require_signed_packs: bool,

    /// Trusted publisher keys, lowercase hex.
    pub trusted_keys: Vec<String>,

    /// Download timeout in seconds.
    pub download_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            packs_dir: default_packs_dir(),
            catalog_url: None,
            require_signed_packs: false,
            trusted_keys: Vec::new(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("packs")) {
            if let Some(dir) = section.get("packs_dir") {
                config.packs_dir = PathBuf::from(dir);
            }
            if let Some(url) = section.get("catalog_url") {
                if !url.is_empty() {
                    config.catalog_url = Some(url.to_string());
                }
            }
            if let Some(timeout) = section.get("download_timeout_secs") {
                config.download_timeout_secs =
                    timeout
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            section: "packs".to_string(),
                            key: "download_timeout_secs".to_string(),
                            value: timeout.to_string(),
                        })?;
            }
        }

        if let Some(section) = ini.section(Some("integrity")) {
            if let Some(value) = section.get("require_signed_packs") {
                config.require_signed_packs =
                    parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                        section: "integrity".to_string(),
                        key: "require_signed_packs".to_string(),
                        value: value.to_string(),
                    })?;
            }
            if let Some(keys) = section.get("trusted_keys") {
                config.trusted_keys = keys
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }

        Ok(config)
    }

    /// Save configuration to a specific path, creating parent
    /// directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("packs"))
            .set("packs_dir", self.packs_dir.to_string_lossy().to_string())
            .set(
                "catalog_url",
                self.catalog_url.clone().unwrap_or_default(),
            )
            .set(
                "download_timeout_secs",
                self.download_timeout_secs.to_string(),
            );
        ini.with_section(Some("integrity"))
            .set(
                "require_signed_packs",
                if self.require_signed_packs { "true" } else { "false" },
            )
            .set("trusted_keys", self.trusted_keys.join(","));

        ini.write_to_file(path)
            .map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Download timeout as a [`Duration`].
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Default packs directory: `~/.tilevault/packs`.
pub fn default_packs_dir() -> PathBuf {
    config_dir().join("packs")
}

/// Path of the config file: `~/.tilevault/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilevault")
}
