use std::path::{Path, PathBuf};

use models::{error::Error, transactions::DedupKey};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub blocking_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: 2, blocking_threads: 1 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("./log"), filter: "info".to_string() }
    }
}

/// A backend without a section is disabled.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub memory: Option<MemoryConfig>,
    pub csv: Option<CsvConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MemoryConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CsvConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub dedup_key: DedupKey,
}

fn enabled() -> bool {
    true
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Without a path every default applies and no backend is enabled.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }
}
