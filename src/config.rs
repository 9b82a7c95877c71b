//! Server configuration.
//!
//! Defaults are built in. A YAML file named by `BEACON_CONFIG` can override
//! them, and `LISTEN` overrides the listen address last:
//!
//! ```yaml
//! server:
//!   listen_addr: "0.0.0.0:8080"
//!   admission:
//!     strategy: bounded
//!     max_connections: 256
//! static_files:
//!   default_document: index.html
//!   read_buffer_size: 1024
//! log:
//!   level: info
//! ```

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::http::connection::{ConnectionSettings, DEFAULT_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE};
use crate::http::request::{DEFAULT_DOCUMENT, DocumentRoot};
use crate::server::admission::{Admission, MAX_CONNECTIONS, MAX_RATE_PER_SECOND};

pub const CONFIG_PATH_VAR: &str = "BEACON_CONFIG";
pub const LISTEN_VAR: &str = "LISTEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub admission: Admission,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            admission: Admission::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// File served for `/`.
    pub default_document: String,
    /// Size of the single read taken as the request.
    pub read_buffer_size: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            default_document: DEFAULT_DOCUMENT.to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads defaults, then the `BEACON_CONFIG` file if set, then `LISTEN`.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_VAR) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_yaml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen_addr.is_empty() {
            bail!("server.listen_addr must not be empty");
        }
        if self.static_files.default_document.is_empty() {
            bail!("static_files.default_document must not be empty");
        }
        let read_buffer_size = self.static_files.read_buffer_size;
        if read_buffer_size == 0 || read_buffer_size > MAX_READ_BUFFER_SIZE {
            bail!("static_files.read_buffer_size must be between 1 and {MAX_READ_BUFFER_SIZE}");
        }

        match self.server.admission {
            Admission::Bounded { max_connections } if max_connections == 0 || max_connections > MAX_CONNECTIONS => {
                bail!("admission.max_connections must be between 1 and {MAX_CONNECTIONS}")
            }
            Admission::RateLimited { per_second } if per_second == 0 || per_second > MAX_RATE_PER_SECOND => {
                bail!("admission.per_second must be between 1 and {MAX_RATE_PER_SECOND}")
            }
            _ => {}
        }

        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown log level: {}", self.log.level))
    }

    /// Handler settings. Files are always served relative to the working directory.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            root: DocumentRoot::with_default_document(&self.static_files.default_document),
            read_buffer_size: self.static_files.read_buffer_size,
        }
    }
}
