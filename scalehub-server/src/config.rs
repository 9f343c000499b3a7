use scalehub_core::{RecordBackendBuilder, Result, ScaleError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage: StorageConfig::default(),
        }
    }
}

/// Where machine records are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Fs => "fs",
            StorageBackend::Memory => "memory",
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Fs
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("machine_data")
}

impl Config {
    /// Load `path` (optional) layered under `SCALEHUB_*` environment
    /// variables, then apply the `PORT` override used by hosting platforms.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(path, None, std::env::var("PORT").ok().as_deref())
    }

    /// `env` replaces the process environment when given.
    fn load(
        path: &str,
        env: Option<::config::Map<String, String>>,
        port: Option<&str>,
    ) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("SCALEHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .map_err(|e| ScaleError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ScaleError::Config(e.to_string()))?;

        config.with_port_override(port)
    }

    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self> {
        let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(self);
        };

        let port: u16 = port
            .parse()
            .map_err(|_| ScaleError::Config(format!("invalid PORT value: {}", port)))?;

        let mut addr: SocketAddr = self.bind_addr.parse().map_err(|e| {
            ScaleError::Config(format!("invalid bind_addr '{}': {}", self.bind_addr, e))
        })?;
        addr.set_port(port);
        self.bind_addr = addr.to_string();

        Ok(self)
    }

    pub fn record_backend_builder(&self) -> RecordBackendBuilder {
        RecordBackendBuilder::new()
            .backend(self.storage.backend.as_str())
            .data_dir(self.storage.data_dir.clone())
    }
}
