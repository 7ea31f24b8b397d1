//! TOML configuration wiring UDP listeners to named destinations.
//!
//! Every section is optional. The config is built once at startup and
//! passed by reference; nothing here is global.
//!
//! # Example
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [destinations.archive]
//! type = "file"
//! path = "logs/syslog.log"
//!
//! [[listeners]]
//! port = 5514
//! destination = "archive"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::server::{
    ServerConfig, DEFAULT_QUEUE_SIZE, DEFAULT_RECV_BUFFER_SIZE, DEFAULT_WORKERS,
};

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A listener routes to a destination that is not defined
    #[error("listener on port {port} references unknown destination '{destination}'")]
    UnknownDestination { port: u16, destination: String },

    /// Two listeners share a port
    #[error("port {port} is used by multiple listeners")]
    DuplicatePort { port: u16 },

    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        component: &'static str,
        name: String,
        field: &'static str,
        message: String,
    },

    #[error("no listeners are configured")]
    NoListeners,
}

impl ConfigError {
    fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Where decoded messages go, selected by `type`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DestinationConfig {
    File { path: PathBuf },
    Stdout,
}

/// One UDP listener and the destination its messages are routed to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub address: String,
    pub port: u16,
    pub destination: String,
    pub workers: usize,
    pub queue_size: usize,
    pub recv_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 514,
            destination: String::new(),
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl ListenerConfig {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            address: self.address.clone(),
            port: self.port,
            workers: self.workers,
            queue_size: self.queue_size,
            recv_buffer_size: self.recv_buffer_size,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub destinations: BTreeMap<String, DestinationConfig>,
    pub listeners: Vec<ListenerConfig>,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        contents.parse()
    }

    /// Check cross references and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.listeners.is_empty() {
            return Err(ConfigError::NoListeners);
        }

        for (name, destination) in &self.destinations {
            if let DestinationConfig::File { path } = destination {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::invalid_value(
                        "destination",
                        name,
                        "path",
                        "must not be empty",
                    ));
                }
            }
        }

        let mut ports: HashMap<u16, usize> = HashMap::new();
        for listener in &self.listeners {
            let name = format!("{}:{}", listener.address, listener.port);

            if !self.destinations.contains_key(&listener.destination) {
                return Err(ConfigError::UnknownDestination {
                    port: listener.port,
                    destination: listener.destination.clone(),
                });
            }

            if listener.workers == 0 {
                return Err(ConfigError::invalid_value(
                    "listener",
                    &name,
                    "workers",
                    "must be at least 1",
                ));
            }

            if listener.queue_size == 0 {
                return Err(ConfigError::invalid_value(
                    "listener",
                    &name,
                    "queue_size",
                    "must be at least 1",
                ));
            }

            if listener.recv_buffer_size == 0 {
                return Err(ConfigError::invalid_value(
                    "listener",
                    &name,
                    "recv_buffer_size",
                    "must be at least 1",
                ));
            }

            // port 0 asks for an ephemeral port, those never collide
            if listener.port != 0 {
                let seen = ports.entry(listener.port).or_default();
                *seen += 1;
                if *seen > 1 {
                    return Err(ConfigError::DuplicatePort {
                        port: listener.port,
                    });
                }
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
