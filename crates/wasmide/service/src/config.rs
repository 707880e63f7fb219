//! Configuration for wasmided

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use wasmide_compiler::ToolchainConfig;
use wasmide_projects::ProjectsConfig;

#[cfg(feature = "s3")]
use wasmide_storage::s3::S3Config;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Where project files and build artifacts live
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Where project metadata rows live
    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub projects: ProjectsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            cors_origins: Vec::new(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Object storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// In-process store, lost on restart
    Memory {
        /// Prefix of the URLs handed out for stored objects
        #[serde(default = "default_memory_base_url")]
        base_url: String,
    },

    /// S3-compatible bucket
    #[cfg(feature = "s3")]
    S3(S3Config),
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        ObjectStoreConfig::Memory {
            base_url: default_memory_base_url(),
        }
    }
}

/// Metadata store backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// In-process store, lost on restart
    #[default]
    Memory,

    /// PostgreSQL
    #[cfg(feature = "postgres")]
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_memory_base_url() -> String {
    "memory://objects".to_string()
}

#[cfg(feature = "postgres")]
fn default_pool_size() -> u32 {
    10
}

#[cfg(feature = "postgres")]
fn default_connection_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Layer built-in defaults, the optional file at `path` and `WASMIDE_*`
    /// environment variables, in that order.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `WASMIDE_SERVER__LISTEN_ADDR=0.0.0.0:8080`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WASMIDE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
