//! Configuration file support.
//!
//! Loads netlinker settings and route fixtures from TOML:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [kernel]
//! recv_buffer_size = 1048576
//!
//! [[routes]]
//! dst = "10.10.10.0/24"
//! link_index = 5
//!
//! [[routes]]
//! dst = "10.10.20.0/24"
//! gw = "10.10.10.254"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, RouteError};
use crate::mock::MockHandle;
use crate::route::Route;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Kernel handle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Netlink socket receive buffer size in bytes
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,

    /// `RTPROT_*` value stamped on routes the handle adds
    #[serde(default = "default_route_protocol")]
    pub route_protocol: u8,
}

/// Complete netlinker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetlinkerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub kernel: KernelConfig,

    /// Routes used to seed a mock handle
    #[serde(default)]
    pub routes: Vec<Route>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recv_buffer_size() -> usize {
    1024 * 1024
}

fn default_route_protocol() -> u8 {
    // RTPROT_BOOT, what `ip route add` uses
    3
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: default_recv_buffer_size(),
            route_protocol: default_route_protocol(),
        }
    }
}

impl NetlinkerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RouteError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| RouteError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check settings that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            return Err(RouteError::config("logging.level must not be empty"));
        }

        // Smaller buffers cannot hold a single full dump batch
        if self.kernel.recv_buffer_size < 4096 {
            return Err(RouteError::config(format!(
                "kernel.recv_buffer_size must be at least 4096, got {}",
                self.kernel.recv_buffer_size
            )));
        }

        Ok(())
    }

    /// Builds a mock handle holding the configured routes.
    pub fn seeded_handle(&self) -> Result<MockHandle> {
        MockHandle::with_routes(&self.routes)
    }
}
