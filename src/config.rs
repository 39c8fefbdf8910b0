//! Application configuration
//!
//! Loaded from a TOML file. Every field has a default, so a partial file
//! (or no file at all) is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub queue: QueueConfig,
    pub dispatch: DispatchConfig,
    pub ui: UiConfig,
}

/// UDP link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Detection source address, used for logging and replies
    pub server_address: String,
    pub server_port: u16,
    /// Local listen port; 0 picks an ephemeral port
    pub local_port: u16,
    pub auto_connect: bool,
    pub receive_timeout_ms: u64,
    /// How long `disconnect` waits for the receive thread
    pub join_timeout_ms: u64,
    /// Pause after a transient receive error
    pub error_backoff_ms: u64,
    pub max_datagram_size: usize,
    /// SO_RCVBUF hint, applied best-effort
    pub recv_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            local_port: DEFAULT_LOCAL_PORT,
            auto_connect: true,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            error_backoff_ms: DEFAULT_ERROR_BACKOFF_MS,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl NetworkConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Resolved detection source endpoint
    pub fn server_endpoint(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("server_address {:?} is not an IP", self.server_address))
        })?;
        Ok(SocketAddr::new(ip, self.server_port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Messages drained per tick
    pub drain_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            drain_limit: DEFAULT_DRAIN_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub tick_rate_hz: u32,
    /// Log queue depth every N ticks; 0 disables
    pub status_log_interval_ticks: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            status_log_interval_ticks: DEFAULT_STATUS_LOG_INTERVAL,
        }
    }
}

impl DispatchConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

/// Status API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl AppConfig {
    /// Platform config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bev-detection-link")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or the platform default), falling back to defaults
    /// when the file does not exist
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        tracing::info!("Loading config from {}", path.display());
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity must be at least 1".into()));
        }
        if self.queue.drain_limit == 0 {
            return Err(ConfigError::Invalid("queue.drain_limit must be at least 1".into()));
        }
        if self.network.receive_timeout_ms == 0 {
            // A zero read timeout means "block forever" to the OS
            return Err(ConfigError::Invalid(
                "network.receive_timeout_ms must be at least 1".into(),
            ));
        }
        if self.network.join_timeout_ms <= self.network.receive_timeout_ms {
            return Err(ConfigError::Invalid(
                "network.join_timeout_ms must exceed network.receive_timeout_ms".into(),
            ));
        }
        if self.network.max_datagram_size == 0 {
            return Err(ConfigError::Invalid(
                "network.max_datagram_size must be at least 1".into(),
            ));
        }
        if self.dispatch.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("dispatch.tick_rate_hz must be at least 1".into()));
        }
        self.network.server_endpoint()?;
        Ok(())
    }
}
