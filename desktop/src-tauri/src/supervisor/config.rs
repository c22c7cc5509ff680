//! Supervisor configuration with validation and versioning.

use crate::supervisor::{PortSearchRange, SupervisorError, SupervisorResult};

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_HOST: &str = "127.0.0.1";
// The backend allocates the first free port upward from 8090 and tries
// at most ten candidates, so the shell searches the same window.
const DEFAULT_BASE_PORT: u16 = 8090;
const DEFAULT_PORT_RANGE: (u16, u16) = (8090, 8099);
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 10;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_STARTUP_GRACE_MS: u64 = 1500;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Backend process settings
    #[serde(default)]
    pub backend: BackendSettings,

    /// Health check policy
    #[serde(default)]
    pub health: HealthSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Host the backend binds to (always 127.0.0.1 for security)
    #[serde(default = "default_host")]
    pub host: String,

    /// First port the backend tries to bind, and first port probed
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Inclusive port window the backend may end up on
    #[serde(default = "default_port_range")]
    pub port_range: (u16, u16),

    /// Explicit backend executable; when unset the binary is discovered
    /// next to the shell executable, in the data dir, then on PATH
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Extra arguments passed to the backend
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the backend; defaults to the backend data dir
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Environment overrides applied on spawn
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Seconds between health sweeps
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,

    /// Per-probe timeout (milliseconds)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Consecutive fully-failed sweeps before a restart is attempted
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Delay between spawn and the first discovery sweep (milliseconds)
    #[serde(default = "default_startup_grace")]
    pub startup_grace_ms: u64,

    /// Graceful shutdown window before the process is killed (seconds)
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative to data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}
fn default_port_range() -> (u16, u16) {
    DEFAULT_PORT_RANGE
}
fn default_health_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL_SECS
}
fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}
fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}
fn default_startup_grace() -> u64 {
    DEFAULT_STARTUP_GRACE_MS
}
fn default_shutdown_grace() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}

// === Default Implementations ===

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendSettings::default(),
            health: HealthSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            port_range: default_port_range(),
            executable: None,
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval(),
            probe_timeout_ms: default_probe_timeout(),
            failure_threshold: default_failure_threshold(),
            startup_grace_ms: default_startup_grace(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
        }
    }
}

// === Typed Accessors ===

impl BackendSettings {
    pub fn search_range(&self) -> PortSearchRange {
        PortSearchRange::new(self.port_range.0, self.port_range.1, self.base_port)
    }

    pub fn host_addr(&self) -> IpAddr {
        if self.host == "localhost" {
            return IpAddr::V4(Ipv4Addr::LOCALHOST);
        }
        self.host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

impl HealthSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

// === Configuration Operations ===

impl SupervisorConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> SupervisorResult<Self> {
        let config_path = data_dir.join(CONFIG_FILENAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| SupervisorError::ConfigInvalid {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            // Migrate if needed
            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(data_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern to prevent
    /// partial writes if the process is interrupted.
    pub fn save(&self, data_dir: &Path) -> SupervisorResult<()> {
        let config_path = data_dir.join(CONFIG_FILENAME);
        let content = toml::to_string_pretty(self).map_err(|e| SupervisorError::ConfigInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> SupervisorResult<Self> {
        // Version 0 -> 1: Add health policy settings
        if config.version == 0 {
            config.health = HealthSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> SupervisorResult<()> {
        // Port must be unprivileged
        if self.backend.base_port < MIN_PORT {
            return Err(SupervisorError::ConfigInvalid {
                message: format!("Base port must be >= {} (unprivileged)", MIN_PORT),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Port range must be valid
        if self.backend.port_range.0 > self.backend.port_range.1 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Invalid port range: start > end".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Base port must sit inside the search range
        if !self.backend.search_range().is_valid() {
            return Err(SupervisorError::ConfigInvalid {
                message: format!(
                    "Base port {} outside search range {}-{}",
                    self.backend.base_port, self.backend.port_range.0, self.backend.port_range.1
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Health loop timing must be positive
        if self.health.interval_secs == 0 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Health check interval must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.health.probe_timeout_ms == 0 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Probe timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.health.failure_threshold == 0 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Failure threshold must be >= 1".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Host must be localhost for security
        if self.backend.host != DEFAULT_HOST && self.backend.host != "localhost" {
            return Err(SupervisorError::ConfigInvalid {
                message: format!("Host must be {DEFAULT_HOST} or localhost for security"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
