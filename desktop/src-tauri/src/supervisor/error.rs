use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to create data directory at {path}: {source} {location}")]
    DataDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to spawn backend process: {source} {location}")]
    ProcessSpawn {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Backend binary not found at {path} {location}")]
    BinaryNotFound {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Backend startup failed: {message} {location}")]
    StartupFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Backend is not running {location}")]
    NotRunning { location: ErrorLocation },

    #[error("Health check failed: {message} {location}")]
    HealthCheckFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    /// Whether this error is recoverable via retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HealthCheckFailed { .. } | Self::Http { .. } | Self::StartupFailed { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::ProcessSpawn { .. } => {
                "The backend process could not be launched. \
                   Check the logs and verify the installation is intact."
            }
            Self::BinaryNotFound { .. } => {
                "The application installation appears incomplete. \
                   Please reinstall MultipleLive."
            }
            Self::StartupFailed { .. } => {
                "The backend did not answer on any port in the configured range. \
                   Close applications that may occupy those ports, then restart."
            }
            Self::NotRunning { .. } => {
                "The backend is not running. \
                   Restart it from the tray menu or relaunch the application."
            }
            Self::HealthCheckFailed { .. } => {
                "The backend stopped responding. \
                   It will be restarted automatically; check the logs if this persists."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            Self::DataDirCreation { .. } => {
                "Unable to create application data directory. \
                   Check file permissions or available disk space."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
