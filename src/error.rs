//! Error types for certsync.
//!
//! This module defines the error types used by the configuration loader,
//! the playbook runner adapter and the sync orchestrator. HTTP-facing errors
//! live in [`crate::api::error`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for certsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for certsync.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Error loading or parsing the configuration file.
    #[error("Failed to load configuration from '{path}': {message}")]
    ConfigLoad {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration is structurally valid but semantically incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Playbook Errors
    // ========================================================================
    /// Playbook name is not a plain file name.
    #[error("Invalid playbook file name: '{0}'")]
    InvalidPlaybookName(String),

    /// Playbook file does not exist in the playbooks directory.
    #[error("Playbook file not found: {0}")]
    PlaybookNotFound(PathBuf),

    // ========================================================================
    // Runner Errors
    // ========================================================================
    /// The external runner could not be started.
    #[error("Failed to start runner '{command}': {message}")]
    RunnerSpawn {
        /// Runner executable
        command: String,
        /// Error message
        message: String,
    },

    /// The runner's private data directory could not be prepared or read.
    #[error("Runner artifacts error in '{path}': {message}")]
    RunnerArtifacts {
        /// Path inside the private data directory
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new configuration load error.
    pub fn config_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new runner artifacts error.
    pub fn runner_artifacts(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RunnerArtifacts {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error should stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound(_) | Error::ConfigLoad { .. } | Error::Config(_)
        )
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
