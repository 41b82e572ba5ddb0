//! Error types for kind operations.
//!
//! Errors are categorized from the output of the failed command so callers
//! can tell an idempotent no-op (deleting a cluster that is already gone)
//! from a real failure, and give the user appropriate feedback.

use thiserror::Error;

/// Categories of kind errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Cluster or node does not exist
    NotFound,
    /// Cluster with this name already exists
    AlreadyExists,
    /// Container runtime (docker/podman) is not reachable
    RuntimeUnavailable,
    /// Permission denied
    Permission,
    /// kind executable not found
    KindNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether a delete that failed with this category can count as done.
    pub fn is_ignorable_on_delete(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors that can occur during kind operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Cluster (or one of its nodes) does not exist
    #[error("cluster not found: {name}")]
    NotFound {
        /// Name of the missing cluster
        name: String,
        /// Output of the failed command
        message: String,
    },

    /// A cluster with this name already exists
    #[error("cluster already exists: {name}")]
    AlreadyExists {
        /// Name of the existing cluster
        name: String,
        /// Output of the failed command
        message: String,
    },

    /// docker/podman is not running or not reachable
    #[error("container runtime unavailable: {message}")]
    RuntimeUnavailable {
        /// Output of the failed command
        message: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Output of the failed command
        message: String,
    },

    /// kind is not installed or not in PATH
    #[error("kind executable not found: {0}")]
    KindNotFound(String),

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Combined output of the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while rendering a cluster document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            Error::RuntimeUnavailable { .. } => ErrorCategory::RuntimeUnavailable,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::KindNotFound(_) => ErrorCategory::KindNotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Create an error from kind (or container runtime) command output.
    ///
    /// Analyzes the output to categorize the error appropriately.
    pub fn from_kind_output(output: &str, cluster: Option<&str>) -> Self {
        let lower = output.to_lowercase();
        let name = cluster.unwrap_or("unknown").to_string();

        if lower.contains("cannot connect to the docker daemon")
            || lower.contains("is the docker daemon running")
            || lower.contains("failed to connect to the docker api")
            || lower.contains("cannot connect to podman")
        {
            return Error::RuntimeUnavailable {
                message: output.trim().to_string(),
            };
        }

        if lower.contains("node(s) already exist for a cluster") {
            return Error::AlreadyExists {
                name,
                message: output.trim().to_string(),
            };
        }

        if lower.contains("unknown cluster")
            || lower.contains("no nodes found")
            || lower.contains("no such object")
            || lower.contains("no such container")
        {
            return Error::NotFound {
                name,
                message: output.trim().to_string(),
            };
        }

        if lower.contains("permission denied") || lower.contains("operation not permitted") {
            return Error::Permission {
                message: output.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "kind command failed{}",
                cluster.map(|n| format!(" for cluster {n}")).unwrap_or_default()
            ),
            stderr: output.trim().to_string(),
        }
    }

    /// The raw command output, when there is one.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { stderr, .. } => Some(stderr),
            Error::NotFound { message, .. }
            | Error::AlreadyExists { message, .. }
            | Error::RuntimeUnavailable { message }
            | Error::Permission { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type for kind operations.
pub type Result<T> = std::result::Result<T, Error>;
