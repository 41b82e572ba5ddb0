use thiserror::Error;

/// Categories of kubectl failures, read from command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The object already exists
    AlreadyExists,
    /// The object (or the manifest source) does not exist
    NotFound,
    /// The API server could not be reached
    Unreachable,
    /// Credentials rejected or action not permitted
    Forbidden,
    /// The manifest did not validate
    Invalid,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Categorize kubectl output.
    pub fn from_output(output: &str) -> Self {
        let lower = output.to_lowercase();

        if lower.contains("(alreadyexists)") || lower.contains("already exists") {
            return Self::AlreadyExists;
        }

        if lower.contains("unable to connect to the server")
            || lower.contains("connection refused")
            || lower.contains("no such host")
            || lower.contains("i/o timeout")
        {
            return Self::Unreachable;
        }

        if lower.contains("(forbidden)")
            || lower.contains("(unauthorized)")
            || lower.contains("must be logged in")
        {
            return Self::Forbidden;
        }

        if lower.contains("(notfound)")
            || lower.contains("does not exist")
            || lower.contains("no objects passed")
        {
            return Self::NotFound;
        }

        if lower.contains("(invalid)")
            || lower.contains("error validating")
            || lower.contains("error parsing")
        {
            return Self::Invalid;
        }

        Self::Other
    }
}

/// Errors that can occur while running kubectl.
#[derive(Debug, Error)]
pub enum Error {
    /// kubectl is not installed or not in PATH
    #[error("kubectl executable not found: {0}")]
    KubectlNotFound(String),

    /// The process could not be started
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// The command line
        command: String,
        /// Underlying IO error
        source: std::io::Error,
    },
}

/// Result type for kubectl operations.
pub type Result<T> = std::result::Result<T, Error>;
