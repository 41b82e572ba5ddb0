use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorCategory;

/// How a manifest source is handed to kubectl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// A single manifest file (`-f`)
    #[default]
    Plain,
    /// A kustomize overlay directory (`-k`)
    Overlay,
}

impl ApplyMode {
    /// The kubectl flag selecting this mode.
    pub fn flag(&self) -> &'static str {
        match self {
            ApplyMode::Plain => "-f",
            ApplyMode::Overlay => "-k",
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Plain => write!(f, "plain"),
            ApplyMode::Overlay => write!(f, "overlay"),
        }
    }
}

/// Outcome of one kubectl invocation.
///
/// A non-zero exit is not an error at this level; the caller decides what a
/// failure means (a namespace that already exists is usually fine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The command line, for messages
    pub command: String,
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub combined: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Categorize a failed invocation from its output.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_output(&self.combined)
    }

    /// Whether the command failed only because the object already exists.
    pub fn is_already_exists(&self) -> bool {
        !self.success() && self.category() == ErrorCategory::AlreadyExists
    }

    /// Trimmed combined output.
    pub fn text(&self) -> &str {
        self.combined.trim()
    }
}
