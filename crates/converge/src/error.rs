//! Error types for reconciliation
//!
//! Every error is terminal for the current cycle. Nothing is retried here;
//! the caller decides whether and when to run another cycle.

use crate::types::ClusterState;
use thiserror::Error;

/// Errors surfaced by planning, execution, and lifecycle operations
#[derive(Debug, Error)]
pub enum Error {
    /// Desired state is malformed
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The cluster backend failed to create or delete a cluster
    #[error("error provisioning cluster {cluster}: {message}")]
    ProvisionFailure { cluster: String, message: String },

    /// An update deleted the old cluster and then failed to create the new one
    #[error("cluster {deleted} was deleted but {cluster} could not be created: {message}")]
    RecreateFailed {
        deleted: String,
        cluster: String,
        message: String,
    },

    /// The manifest backend exited non-zero
    #[error("{command} failed:\n{output}")]
    ApplyFailure { command: String, output: String },

    /// Observing a cluster failed
    #[error("error reading cluster state: {message}")]
    ProbeFailure { message: String },
}

impl Error {
    /// Shorthand for a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// State the affected cluster is known to be in after this error
    pub fn cluster_state(&self) -> ClusterState {
        match self {
            Self::RecreateFailed { .. } => ClusterState::Absent,
            Self::ProvisionFailure { .. } | Self::ProbeFailure { .. } => ClusterState::Unknown,
            Self::Validation { .. } | Self::ApplyFailure { .. } => ClusterState::Unknown,
        }
    }

    /// Whether an operator has to recreate the cluster by hand
    pub fn requires_recreate(&self) -> bool {
        matches!(self, Self::RecreateFailed { .. })
    }

    /// What to do about it
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Fix the configuration and run again",
            Self::ProvisionFailure { .. } => "Read the cluster state again before the next run",
            Self::RecreateFailed { .. } => {
                "The old cluster is gone; fix the cause and create the cluster again"
            }
            Self::ApplyFailure { .. } => "Fix the manifest or the cluster and apply again",
            Self::ProbeFailure { .. } => "Check that kind and the container runtime are running",
        }
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, Error>;
