//! Provider traits
//!
//! The core never shells out itself. Cluster and manifest backends, progress
//! reporting and confirmation are injected through these traits, so the
//! engine can run against fakes in tests.

use crate::model::{ClusterSpec, ManifestMode};
use crate::planner::ReconcileAction;
use crate::types::{CommandOutput, ExecutionResult};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error returned by a backend provider
#[derive(Debug, Error)]
pub enum BackendError {
    /// The named object does not exist on the backend
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else, with the backend's message verbatim
    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A node of a running cluster
pub trait NodeHandle: fmt::Debug {
    /// Node (container) name
    fn name(&self) -> String;

    /// Role label recorded on the node
    fn role(&self) -> Result<String, BackendError>;
}

/// Cluster-provisioning backend
///
/// Implementations hold their own target configuration (executable paths,
/// kubeconfig location); nothing is read from process-wide state.
pub trait ClusterProvider {
    /// Create a cluster from a validated spec
    fn create(&self, spec: &ClusterSpec) -> Result<(), BackendError>;

    /// Delete a cluster by name
    fn delete(&self, name: &str) -> Result<(), BackendError>;

    /// Names of all existing clusters
    fn list(&self) -> Result<Vec<String>, BackendError>;

    /// Nodes of the named cluster
    fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>, BackendError>;
}

/// Manifest-applying backend
///
/// A non-zero exit is not an `Err`: it comes back as a [`CommandOutput`]
/// with `success == false` and the executor decides what it means. `Err` is
/// reserved for failing to run the backend at all.
pub trait ManifestProvider {
    /// Apply a manifest file or overlay directory
    fn apply(&self, path: &Path, mode: ManifestMode) -> Result<CommandOutput, BackendError>;

    /// Delete what a manifest file or overlay directory describes
    fn delete(&self, path: &Path, mode: ManifestMode) -> Result<CommandOutput, BackendError>;

    /// Create a namespace
    fn create_namespace(&self, name: &str) -> Result<CommandOutput, BackendError>;
}

/// Progress callback for plan execution
pub trait ProgressCallback {
    /// Called before the first action of a plan
    fn on_plan_start(&mut self, count: usize);

    /// Called when an action starts
    fn on_action_start(&mut self, action: &ReconcileAction);

    /// Called when an action completes
    fn on_action_complete(&mut self, action: &ReconcileAction, result: &ExecutionResult);

    /// Called when an action fails; no further actions of the plan run
    fn on_action_failed(&mut self, action: &ReconcileAction, error: &crate::Error);

    /// Called after the last action of a plan
    fn on_plan_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _count: usize) {}
    fn on_action_start(&mut self, _action: &ReconcileAction) {}
    fn on_action_complete(&mut self, _action: &ReconcileAction, _result: &ExecutionResult) {}
    fn on_action_failed(&mut self, _action: &ReconcileAction, _error: &crate::Error) {}
    fn on_plan_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}
