//! Backend abstraction for kind operations.
//!
//! The [`Backend`] trait defines the interface for managing kind clusters,
//! allowing for different implementations (real CLI, fakes for testing).

pub mod kind;

use crate::error::Result;
use crate::types::ClusterConfig;
use std::fmt;
use std::path::Path;

/// A node of a running cluster.
pub trait NodeHandle: Send + Sync + fmt::Debug {
    /// Node (container) name, e.g. `dev-control-plane`
    fn name(&self) -> &str;

    /// Role recorded on the node, as kind spells it.
    fn role(&self) -> Result<String>;
}

/// Backend trait for kind operations.
///
/// This trait abstracts the underlying cluster provisioner, enabling:
/// - Real CLI execution via the `kind` command
/// - Fake implementations for testing
pub trait Backend: Send + Sync {
    /// Check if kind is available.
    fn is_available(&self) -> bool;

    /// Create a cluster from a cluster document.
    fn create(&self, config: &ClusterConfig) -> Result<()>;

    /// Delete a cluster.
    ///
    /// `kubeconfig` selects the kubeconfig file whose entry for the cluster
    /// is removed; `None` uses kind's default.
    fn delete(&self, name: &str, kubeconfig: Option<&Path>) -> Result<()>;

    /// List the names of all clusters.
    fn list(&self) -> Result<Vec<String>>;

    /// List the nodes of a cluster.
    fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>>;
}
