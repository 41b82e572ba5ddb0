//! # kindkit
//!
//! Rust library for managing local kind (Kubernetes in Docker) clusters.
//!
//! This crate provides functionality for:
//! - Rendering `kind.x-k8s.io/v1alpha4` cluster documents
//! - Creating and deleting clusters through the `kind` CLI
//! - Listing clusters and resolving the role of each node
//!
//! ## Example
//!
//! ```no_run
//! use kindkit::{Client, ClusterConfig, Node, NodeRole};
//!
//! let client = Client::with_paths("kind", "docker");
//!
//! let config = ClusterConfig::new("dev")
//!     .with_node(Node::new(NodeRole::ControlPlane))
//!     .with_node(Node::new(NodeRole::Worker));
//! client.create(&config).expect("create failed");
//!
//! for node in client.list_nodes("dev").expect("list failed") {
//!     println!("{} {}", node.name(), node.role().expect("inspect failed"));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::NodeHandle;
pub use error::{Error, ErrorCategory, Result};
pub use types::{ClusterConfig, Mount, Node, NodeRole};

use backend::{Backend, kind::KindBackend};
use std::path::Path;

/// High-level client for kind operations.
///
/// The client wraps a backend and provides convenient methods for
/// creating, deleting, and inspecting clusters.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client for explicit kind and container runtime executables.
    pub fn with_paths(kind_path: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            backend: Box::new(KindBackend::with_paths(kind_path, runtime)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Check if kind is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Create a cluster.
    pub fn create(&self, config: &ClusterConfig) -> Result<()> {
        log::info!("Creating kind cluster {}", config.name);
        self.backend.create(config)
    }

    /// Delete a cluster.
    pub fn delete(&self, name: &str, kubeconfig: Option<&Path>) -> Result<()> {
        log::info!("Deleting kind cluster {name}");
        self.backend.delete(name, kubeconfig)
    }

    /// List all cluster names.
    pub fn list(&self) -> Result<Vec<String>> {
        self.backend.list()
    }

    /// List the raw node handles of a cluster.
    pub fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>> {
        self.backend.list_nodes(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeNode {
        name: String,
        role: String,
    }

    impl NodeHandle for FakeNode {
        fn name(&self) -> &str {
            &self.name
        }

        fn role(&self) -> Result<String> {
            Ok(self.role.clone())
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        clusters: Mutex<Vec<String>>,
    }

    impl Backend for FakeBackend {
        fn is_available(&self) -> bool {
            true
        }

        fn create(&self, config: &ClusterConfig) -> Result<()> {
            let mut clusters = self.clusters.lock().unwrap();
            if clusters.contains(&config.name) {
                return Err(Error::AlreadyExists {
                    name: config.name.clone(),
                    message: format!("node(s) already exist for a cluster with the name \"{}\"", config.name),
                });
            }
            clusters.push(config.name.clone());
            Ok(())
        }

        fn delete(&self, name: &str, _kubeconfig: Option<&Path>) -> Result<()> {
            self.clusters.lock().unwrap().retain(|c| c != name);
            Ok(())
        }

        fn list(&self) -> Result<Vec<String>> {
            Ok(self.clusters.lock().unwrap().clone())
        }

        fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>> {
            Ok(vec![
                Box::new(FakeNode {
                    name: format!("{name}-control-plane"),
                    role: "control-plane".to_string(),
                }),
                Box::new(FakeNode {
                    name: format!("{name}-worker"),
                    role: "worker".to_string(),
                }),
            ])
        }
    }

    #[test]
    fn test_create_then_list() {
        let client = Client::with_backend(Box::new(FakeBackend::default()));
        assert!(client.list().unwrap().is_empty());

        client.create(&ClusterConfig::new("dev")).unwrap();
        assert_eq!(client.list().unwrap(), vec!["dev"]);

        let err = client.create(&ClusterConfig::new("dev")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::AlreadyExists);
        assert!(err.output().unwrap().contains("already exist for a cluster"));

        client.delete("dev", None).unwrap();
        assert!(client.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_nodes_reports_roles() {
        let client = Client::with_backend(Box::new(FakeBackend::default()));
        let nodes = client.list_nodes("dev").unwrap();

        let roles: Vec<(String, String)> = nodes
            .iter()
            .map(|n| (n.name().to_string(), n.role().unwrap()))
            .collect();
        assert_eq!(roles, vec![
            ("dev-control-plane".to_string(), "control-plane".to_string()),
            ("dev-worker".to_string(), "worker".to_string()),
        ]);
    }
}
