//! Core types for kind cluster configuration.
//!
//! These mirror the `kind.x-k8s.io/v1alpha4` cluster document. kind parses
//! its config with a YAML reader that also accepts JSON, so the document is
//! serialized with `serde_json` and handed to `kind create cluster --config -`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// API version of the kind cluster document.
pub const API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

/// Kind of the kind cluster document.
pub const CLUSTER_KIND: &str = "Cluster";

/// Container label kind puts on every node container to record its role.
pub const ROLE_LABEL: &str = "io.x-k8s.kind.role";

/// Role of a node in a kind cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Runs the Kubernetes control plane
    ControlPlane,
    /// Runs workloads only
    Worker,
}

impl NodeRole {
    /// Get the role name as kind spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "control-plane",
            NodeRole::Worker => "worker",
        }
    }

    /// Parse a role name as kind spells it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "control-plane" => Some(NodeRole::ControlPlane),
            "worker" => Some(NodeRole::Worker),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A host directory mounted into a node container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    /// Path on the host
    pub host_path: PathBuf,
    /// Path inside the node container
    pub container_path: String,
}

/// A node entry of the cluster document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node role
    pub role: NodeRole,
    /// Host mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<Mount>,
    /// kubeadm config patches applied to this node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,
}

impl Node {
    /// Create a node with the given role and nothing else.
    pub fn new(role: NodeRole) -> Self {
        Self {
            role,
            extra_mounts: Vec::new(),
            kubeadm_config_patches: Vec::new(),
        }
    }

    /// Add a host mount.
    pub fn with_mount(
        mut self,
        host_path: impl Into<PathBuf>,
        container_path: impl Into<String>,
    ) -> Self {
        self.extra_mounts.push(Mount {
            host_path: host_path.into(),
            container_path: container_path.into(),
        });
        self
    }

    /// Add a kubeadm config patch.
    pub fn with_kubeadm_patch(mut self, patch: impl Into<String>) -> Self {
        self.kubeadm_config_patches.push(patch.into());
        self
    }
}

/// A kind cluster document (`kind: Cluster`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Always [`CLUSTER_KIND`]
    pub kind: String,
    /// Always [`API_VERSION`]
    pub api_version: String,
    /// Cluster name
    pub name: String,
    /// Nodes, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// containerd config patches applied to every node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containerd_config_patches: Vec<String>,
}

impl ClusterConfig {
    /// Create an empty cluster document for the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: CLUSTER_KIND.to_string(),
            api_version: API_VERSION.to_string(),
            name: name.into(),
            nodes: Vec::new(),
            containerd_config_patches: Vec::new(),
        }
    }

    /// Append a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append a containerd config patch.
    pub fn with_containerd_patch(mut self, patch: impl Into<String>) -> Self {
        self.containerd_config_patches.push(patch.into());
        self
    }

    /// Render the document in a form `kind --config -` accepts.
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_role_parse() {
        assert_eq!(NodeRole::parse("control-plane"), Some(NodeRole::ControlPlane));
        assert_eq!(NodeRole::parse(" worker\n"), Some(NodeRole::Worker));
        assert_eq!(NodeRole::parse("master"), None);
    }

    #[test]
    fn test_render_uses_kind_field_names() {
        let config = ClusterConfig::new("dev")
            .with_node(
                Node::new(NodeRole::ControlPlane)
                    .with_mount("/srv/data", "/data")
                    .with_kubeadm_patch("kind: InitConfiguration"),
            )
            .with_node(Node::new(NodeRole::Worker))
            .with_containerd_patch("[plugins]");

        let rendered = config.render().unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(json["kind"], "Cluster");
        assert_eq!(json["apiVersion"], API_VERSION);
        assert_eq!(json["name"], "dev");
        assert_eq!(json["nodes"][0]["role"], "control-plane");
        assert_eq!(json["nodes"][0]["extraMounts"][0]["hostPath"], "/srv/data");
        assert_eq!(json["nodes"][0]["extraMounts"][0]["containerPath"], "/data");
        assert_eq!(
            json["nodes"][0]["kubeadmConfigPatches"][0],
            "kind: InitConfiguration"
        );
        assert_eq!(json["nodes"][1]["role"], "worker");
        assert!(json["nodes"][1].get("extraMounts").is_none());
        assert_eq!(json["containerdConfigPatches"][0], "[plugins]");
    }
}
