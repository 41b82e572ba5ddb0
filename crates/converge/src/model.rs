//! Desired and observed state
//!
//! Raw configuration (as deserialized from the front-end document) is
//! validated once at the boundary into [`ClusterSpec`] and [`ManifestSpec`].
//! Nothing downstream re-checks shape.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Raw configuration
// ============================================================================

/// Cluster as written in the configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCluster {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub containerd_config_patches: Vec<String>,
}

/// Node as written in the configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub role: String,
    #[serde(default)]
    pub extra_mounts: Vec<RawMount>,
    #[serde(default)]
    pub kubeadm_config_patch: Option<String>,
}

/// Host mount as written in the configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMount {
    pub host_path: String,
    pub container_path: String,
}

/// Manifest as written in the configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawManifest {
    pub path: String,
    #[serde(default)]
    pub mode: ManifestMode,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

// ============================================================================
// Validated desired state
// ============================================================================

/// Role of a cluster node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

impl NodeRole {
    /// Parse a declared role; only the two known names are accepted
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "control-plane" => Some(Self::ControlPlane),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }

    /// Resolve a role label read back from a running node.
    ///
    /// Anything that is not the control plane is a worker.
    pub fn resolve(label: &str) -> Self {
        if label.trim() == "control-plane" {
            Self::ControlPlane
        } else {
            Self::Worker
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host directory mounted into a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtraMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// A validated node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub role: NodeRole,
    /// One mount per container path, ordered by container path
    pub extra_mounts: Vec<ExtraMount>,
    pub kubeadm_config_patch: Option<String>,
}

/// A validated cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub containerd_config_patches: Vec<String>,
}

impl ClusterSpec {
    /// Identifier the orchestration host stores for this cluster
    pub fn id(&self) -> &str {
        &self.name
    }

    /// Number of control-plane nodes
    pub fn control_planes(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.role == NodeRole::ControlPlane)
            .count()
    }

    /// Mount host paths that do not exist right now
    pub fn missing_host_paths(&self) -> Vec<&Path> {
        self.nodes
            .iter()
            .flat_map(|n| n.extra_mounts.iter())
            .map(|m| m.host_path.as_path())
            .filter(|p| !p.exists())
            .collect()
    }
}

/// How a manifest source is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestMode {
    /// A single manifest file
    #[default]
    Plain,
    /// A directory of composable resource patches (kustomize)
    Overlay,
}

impl fmt::Display for ManifestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Overlay => write!(f, "overlay"),
        }
    }
}

/// A validated manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSpec {
    /// Canonical absolute path of the manifest source
    pub path: PathBuf,
    pub mode: ManifestMode,
    /// Namespaces to create before applying, in order
    pub namespaces: Vec<String>,
}

impl ManifestSpec {
    /// Identifier the orchestration host stores for this manifest
    pub fn id(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

// ============================================================================
// Observed state
// ============================================================================

/// A node as seen on the running cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedNode {
    pub name: String,
    pub role: NodeRole,
}

/// A cluster as seen on the backend. Replaced wholesale on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedCluster {
    pub name: String,
    pub nodes: Vec<ObservedNode>,
}

impl ObservedCluster {
    /// Count nodes with the given role
    pub fn count(&self, role: NodeRole) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Validate and normalize a raw cluster
pub fn build_cluster_spec(raw: &RawCluster) -> Result<ClusterSpec> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "cluster name must not be empty"));
    }

    let mut nodes = Vec::with_capacity(raw.nodes.len());
    for (i, node) in raw.nodes.iter().enumerate() {
        nodes.push(build_node_spec(i, node)?);
    }

    if !nodes.iter().any(|n| n.role == NodeRole::ControlPlane) {
        return Err(Error::validation(
            "nodes",
            format!("cluster {name} needs at least one control-plane node"),
        ));
    }

    Ok(ClusterSpec {
        name: name.to_string(),
        nodes,
        containerd_config_patches: raw.containerd_config_patches.clone(),
    })
}

fn build_node_spec(index: usize, raw: &RawNode) -> Result<NodeSpec> {
    let role = NodeRole::parse(&raw.role).ok_or_else(|| {
        Error::validation(
            format!("nodes[{index}].role"),
            format!(
                "unknown role '{}' (expected control-plane or worker)",
                raw.role
            ),
        )
    })?;

    // Keyed by container path; a repeated container path replaces the earlier mount
    let mut mounts: BTreeMap<String, PathBuf> = BTreeMap::new();
    for mount in &raw.extra_mounts {
        if mount.host_path.is_empty() {
            return Err(Error::validation(
                format!("nodes[{index}].extra_mounts.host_path"),
                "host path must not be empty",
            ));
        }
        if mount.container_path.is_empty() {
            return Err(Error::validation(
                format!("nodes[{index}].extra_mounts.container_path"),
                "container path must not be empty",
            ));
        }
        mounts.insert(
            mount.container_path.clone(),
            PathBuf::from(&mount.host_path),
        );
    }

    Ok(NodeSpec {
        role,
        extra_mounts: mounts
            .into_iter()
            .map(|(container_path, host_path)| ExtraMount {
                host_path,
                container_path,
            })
            .collect(),
        kubeadm_config_patch: raw
            .kubeadm_config_patch
            .clone()
            .filter(|p| !p.trim().is_empty()),
    })
}

/// Validate and normalize a raw manifest
///
/// The path is checked against the filesystem and canonicalized, so the
/// resulting id is stable no matter how the path was written.
pub fn build_manifest_spec(raw: &RawManifest) -> Result<ManifestSpec> {
    let path = Path::new(&raw.path);
    if raw.path.is_empty() || !path.exists() {
        return Err(Error::validation(
            "path",
            format!("manifest source does not exist at: {}", raw.path),
        ));
    }

    if raw.mode == ManifestMode::Overlay && !path.is_dir() {
        return Err(Error::validation(
            "path",
            format!("overlay mode needs a directory: {}", raw.path),
        ));
    }

    let path = std::fs::canonicalize(path).map_err(|e| {
        Error::validation("path", format!("failed to resolve {}: {e}", raw.path))
    })?;

    let mut seen = HashSet::new();
    for ns in &raw.namespaces {
        validate_namespace(ns)?;
        if !seen.insert(ns.as_str()) {
            return Err(Error::validation(
                "namespaces",
                format!("namespace '{ns}' is listed twice"),
            ));
        }
    }

    Ok(ManifestSpec {
        path,
        mode: raw.mode,
        namespaces: raw.namespaces.clone(),
    })
}

/// Check a namespace name is a DNS-1123 label
fn validate_namespace(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(Error::validation(
            "namespaces",
            format!("'{name}' is not a valid namespace name"),
        ))
    }
}
