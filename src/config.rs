//! The desired-state document (`kindform.toml`)

use anyhow::{Context, Result};
use converge::{ClusterSpec, ManifestSpec, RawCluster, RawManifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths;

/// Default document file name
pub const DEFAULT_FILE: &str = "kindform.toml";

// ============================================================================
// Document
// ============================================================================

/// Executables and cluster access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
    /// Container runtime used to inspect kind nodes
    #[serde(default = "default_runtime")]
    pub node_runtime: String,
    #[serde(default)]
    pub kubeconfig: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

fn default_kind() -> String {
    "kind".to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_runtime() -> String {
    kindkit::backend::kind::DEFAULT_RUNTIME.to_string()
}

impl BackendConfig {
    pub fn kubeconfig(&self) -> Option<PathBuf> {
        self.kubeconfig.as_ref().map(PathBuf::from)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            kubectl: default_kubectl(),
            node_runtime: default_runtime(),
            kubeconfig: None,
            context: None,
        }
    }
}

/// The whole document; table keys are resource addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub clusters: BTreeMap<String, RawCluster>,
    #[serde(default)]
    pub manifests: BTreeMap<String, RawManifest>,
}

impl Document {
    /// Read and parse a document, resolving paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut doc: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid document: {}", path.display()))?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        doc.resolve_paths(&base);

        log::debug!(
            "Loaded {} ({} clusters, {} manifests)",
            path.display(),
            doc.clusters.len(),
            doc.manifests.len()
        );
        Ok(doc)
    }

    /// Expand `~` and anchor relative paths at `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let to_string = |p: PathBuf| p.to_string_lossy().to_string();

        if let Some(kubeconfig) = &self.backend.kubeconfig {
            self.backend.kubeconfig = Some(to_string(paths::resolve(kubeconfig, base)));
        }

        for cluster in self.clusters.values_mut() {
            for node in &mut cluster.nodes {
                for mount in &mut node.extra_mounts {
                    if !mount.host_path.is_empty() {
                        mount.host_path = to_string(paths::resolve(&mount.host_path, base));
                    }
                }
            }
        }

        for manifest in self.manifests.values_mut() {
            if !manifest.path.is_empty() {
                manifest.path = to_string(paths::resolve(&manifest.path, base));
            }
        }
    }

    /// Validate every resource, reporting all problems at once
    pub fn desired(&self) -> Result<Desired> {
        let mut desired = Desired::default();
        let mut problems = Vec::new();

        for (addr, raw) in &self.clusters {
            match converge::build_cluster_spec(raw) {
                Ok(spec) => desired.clusters.push((addr.clone(), spec)),
                Err(e) => problems.push(format!("clusters.{addr}: {e}")),
            }
        }

        for (addr, raw) in &self.manifests {
            match converge::build_manifest_spec(raw) {
                Ok(spec) => desired.manifests.push((addr.clone(), spec)),
                Err(e) => problems.push(format!("manifests.{addr}: {e}")),
            }
        }

        let mut names: BTreeMap<&str, &str> = BTreeMap::new();
        for (addr, spec) in &desired.clusters {
            if let Some(other) = names.insert(spec.name.as_str(), addr.as_str()) {
                problems.push(format!(
                    "clusters.{addr}: cluster name '{}' is also used by clusters.{other}",
                    spec.name
                ));
            }
        }

        if problems.is_empty() {
            Ok(desired)
        } else {
            anyhow::bail!("{}", problems.join("\n"))
        }
    }
}

/// Validated resources, ordered by address
#[derive(Debug, Clone, Default)]
pub struct Desired {
    pub clusters: Vec<(String, ClusterSpec)>,
    pub manifests: Vec<(String, ManifestSpec)>,
}

// ============================================================================
// Targets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Clusters,
    Manifests,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clusters => write!(f, "clusters"),
            Self::Manifests => write!(f, "manifests"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("unknown resource type '{0}' (expected clusters or manifests)")]
    UnknownType(String),

    #[error("invalid target '{0}' (expected <type> or <type>.<address>)")]
    Malformed(String),
}

/// A `clusters`, `manifests`, `clusters.<addr>` or `manifests.<addr>` filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub resource_type: Option<ResourceType>,
    pub address: Option<String>,
}

impl Target {
    pub fn parse(target: Option<&str>) -> Result<Self, TargetError> {
        let Some(target) = target else {
            return Ok(Self::default());
        };

        let (kind, address) = match target.split_once('.') {
            Some((kind, addr)) if !addr.is_empty() && !addr.contains('.') => {
                (kind, Some(addr.to_string()))
            }
            Some(_) => return Err(TargetError::Malformed(target.to_string())),
            None => (target, None),
        };

        let resource_type = match kind {
            "clusters" | "cluster" => ResourceType::Clusters,
            "manifests" | "manifest" => ResourceType::Manifests,
            other => return Err(TargetError::UnknownType(other.to_string())),
        };

        Ok(Self {
            resource_type: Some(resource_type),
            address,
        })
    }

    pub fn includes(&self, resource_type: ResourceType, address: &str) -> bool {
        self.resource_type.is_none_or(|t| t == resource_type)
            && self.address.as_deref().is_none_or(|a| a == address)
    }

    /// Whether the target names exactly one resource
    pub fn is_single(&self) -> bool {
        self.address.is_some()
    }
}
