//! Persisted host state: the id stored for each resource address

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use converge::{ManifestMode, ManifestSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Everything kindform remembers between runs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HostState {
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterRecord>,

    #[serde(default)]
    pub manifests: BTreeMap<String, ManifestRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// Stored id of a cluster (its name)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClusterRecord {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

/// Stored id of a manifest (its canonical path), plus what is needed to
/// delete it after it has left the document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub id: String,
    #[serde(default)]
    pub mode: ManifestMode,
    #[serde(default)]
    pub namespaces: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ManifestRecord {
    /// Spec as it was last applied
    pub fn to_spec(&self) -> ManifestSpec {
        ManifestSpec {
            path: PathBuf::from(&self.id),
            mode: self.mode,
            namespaces: self.namespaces.clone(),
        }
    }
}

// ============================================================================
// HostState Implementation
// ============================================================================

impl HostState {
    /// Load state from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    // ========================================================================
    // Cluster Helpers
    // ========================================================================

    pub fn cluster_id(&self, address: &str) -> Option<&str> {
        self.clusters.get(address).map(|r| r.id.as_str())
    }

    /// Store the id for an address, or forget the address when `id` is `None`
    pub fn set_cluster(&mut self, address: &str, id: Option<String>) {
        match id {
            Some(id) => {
                self.clusters.insert(address.to_string(), ClusterRecord {
                    id,
                    updated_at: Utc::now(),
                });
            }
            None => {
                self.clusters.remove(address);
            }
        }
    }

    // ========================================================================
    // Manifest Helpers
    // ========================================================================

    pub fn manifest(&self, address: &str) -> Option<&ManifestRecord> {
        self.manifests.get(address)
    }

    /// Record what was applied for an address
    pub fn record_manifest(&mut self, address: &str, spec: &ManifestSpec) {
        self.manifests.insert(address.to_string(), ManifestRecord {
            id: spec.id(),
            mode: spec.mode,
            namespaces: spec.namespaces.clone(),
            updated_at: Utc::now(),
        });
    }

    pub fn forget_manifest(&mut self, address: &str) {
        self.manifests.remove(address);
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            clusters: BTreeMap::new(),
            manifests: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}
