//! State comparison - turns desired and observed state into ordered plans

use crate::model::{ClusterSpec, ManifestSpec, ObservedCluster};
use std::fmt;

/// One unit of reconciliation work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    CreateCluster(ClusterSpec),
    DeleteCluster(String),
    CreateNamespace(String),
    ApplyManifest(ManifestSpec),
    DeleteManifest(ManifestSpec),
    /// Nothing to do for the identified resource
    NoOp(String),
}

impl ReconcileAction {
    /// Whether running this action destroys something
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DeleteCluster(_) | Self::DeleteManifest(_))
    }

    /// Identifier of the resource the action touches
    pub fn target(&self) -> String {
        match self {
            Self::CreateCluster(spec) => spec.name.clone(),
            Self::DeleteCluster(name) | Self::CreateNamespace(name) | Self::NoOp(name) => {
                name.clone()
            }
            Self::ApplyManifest(spec) | Self::DeleteManifest(spec) => spec.id(),
        }
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCluster(spec) => {
                write!(f, "create cluster {} ({} nodes)", spec.name, spec.nodes.len())
            }
            Self::DeleteCluster(name) => write!(f, "delete cluster {name}"),
            Self::CreateNamespace(name) => write!(f, "create namespace {name}"),
            Self::ApplyManifest(spec) => {
                write!(f, "apply {} ({})", spec.path.display(), spec.mode)
            }
            Self::DeleteManifest(spec) => {
                write!(f, "delete {} ({})", spec.path.display(), spec.mode)
            }
            Self::NoOp(id) => write!(f, "{id} is up to date"),
        }
    }
}

/// Ordered actions for one resource in one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    actions: Vec<ReconcileAction>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action; actions run in insertion order
    pub fn push(&mut self, action: ReconcileAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReconcileAction> {
        self.actions.iter()
    }

    pub fn actions(&self) -> &[ReconcileAction] {
        &self.actions
    }

    /// Whether any action destroys something
    pub fn is_destructive(&self) -> bool {
        self.actions.iter().any(ReconcileAction::is_destructive)
    }

    /// Whether the plan has nothing but no-ops
    pub fn is_noop(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, ReconcileAction::NoOp(_)))
    }

    /// Identifier the host should store once the plan has run
    ///
    /// The last create or apply wins; a plan that only deletes leaves no id.
    pub fn resulting_id(&self) -> Option<String> {
        self.actions.iter().rev().find_map(|a| match a {
            ReconcileAction::CreateCluster(spec) => Some(spec.name.clone()),
            ReconcileAction::ApplyManifest(spec) => Some(spec.id()),
            ReconcileAction::NoOp(id) => Some(id.clone()),
            _ => None,
        })
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_actions(&self.actions)
    }
}

impl<'a> IntoIterator for &'a ExecutionPlan {
    type Item = &'a ReconcileAction;
    type IntoIter = std::slice::Iter<'a, ReconcileAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

/// Counts of planned actions by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// Clusters, namespaces and manifests to create or apply
    pub additions: usize,
    /// Clusters and manifests to remove
    pub removals: usize,
    /// Resources already in the desired state
    pub unchanged: usize,
}

impl PlanSummary {
    /// Create a summary from a list of actions
    pub fn from_actions(actions: &[ReconcileAction]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action {
                ReconcileAction::NoOp(_) => summary.unchanged += 1,
                a if a.is_destructive() => summary.removals += 1,
                _ => summary.additions += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &Self) {
        self.additions += other.additions;
        self.removals += other.removals;
        self.unchanged += other.unchanged;
    }
}

/// Plan a cluster against what the backend reports
///
/// Name is the only compared field. Node-level drift is not detected.
pub fn plan_cluster(desired: &ClusterSpec, observed: Option<&ObservedCluster>) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    match observed {
        None => plan.push(ReconcileAction::CreateCluster(desired.clone())),
        Some(obs) if obs.name == desired.name => {
            plan.push(ReconcileAction::NoOp(desired.name.clone()));
        }
        Some(obs) => {
            // Delete strictly precedes the create
            plan.push(ReconcileAction::DeleteCluster(obs.name.clone()));
            plan.push(ReconcileAction::CreateCluster(desired.clone()));
        }
    }
    plan
}

/// Plan an explicit replacement of the cluster stored under `current_id`
pub fn plan_cluster_replacement(current_id: &str, desired: &ClusterSpec) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    plan.push(ReconcileAction::DeleteCluster(current_id.to_string()));
    plan.push(ReconcileAction::CreateCluster(desired.clone()));
    plan
}

/// Plan removal of a cluster
pub fn plan_cluster_removal(id: &str) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    plan.push(ReconcileAction::DeleteCluster(id.to_string()));
    plan
}

/// Plan a manifest apply
///
/// Namespaces come first in input order, followed by exactly one apply.
/// Manifests are always re-applied; there is no content diffing.
pub fn plan_manifest(desired: &ManifestSpec, previous: Option<&ManifestSpec>) -> ExecutionPlan {
    if let Some(prev) = previous {
        log::debug!(
            "Re-applying {} (previously {} in {} mode)",
            desired.path.display(),
            prev.path.display(),
            prev.mode
        );
    }

    let mut plan = ExecutionPlan::new();
    for ns in &desired.namespaces {
        plan.push(ReconcileAction::CreateNamespace(ns.clone()));
    }
    plan.push(ReconcileAction::ApplyManifest(desired.clone()));
    plan
}

/// Plan removal of a manifest
pub fn plan_manifest_removal(desired: &ManifestSpec) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    plan.push(ReconcileAction::DeleteManifest(desired.clone()));
    plan
}
