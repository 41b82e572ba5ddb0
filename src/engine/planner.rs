//! Document planning - one converge plan per resource address

use anyhow::{Context, Result};
use converge::{ClusterLifecycle, ExecutionPlan, ManifestLifecycle, ManifestSpec, PlanSummary};
use std::collections::BTreeMap;

use crate::config::{Desired, ResourceType, Target};
use crate::state::HostState;

/// How the host state changes once a step has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Store (or clear) the cluster id the plan leaves behind
    Cluster,
    /// Record the applied manifest
    Manifest(ManifestSpec),
    /// Forget the manifest address
    ManifestRemoval,
    /// Forget a cluster address whose cluster is now tracked under another address
    ClusterHandover(String),
}

/// Plan for one resource address
#[derive(Debug, Clone)]
pub struct Step {
    pub resource_type: ResourceType,
    pub address: String,
    pub kind: StepKind,
    pub plan: ExecutionPlan,
    /// The stored id was not found on read and is cleared before the plan runs
    pub stale_id: bool,
}

impl Step {
    pub fn label(&self) -> String {
        format!("{}.{}", self.resource_type, self.address)
    }
}

/// Every step of one command, in execution order
#[derive(Debug, Clone, Default)]
pub struct DocumentPlan {
    pub steps: Vec<Step>,
}

impl DocumentPlan {
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for step in &self.steps {
            summary.merge(&step.plan.summary());
        }
        summary
    }

    pub fn has_changes(&self) -> bool {
        self.summary().has_changes()
            || self
                .steps
                .iter()
                .any(|s| s.stale_id || matches!(s.kind, StepKind::ClusterHandover(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&mut self, resource_type: ResourceType, address: &str, kind: StepKind, plan: ExecutionPlan) {
        self.steps.push(Step {
            resource_type,
            address: address.to_string(),
            kind,
            plan,
            stale_id: false,
        });
    }
}

/// Plan `apply`: clusters first, then manifests
///
/// Addresses recorded in state but gone from the document are removed
/// before anything of the same type is created. An orphaned address whose
/// cluster is still declared under a new address is handed over instead.
pub fn plan_apply(
    desired: &Desired,
    state: &HostState,
    target: &Target,
    clusters: &ClusterLifecycle<'_>,
    manifests: &ManifestLifecycle<'_>,
) -> Result<DocumentPlan> {
    let mut doc = DocumentPlan::default();
    let mut handed_over: BTreeMap<&str, &str> = BTreeMap::new();

    for (addr, record) in &state.clusters {
        let declared = desired.clusters.iter().any(|(a, _)| a == addr);
        if declared || !target.includes(ResourceType::Clusters, addr) {
            continue;
        }

        let heir = desired
            .clusters
            .iter()
            .find(|(_, spec)| spec.name == record.id)
            .map(|(a, _)| a.as_str());
        match heir {
            Some(heir) if target.includes(ResourceType::Clusters, heir) => {
                log::debug!("clusters.{addr} is now clusters.{heir}");
                handed_over.insert(heir, record.id.as_str());
                doc.push(
                    ResourceType::Clusters,
                    addr,
                    StepKind::ClusterHandover(heir.to_string()),
                    ExecutionPlan::new(),
                );
            }
            Some(heir) => {
                log::debug!("Keeping clusters.{addr}: its cluster is declared by clusters.{heir}");
            }
            None => {
                doc.push(ResourceType::Clusters, addr, StepKind::Cluster, clusters.plan_delete(&record.id));
            }
        }
    }

    for (addr, spec) in &desired.clusters {
        if !target.includes(ResourceType::Clusters, addr) {
            continue;
        }
        let stored = state
            .cluster_id(addr)
            .or_else(|| handed_over.get(addr.as_str()).copied());
        let reconcile = clusters
            .plan_reconcile(stored, spec)
            .with_context(|| format!("Failed to read clusters.{addr}"))?;
        doc.push(ResourceType::Clusters, addr, StepKind::Cluster, reconcile.plan);
        if let Some(step) = doc.steps.last_mut() {
            step.stale_id = reconcile.stale_id && state.cluster_id(addr).is_some();
        }
    }

    for (addr, record) in &state.manifests {
        let declared = desired.manifests.iter().any(|(a, _)| a == addr);
        if !declared && target.includes(ResourceType::Manifests, addr) {
            let plan = manifests.plan_delete(&record.to_spec());
            doc.push(ResourceType::Manifests, addr, StepKind::ManifestRemoval, plan);
        }
    }

    for (addr, spec) in &desired.manifests {
        if !target.includes(ResourceType::Manifests, addr) {
            continue;
        }
        let previous = state.manifest(addr).map(|r| r.to_spec());
        let plan = manifests.plan_apply(spec, previous.as_ref());
        doc.push(ResourceType::Manifests, addr, StepKind::Manifest(spec.clone()), plan);
    }

    Ok(doc)
}

/// Plan `destroy`: manifests first, then clusters, from recorded ids only
pub fn plan_destroy(
    state: &HostState,
    target: &Target,
    clusters: &ClusterLifecycle<'_>,
    manifests: &ManifestLifecycle<'_>,
) -> DocumentPlan {
    let mut doc = DocumentPlan::default();

    for (addr, record) in &state.manifests {
        if target.includes(ResourceType::Manifests, addr) {
            let plan = manifests.plan_delete(&record.to_spec());
            doc.push(ResourceType::Manifests, addr, StepKind::ManifestRemoval, plan);
        }
    }

    for (addr, record) in &state.clusters {
        if target.includes(ResourceType::Clusters, addr) {
            doc.push(ResourceType::Clusters, addr, StepKind::Cluster, clusters.plan_delete(&record.id));
        }
    }

    doc
}

/// Plan `replace`: delete and recreate exactly one declared cluster
pub fn plan_replace(
    desired: &Desired,
    state: &HostState,
    target: &Target,
    clusters: &ClusterLifecycle<'_>,
) -> Result<DocumentPlan> {
    let address = match (target.resource_type, target.address.as_deref()) {
        (Some(ResourceType::Clusters), Some(address)) if target.is_single() => address,
        _ => anyhow::bail!("replace needs a single cluster target, e.g. clusters.dev"),
    };

    let (_, spec) = desired
        .clusters
        .iter()
        .find(|(a, _)| a == address)
        .with_context(|| format!("clusters.{address} is not declared"))?;

    let current = state.cluster_id(address).unwrap_or(spec.name.as_str());

    let mut doc = DocumentPlan::default();
    doc.push(
        ResourceType::Clusters,
        address,
        StepKind::Cluster,
        clusters.plan_update(current, spec),
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{FakeClusters, FakeManifests, cluster_spec, manifest_spec};
    use converge::{ExecuteOptions, ReconcileAction};

    fn desired() -> Desired {
        Desired {
            clusters: vec![("dev".into(), cluster_spec("dev"))],
            manifests: vec![("app".into(), manifest_spec("/srv/app.yaml", &["app-ns"]))],
        }
    }

    #[test]
    fn test_apply_orders_clusters_before_manifests() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let doc = plan_apply(&desired(), &HostState::default(), &Target::default(), &cl, &ml).unwrap();
        let labels: Vec<String> = doc.steps.iter().map(Step::label).collect();
        assert_eq!(labels, vec!["clusters.dev", "manifests.app"]);
        assert!(matches!(doc.steps[0].plan.actions()[0], ReconcileAction::CreateCluster(_)));
        assert_eq!(doc.summary().additions, 3);
    }

    #[test]
    fn test_apply_removes_orphans() {
        let clusters = FakeClusters::with(&["old"]);
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("legacy", Some("old".into()));
        state.record_manifest("stale", &manifest_spec("/srv/stale.yaml", &[]));

        let doc = plan_apply(&desired(), &state, &Target::default(), &cl, &ml).unwrap();
        let labels: Vec<String> = doc.steps.iter().map(Step::label).collect();
        assert_eq!(labels, vec![
            "clusters.legacy",
            "clusters.dev",
            "manifests.stale",
            "manifests.app",
        ]);
        assert_eq!(doc.steps[0].plan.actions(), &[ReconcileAction::DeleteCluster("old".into())]);
        assert_eq!(doc.steps[2].kind, StepKind::ManifestRemoval);
    }

    #[test]
    fn test_renamed_address_hands_cluster_over() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("legacy", Some("dev".into()));
        let desired = Desired {
            clusters: vec![("main".into(), cluster_spec("dev"))],
            manifests: Vec::new(),
        };

        let doc = plan_apply(&desired, &state, &Target::default(), &cl, &ml).unwrap();
        assert_eq!(doc.steps[0].kind, StepKind::ClusterHandover("main".into()));
        assert!(doc.steps[0].plan.is_empty());
        assert!(doc.steps[1].plan.is_noop());
        assert!(doc.has_changes());
        assert_eq!(doc.summary().removals, 0);
    }

    #[test]
    fn test_orphan_kept_when_heir_is_outside_target() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("legacy", Some("dev".into()));
        let desired = Desired {
            clusters: vec![("main".into(), cluster_spec("dev"))],
            manifests: Vec::new(),
        };

        let target = Target::parse(Some("clusters.legacy")).unwrap();
        let doc = plan_apply(&desired, &state, &target, &cl, &ml).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_gone_cluster_marks_stale_id() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("dev", Some("dev".into()));
        let target = Target::parse(Some("clusters")).unwrap();

        let doc = plan_apply(&desired(), &state, &target, &cl, &ml).unwrap();
        assert!(doc.steps[0].stale_id);
        assert_eq!(doc.steps[0].plan.actions(), &[ReconcileAction::CreateCluster(cluster_spec("dev"))]);

        let fresh = plan_apply(&desired(), &HostState::default(), &target, &cl, &ml).unwrap();
        assert!(!fresh.steps[0].stale_id);
    }

    #[test]
    fn test_apply_respects_target() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let target = Target::parse(Some("manifests")).unwrap();
        let doc = plan_apply(&desired(), &HostState::default(), &target, &cl, &ml).unwrap();
        assert_eq!(doc.steps.len(), 1);
        assert_eq!(doc.steps[0].resource_type, ResourceType::Manifests);
    }

    #[test]
    fn test_existing_cluster_is_noop() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("dev", Some("dev".into()));
        let target = Target::parse(Some("clusters")).unwrap();

        let doc = plan_apply(&desired(), &state, &target, &cl, &ml).unwrap();
        assert!(doc.steps[0].plan.is_noop());
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_destroy_orders_manifests_first() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let opts = ExecuteOptions::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, opts.clone());
        let ml = ManifestLifecycle::new(&clusters, &manifests, opts);

        let mut state = HostState::default();
        state.set_cluster("dev", Some("dev".into()));
        state.record_manifest("app", &manifest_spec("/srv/app.yaml", &[]));

        let doc = plan_destroy(&state, &Target::default(), &cl, &ml);
        let labels: Vec<String> = doc.steps.iter().map(Step::label).collect();
        assert_eq!(labels, vec!["manifests.app", "clusters.dev"]);
        assert_eq!(doc.summary().removals, 2);
    }

    #[test]
    fn test_replace_requires_single_cluster() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let cl = ClusterLifecycle::new(&clusters, &manifests, ExecuteOptions::default());
        let state = HostState::default();

        assert!(plan_replace(&desired(), &state, &Target::default(), &cl).is_err());
        let missing = Target::parse(Some("clusters.prod")).unwrap();
        assert!(plan_replace(&desired(), &state, &missing, &cl).is_err());

        let target = Target::parse(Some("clusters.dev")).unwrap();
        let doc = plan_replace(&desired(), &state, &target, &cl).unwrap();
        assert_eq!(doc.steps[0].plan.actions(), &[
            ReconcileAction::DeleteCluster("dev".into()),
            ReconcileAction::CreateCluster(cluster_spec("dev")),
        ]);
    }
}
