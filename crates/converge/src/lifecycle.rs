//! Lifecycle operations called by the orchestration host
//!
//! The host stores one opaque id per resource (cluster name, or canonical
//! manifest path) and calls these operations with it. Reads never cache.

use crate::context::{ClusterProvider, ConfirmCallback, ManifestProvider, ProgressCallback};
use crate::error::{Error, Result};
use crate::executor::{CycleReport, Executor};
use crate::model::{ClusterSpec, ManifestSpec, NodeRole, ObservedCluster, ObservedNode};
use crate::planner::{self, ExecutionPlan};
use crate::types::ExecuteOptions;

/// Result of running a lifecycle plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Id the host should store; `None` once the resource is gone
    pub id: Option<String>,
    pub report: CycleReport,
}

/// Plan produced by [`ClusterLifecycle::plan_reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconcile {
    pub plan: ExecutionPlan,
    /// The stored id no longer names a cluster; the host should forget it
    pub stale_id: bool,
}

/// Shared plan runner
fn run<P, C>(
    executor: &Executor<'_>,
    plan: &ExecutionPlan,
    progress: &mut P,
    confirm: &mut C,
) -> Result<Outcome>
where
    P: ProgressCallback + ?Sized,
    C: ConfirmCallback + ?Sized,
{
    let report = executor.execute_confirmed(plan, progress, confirm)?;
    let id = if report.is_declined() {
        None
    } else {
        plan.resulting_id()
    };
    Ok(Outcome { id, report })
}

/// Create, read, reconcile, update and delete for clusters
pub struct ClusterLifecycle<'a> {
    clusters: &'a dyn ClusterProvider,
    executor: Executor<'a>,
}

impl<'a> ClusterLifecycle<'a> {
    pub fn new(
        clusters: &'a dyn ClusterProvider,
        manifests: &'a dyn ManifestProvider,
        opts: ExecuteOptions,
    ) -> Self {
        Self {
            clusters,
            executor: Executor::new(clusters, manifests, opts),
        }
    }

    /// Observe the cluster stored under `id`
    ///
    /// `Ok(None)` means the cluster is gone and the host should forget the id.
    pub fn read(&self, id: &str) -> Result<Option<ObservedCluster>> {
        let names = self.clusters.list().map_err(|e| Error::ProbeFailure {
            message: format!("listing clusters: {e}"),
        })?;

        if !names.iter().any(|n| n == id) {
            log::debug!("Cluster {id} not found on read");
            return Ok(None);
        }

        let handles = self
            .clusters
            .list_nodes(id)
            .map_err(|e| Error::ProbeFailure {
                message: format!("listing nodes of {id}: {e}"),
            })?;

        let mut nodes = Vec::with_capacity(handles.len());
        for handle in &handles {
            let label = handle.role().map_err(|e| Error::ProbeFailure {
                message: format!("reading role of {}: {e}", handle.name()),
            })?;
            nodes.push(ObservedNode {
                name: handle.name(),
                role: NodeRole::resolve(&label),
            });
        }

        Ok(Some(ObservedCluster {
            name: id.to_string(),
            nodes,
        }))
    }

    /// Plan a first creation; probes by the desired name
    pub fn plan_create(&self, spec: &ClusterSpec) -> Result<ExecutionPlan> {
        let observed = self.read(&spec.name)?;
        Ok(planner::plan_cluster(spec, observed.as_ref()))
    }

    /// Plan convergence of the cluster stored under `id`
    ///
    /// A stored id that is gone on read is reported as stale, and the desired
    /// name is probed in its place.
    pub fn plan_reconcile(&self, id: Option<&str>, spec: &ClusterSpec) -> Result<Reconcile> {
        let (observed, stale_id) = match id {
            Some(id) => match self.read(id)? {
                Some(observed) => (Some(observed), false),
                None if id == spec.name => (None, true),
                None => (self.read(&spec.name)?, true),
            },
            None => (self.read(&spec.name)?, false),
        };
        Ok(Reconcile {
            plan: planner::plan_cluster(spec, observed.as_ref()),
            stale_id,
        })
    }

    /// Plan an explicit delete-then-create
    pub fn plan_update(&self, id: &str, spec: &ClusterSpec) -> ExecutionPlan {
        planner::plan_cluster_replacement(id, spec)
    }

    pub fn plan_delete(&self, id: &str) -> ExecutionPlan {
        planner::plan_cluster_removal(id)
    }

    /// Execute a previously computed plan
    pub fn apply<P, C>(&self, plan: &ExecutionPlan, progress: &mut P, confirm: &mut C) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        run(&self.executor, plan, progress, confirm)
    }

    /// Create the cluster unless one with the same name exists
    pub fn create<P, C>(&self, spec: &ClusterSpec, progress: &mut P, confirm: &mut C) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        let plan = self.plan_create(spec)?;
        self.apply(&plan, progress, confirm)
    }

    /// Replace the cluster stored under `id` with `spec`
    pub fn update<P, C>(
        &self,
        id: &str,
        spec: &ClusterSpec,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        self.apply(&self.plan_update(id, spec), progress, confirm)
    }

    /// Delete the cluster stored under `id`; deleting a missing cluster succeeds
    pub fn delete<P, C>(&self, id: &str, progress: &mut P, confirm: &mut C) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        self.apply(&self.plan_delete(id), progress, confirm)
    }
}

/// Create, read, update and delete for manifests
pub struct ManifestLifecycle<'a> {
    executor: Executor<'a>,
}

impl<'a> ManifestLifecycle<'a> {
    pub fn new(
        clusters: &'a dyn ClusterProvider,
        manifests: &'a dyn ManifestProvider,
        opts: ExecuteOptions,
    ) -> Self {
        Self {
            executor: Executor::new(clusters, manifests, opts),
        }
    }

    /// Manifests are not probed; the stored id is returned unchanged
    pub fn read(&self, id: &str) -> Option<String> {
        Some(id.to_string())
    }

    pub fn plan_apply(&self, spec: &ManifestSpec, previous: Option<&ManifestSpec>) -> ExecutionPlan {
        planner::plan_manifest(spec, previous)
    }

    pub fn plan_delete(&self, spec: &ManifestSpec) -> ExecutionPlan {
        planner::plan_manifest_removal(spec)
    }

    /// Execute a previously computed plan
    pub fn apply<P, C>(&self, plan: &ExecutionPlan, progress: &mut P, confirm: &mut C) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        run(&self.executor, plan, progress, confirm)
    }

    /// Create namespaces and apply the manifest; also used for updates
    pub fn create<P, C>(
        &self,
        spec: &ManifestSpec,
        previous: Option<&ManifestSpec>,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        self.apply(&self.plan_apply(spec, previous), progress, confirm)
    }

    pub fn delete<P, C>(&self, spec: &ManifestSpec, progress: &mut P, confirm: &mut C) -> Result<Outcome>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        self.apply(&self.plan_delete(spec), progress, confirm)
    }
}
