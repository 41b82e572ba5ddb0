//! Execution engine - runs plans against the backends, in order, fail-fast

use crate::context::{ClusterProvider, ConfirmCallback, ManifestProvider, ProgressCallback};
use crate::error::{Error, Result};
use crate::model::{ClusterSpec, ManifestSpec};
use crate::planner::{ExecutionPlan, ReconcileAction};
use crate::types::{ClusterState, ExecuteOptions, ExecuteSummary, ExecutionResult};

/// What one plan run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Each executed action with its result, in order
    pub outcomes: Vec<(ReconcileAction, ExecutionResult)>,
    pub summary: ExecuteSummary,
    /// Last known state of the cluster the plan touched, if any
    pub cluster_state: Option<ClusterState>,
}

impl CycleReport {
    /// Whether the plan was declined before anything ran
    pub fn is_declined(&self) -> bool {
        self.outcomes.is_empty() && self.summary.skipped > 0
    }
}

/// Runs reconcile actions against a cluster and a manifest backend
pub struct Executor<'a> {
    clusters: &'a dyn ClusterProvider,
    manifests: &'a dyn ManifestProvider,
    opts: ExecuteOptions,
}

impl<'a> Executor<'a> {
    pub fn new(
        clusters: &'a dyn ClusterProvider,
        manifests: &'a dyn ManifestProvider,
        opts: ExecuteOptions,
    ) -> Self {
        Self {
            clusters,
            manifests,
            opts,
        }
    }

    /// Execute a single action
    pub fn execute(&self, action: &ReconcileAction) -> Result<ExecutionResult> {
        if self.opts.dry_run {
            return Ok(ExecutionResult::Skipped {
                reason: "dry run".to_string(),
            });
        }

        match action {
            ReconcileAction::CreateCluster(spec) => self.create_cluster(spec),
            ReconcileAction::DeleteCluster(name) => self.delete_cluster(name),
            ReconcileAction::CreateNamespace(name) => self.create_namespace(name),
            ReconcileAction::ApplyManifest(spec) => self.apply_manifest(spec),
            ReconcileAction::DeleteManifest(spec) => self.delete_manifest(spec),
            ReconcileAction::NoOp(_) => Ok(ExecutionResult::NoChange),
        }
    }

    /// Execute every action of a plan in order
    ///
    /// The first failure stops the plan; nothing that already ran is undone.
    pub fn execute_plan<P: ProgressCallback + ?Sized>(
        &self,
        plan: &ExecutionPlan,
        progress: &mut P,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let mut deleted: Option<String> = None;
        let mut state: Option<ClusterState> = None;

        // Mount paths are checked before anything is deleted
        for action in plan {
            if let ReconcileAction::CreateCluster(spec) = action {
                check_host_paths(spec)?;
            }
        }

        progress.on_plan_start(plan.len());

        for action in plan {
            progress.on_action_start(action);

            state = match action {
                ReconcileAction::CreateCluster(_) => {
                    Some(state.unwrap_or(ClusterState::Absent).begin_create())
                }
                ReconcileAction::DeleteCluster(_) => {
                    Some(state.unwrap_or(ClusterState::Present).begin_delete())
                }
                _ => state,
            };

            match self.execute(action) {
                Ok(result) => {
                    if !self.opts.dry_run {
                        state = state.map(|s| s.finish(true));
                        if let ReconcileAction::DeleteCluster(name) = action {
                            deleted = Some(name.clone());
                        }
                    }
                    if self.opts.verbose {
                        log::info!("{action}: {result:?}");
                    }
                    progress.on_action_complete(action, &result);
                    report.summary.add_result(&result);
                    report.outcomes.push((action.clone(), result));
                }
                Err(err) => {
                    let err = match (action, &deleted) {
                        (ReconcileAction::CreateCluster(spec), Some(gone)) => Error::RecreateFailed {
                            deleted: gone.clone(),
                            cluster: spec.name.clone(),
                            message: match err {
                                Error::ProvisionFailure { message, .. } => message,
                                other => other.to_string(),
                            },
                        },
                        _ => err,
                    };
                    log::error!("{action} failed: {err}");
                    progress.on_action_failed(action, &err);
                    return Err(err);
                }
            }
        }

        progress.on_plan_complete();

        report.cluster_state = if self.opts.dry_run { None } else { state };
        Ok(report)
    }

    /// Execute a plan, asking for confirmation first when it destroys something
    pub fn execute_confirmed<P, C>(
        &self,
        plan: &ExecutionPlan,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<CycleReport>
    where
        P: ProgressCallback + ?Sized,
        C: ConfirmCallback + ?Sized,
    {
        if !self.opts.dry_run && plan.is_destructive() {
            let doomed: Vec<String> = plan
                .iter()
                .filter(|a| a.is_destructive())
                .map(ToString::to_string)
                .collect();
            let prompt = format!("This will {}. Continue?", doomed.join(", "));
            if !confirm.confirm(&prompt) {
                log::info!("Plan declined");
                return Ok(CycleReport {
                    summary: ExecuteSummary {
                        skipped: plan.len(),
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
        }

        self.execute_plan(plan, progress)
    }

    fn create_cluster(&self, spec: &ClusterSpec) -> Result<ExecutionResult> {
        check_host_paths(spec)?;

        self.clusters
            .create(spec)
            .map_err(|e| Error::ProvisionFailure {
                cluster: spec.name.clone(),
                message: e.to_string(),
            })?;
        Ok(ExecutionResult::Created)
    }

    fn delete_cluster(&self, name: &str) -> Result<ExecutionResult> {
        match self.clusters.delete(name) {
            Ok(()) => Ok(ExecutionResult::Removed),
            Err(e) if e.is_not_found() => {
                log::debug!("Cluster {name} already gone");
                Ok(ExecutionResult::Removed)
            }
            Err(e) => Err(Error::ProvisionFailure {
                cluster: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn create_namespace(&self, name: &str) -> Result<ExecutionResult> {
        let out = self
            .manifests
            .create_namespace(name)
            .map_err(|e| Error::ApplyFailure {
                command: format!("create ns {name}"),
                output: e.to_string(),
            })?;

        if out.success {
            Ok(ExecutionResult::Created)
        } else if out.already_exists {
            log::warn!("Namespace {name} already exists");
            Ok(ExecutionResult::NoChange)
        } else {
            Err(Error::ApplyFailure {
                command: out.command,
                output: out.output,
            })
        }
    }

    fn apply_manifest(&self, spec: &ManifestSpec) -> Result<ExecutionResult> {
        let out = self
            .manifests
            .apply(&spec.path, spec.mode)
            .map_err(|e| Error::ApplyFailure {
                command: format!("apply {}", spec.path.display()),
                output: e.to_string(),
            })?;

        if out.success {
            Ok(ExecutionResult::Applied { output: out.output })
        } else {
            Err(Error::ApplyFailure {
                command: out.command,
                output: out.output,
            })
        }
    }

    fn delete_manifest(&self, spec: &ManifestSpec) -> Result<ExecutionResult> {
        if !spec.path.exists() {
            log::warn!(
                "{} no longer exists, treating it as deleted",
                spec.path.display()
            );
            return Ok(ExecutionResult::Skipped {
                reason: "manifest source is gone".to_string(),
            });
        }

        let out = self
            .manifests
            .delete(&spec.path, spec.mode)
            .map_err(|e| Error::ApplyFailure {
                command: format!("delete {}", spec.path.display()),
                output: e.to_string(),
            })?;

        if out.success {
            Ok(ExecutionResult::Removed)
        } else {
            Err(Error::ApplyFailure {
                command: out.command,
                output: out.output,
            })
        }
    }
}

/// Mount host paths must exist before kind is asked to create the cluster
fn check_host_paths(spec: &ClusterSpec) -> Result<()> {
    match spec.missing_host_paths().first() {
        Some(missing) => Err(Error::validation(
            "extra_mounts.host_path",
            format!("host path does not exist: {}", missing.display()),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, BackendError, NoProgress, NodeHandle};
    use crate::model::{ExtraMount, ManifestMode, NodeRole, NodeSpec};
    use crate::types::CommandOutput;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Node whose role label cannot be read when `role` is `None`
    #[derive(Debug)]
    pub struct FakeNode {
        pub name: String,
        pub role: Option<String>,
    }

    impl NodeHandle for FakeNode {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn role(&self) -> std::result::Result<String, BackendError> {
            self.role
                .clone()
                .ok_or_else(|| BackendError::Failed(format!("Error: No such object: {}", self.name)))
        }
    }

    /// In-memory cluster backend
    #[derive(Default)]
    pub struct FakeClusters {
        pub existing: RefCell<Vec<String>>,
        pub calls: RefCell<Vec<String>>,
        pub fail_create: bool,
        pub fail_list: bool,
        pub fail_role: bool,
    }

    impl FakeClusters {
        pub fn with(names: &[&str]) -> Self {
            Self {
                existing: RefCell::new(names.iter().map(ToString::to_string).collect()),
                ..Default::default()
            }
        }
    }

    impl ClusterProvider for FakeClusters {
        fn create(&self, spec: &ClusterSpec) -> std::result::Result<(), BackendError> {
            self.calls.borrow_mut().push(format!("create {}", spec.name));
            if self.fail_create {
                return Err(BackendError::Failed("node(s) failed to start".into()));
            }
            self.existing.borrow_mut().push(spec.name.clone());
            Ok(())
        }

        fn delete(&self, name: &str) -> std::result::Result<(), BackendError> {
            self.calls.borrow_mut().push(format!("delete {name}"));
            let mut existing = self.existing.borrow_mut();
            if !existing.iter().any(|n| n == name) {
                return Err(BackendError::NotFound(name.to_string()));
            }
            existing.retain(|n| n != name);
            Ok(())
        }

        fn list(&self) -> std::result::Result<Vec<String>, BackendError> {
            if self.fail_list {
                return Err(BackendError::Failed("Cannot connect to the Docker daemon".into()));
            }
            Ok(self.existing.borrow().clone())
        }

        fn list_nodes(
            &self,
            name: &str,
        ) -> std::result::Result<Vec<Box<dyn NodeHandle>>, BackendError> {
            Ok(vec![
                Box::new(FakeNode {
                    name: format!("{name}-control-plane"),
                    role: Some("control-plane".into()),
                }),
                Box::new(FakeNode {
                    name: format!("{name}-worker"),
                    role: (!self.fail_role).then(|| "worker".into()),
                }),
            ])
        }
    }

    /// Manifest backend that records commands and fails namespaces on demand
    #[derive(Default)]
    pub struct FakeManifests {
        pub calls: RefCell<Vec<String>>,
        pub existing_namespaces: Vec<String>,
        pub fail_namespace: bool,
        pub fail_apply: bool,
    }

    impl ManifestProvider for FakeManifests {
        fn apply(
            &self,
            path: &Path,
            mode: ManifestMode,
        ) -> std::result::Result<CommandOutput, BackendError> {
            let command = format!("apply {mode} {}", path.display());
            self.calls.borrow_mut().push(command.clone());
            if self.fail_apply {
                return Ok(CommandOutput::failed(command, "error: no objects passed to apply"));
            }
            Ok(CommandOutput::ok(command, "configmap/app created"))
        }

        fn delete(
            &self,
            path: &Path,
            mode: ManifestMode,
        ) -> std::result::Result<CommandOutput, BackendError> {
            let command = format!("delete {mode} {}", path.display());
            self.calls.borrow_mut().push(command.clone());
            Ok(CommandOutput::ok(command, "configmap \"app\" deleted"))
        }

        fn create_namespace(
            &self,
            name: &str,
        ) -> std::result::Result<CommandOutput, BackendError> {
            let command = format!("create ns {name}");
            self.calls.borrow_mut().push(command.clone());
            if self.existing_namespaces.iter().any(|n| n == name) {
                let mut out = CommandOutput::failed(
                    command,
                    format!("Error from server (AlreadyExists): namespaces \"{name}\" already exists"),
                );
                out.already_exists = true;
                return Ok(out);
            }
            if self.fail_namespace {
                return Ok(CommandOutput::failed(command, "error: exit status 1"));
            }
            Ok(CommandOutput::ok(command, format!("namespace/{name} created")))
        }
    }

    pub fn cluster(name: &str) -> ClusterSpec {
        ClusterSpec {
            name: name.to_string(),
            nodes: vec![NodeSpec {
                role: NodeRole::ControlPlane,
                extra_mounts: Vec::new(),
                kubeadm_config_patch: None,
            }],
            containerd_config_patches: Vec::new(),
        }
    }

    pub fn manifest(path: PathBuf, namespaces: &[&str]) -> ManifestSpec {
        ManifestSpec {
            path,
            mode: ManifestMode::Plain,
            namespaces: namespaces.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_delete_missing_cluster_succeeds() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let result = exec
            .execute(&ReconcileAction::DeleteCluster("ghost".into()))
            .unwrap();
        assert_eq!(result, ExecutionResult::Removed);
        assert_eq!(*clusters.calls.borrow(), vec!["delete ghost"]);
    }

    #[test]
    fn test_create_failure_is_provision_failure() {
        let clusters = FakeClusters {
            fail_create: true,
            ..Default::default()
        };
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let err = exec
            .execute(&ReconcileAction::CreateCluster(cluster("dev")))
            .unwrap_err();
        match err {
            Error::ProvisionFailure { cluster, message } => {
                assert_eq!(cluster, "dev");
                assert_eq!(message, "node(s) failed to start");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_mount_host_path_is_validation_error() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let mut spec = cluster("dev");
        spec.nodes[0].extra_mounts.push(ExtraMount {
            host_path: PathBuf::from("/nonexistent/kindform/data"),
            container_path: "/data".into(),
        });

        let err = exec
            .execute(&ReconcileAction::CreateCluster(spec))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(clusters.calls.borrow().is_empty());
    }

    #[test]
    fn test_new_cluster_scenario() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let plan = crate::planner::plan_cluster(&cluster("dev"), None);
        let report = exec.execute_plan(&plan, &mut NoProgress).unwrap();

        assert_eq!(plan.resulting_id().as_deref(), Some("dev"));
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.cluster_state, Some(ClusterState::Present));
        assert_eq!(*clusters.existing.borrow(), vec!["dev"]);
    }

    #[test]
    fn test_namespace_failure_stops_apply() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests {
            fail_namespace: true,
            ..Default::default()
        };
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let spec = manifest(PathBuf::from("/tmp/app.yaml"), &["app-ns"]);
        let plan = crate::planner::plan_manifest(&spec, None);
        let err = exec.execute_plan(&plan, &mut NoProgress).unwrap_err();

        match err {
            Error::ApplyFailure { command, output } => {
                assert_eq!(command, "create ns app-ns");
                assert_eq!(output, "error: exit status 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*manifests.calls.borrow(), vec!["create ns app-ns"]);
    }

    #[test]
    fn test_existing_namespace_is_soft_failure() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests {
            existing_namespaces: vec!["app-ns".into()],
            ..Default::default()
        };
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let spec = manifest(PathBuf::from("/tmp/app.yaml"), &["app-ns"]);
        let report = exec
            .execute_plan(&crate::planner::plan_manifest(&spec, None), &mut NoProgress)
            .unwrap();

        assert_eq!(report.summary.no_change, 1);
        assert_eq!(report.summary.applied, 1);
        assert_eq!(*manifests.calls.borrow(), vec![
            "create ns app-ns",
            "apply plain /tmp/app.yaml",
        ]);
    }

    #[test]
    fn test_apply_failure_carries_output() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests {
            fail_apply: true,
            ..Default::default()
        };
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let spec = manifest(PathBuf::from("/tmp/app.yaml"), &[]);
        let err = exec
            .execute(&ReconcileAction::ApplyManifest(spec))
            .unwrap_err();
        assert!(err.to_string().contains("no objects passed to apply"));
    }

    #[test]
    fn test_delete_manifest_missing_source_succeeds() {
        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let spec = manifest(PathBuf::from("/nonexistent/kindform/app.yaml"), &[]);
        let result = exec
            .execute(&ReconcileAction::DeleteManifest(spec))
            .unwrap();
        assert!(matches!(result, ExecutionResult::Skipped { .. }));
        assert!(manifests.calls.borrow().is_empty());
    }

    #[test]
    fn test_delete_manifest_existing_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.yaml");
        std::fs::write(&file, "kind: ConfigMap").unwrap();

        let clusters = FakeClusters::default();
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let result = exec
            .execute(&ReconcileAction::DeleteManifest(manifest(file.clone(), &[])))
            .unwrap();
        assert_eq!(result, ExecutionResult::Removed);
        assert_eq!(*manifests.calls.borrow(), vec![format!(
            "delete plain {}",
            file.display()
        )]);
    }

    #[test]
    fn test_recreate_failure_leaves_absent() {
        let clusters = FakeClusters {
            existing: RefCell::new(vec!["dev".into()]),
            fail_create: true,
            ..Default::default()
        };
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let plan = crate::planner::plan_cluster_replacement("dev", &cluster("dev"));
        let err = exec.execute_plan(&plan, &mut NoProgress).unwrap_err();

        assert!(matches!(err, Error::RecreateFailed { .. }));
        assert_eq!(err.cluster_state(), ClusterState::Absent);
        assert!(err.requires_recreate());
        assert!(clusters.existing.borrow().is_empty());
    }

    #[test]
    fn test_replacement_with_missing_mount_keeps_cluster() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let mut spec = cluster("dev");
        spec.nodes[0].extra_mounts.push(ExtraMount {
            host_path: PathBuf::from("/nonexistent/kindform/data"),
            container_path: "/data".into(),
        });
        let plan = crate::planner::plan_cluster_replacement("dev", &spec);
        let err = exec.execute_plan(&plan, &mut NoProgress).unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert!(!err.requires_recreate());
        assert!(clusters.calls.borrow().is_empty());
        assert_eq!(*clusters.existing.borrow(), vec!["dev".to_string()]);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let clusters = FakeClusters::with(&["old"]);
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions {
            dry_run: true,
            verbose: false,
        });

        let plan = crate::planner::plan_cluster_replacement("old", &cluster("dev"));
        let report = exec
            .execute_confirmed(&plan, &mut NoProgress, &mut AutoDecline)
            .unwrap();

        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.cluster_state, None);
        assert!(clusters.calls.borrow().is_empty());
    }

    #[test]
    fn test_destructive_plan_needs_confirmation() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());
        let plan = crate::planner::plan_cluster_removal("dev");

        let report = exec
            .execute_confirmed(&plan, &mut NoProgress, &mut AutoDecline)
            .unwrap();
        assert!(report.is_declined());
        assert_eq!(*clusters.existing.borrow(), vec!["dev"]);

        let report = exec
            .execute_confirmed(&plan, &mut NoProgress, &mut AutoConfirm)
            .unwrap();
        assert_eq!(report.summary.removed, 1);
        assert_eq!(report.cluster_state, Some(ClusterState::Absent));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_plan_start(&mut self, count: usize) {
            self.events.push(format!("start {count}"));
        }
        fn on_action_start(&mut self, action: &ReconcileAction) {
            self.events.push(format!("begin {action}"));
        }
        fn on_action_complete(&mut self, action: &ReconcileAction, _result: &ExecutionResult) {
            self.events.push(format!("done {action}"));
        }
        fn on_action_failed(&mut self, action: &ReconcileAction, _error: &Error) {
            self.events.push(format!("failed {action}"));
        }
        fn on_plan_complete(&mut self) {
            self.events.push("complete".into());
        }
    }

    #[test]
    fn test_progress_events_in_order() {
        let clusters = FakeClusters::with(&["dev"]);
        let manifests = FakeManifests::default();
        let exec = Executor::new(&clusters, &manifests, ExecuteOptions::default());

        let mut recorder = Recorder::default();
        exec.execute_plan(
            &crate::planner::plan_cluster(&cluster("dev"), None),
            &mut recorder,
        )
        .unwrap();

        assert_eq!(recorder.events, vec![
            "start 1",
            "begin create cluster dev (1 nodes)",
            "done create cluster dev (1 nodes)",
            "complete",
        ]);
    }
}
