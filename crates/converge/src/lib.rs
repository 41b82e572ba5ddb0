//! # Converge
//!
//! Declarative reconciliation for local Kubernetes clusters and manifests.
//!
//! This crate turns a validated desired state into an ordered plan of
//! backend actions and runs that plan, one action at a time.
//!
//! ## Core Concepts
//!
//! - **Desired state**: [`ClusterSpec`] and [`ManifestSpec`], validated once
//!   from raw configuration by [`build_cluster_spec`] / [`build_manifest_spec`]
//! - **Observed state**: [`ObservedCluster`], read fresh from the backend
//! - **ExecutionPlan**: ordered [`ReconcileAction`]s for one resource
//! - **Executor**: runs a plan sequentially and stops at the first failure
//! - **Lifecycle**: create/read/update/delete entry points for a host that
//!   stores resource ids between runs
//!
//! ## Example
//!
//! ```ignore
//! use converge::{
//!     build_cluster_spec, AutoConfirm, ClusterLifecycle, ExecuteOptions, NoProgress, RawCluster,
//!     RawNode,
//! };
//!
//! let raw = RawCluster {
//!     name: "dev".into(),
//!     nodes: vec![RawNode { role: "control-plane".into(), ..Default::default() }],
//!     ..Default::default()
//! };
//! let spec = build_cluster_spec(&raw)?;
//!
//! // `clusters` and `manifests` implement the provider traits
//! let lifecycle = ClusterLifecycle::new(&clusters, &manifests, ExecuteOptions::default());
//! let outcome = lifecycle.create(&spec, &mut NoProgress, &mut AutoConfirm)?;
//! assert_eq!(outcome.id.as_deref(), Some("dev"));
//! ```
//!
//! ## Provider Traits
//!
//! - [`ClusterProvider`]: creates, deletes and lists clusters
//! - [`ManifestProvider`]: applies and deletes manifests, creates namespaces
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations

pub mod context;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod model;
pub mod planner;
pub mod types;

pub use context::{
    AutoConfirm, AutoDecline, BackendError, ClusterProvider, ConfirmCallback, ManifestProvider,
    NoProgress, NodeHandle, ProgressCallback,
};
pub use error::{Error, Result};
pub use executor::{CycleReport, Executor};
pub use lifecycle::{ClusterLifecycle, ManifestLifecycle, Outcome, Reconcile};
pub use model::{
    ClusterSpec, ExtraMount, ManifestMode, ManifestSpec, NodeRole, NodeSpec, ObservedCluster,
    ObservedNode, RawCluster, RawManifest, RawMount, RawNode, build_cluster_spec,
    build_manifest_spec,
};
pub use planner::{
    ExecutionPlan, PlanSummary, ReconcileAction, plan_cluster, plan_cluster_removal,
    plan_cluster_replacement, plan_manifest, plan_manifest_removal,
};
pub use types::{ClusterState, CommandOutput, ExecuteOptions, ExecuteSummary, ExecutionResult};
