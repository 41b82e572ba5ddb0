//! Declarative commands
//!
//! - `validate` - Check the document
//! - `plan` - Preview what apply would change
//! - `apply` - Make clusters and manifests match the document
//! - `status` - Show stored ids against what the backends report
//! - `replace` - Delete and recreate one cluster
//! - `destroy` - Remove everything recorded in state

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use converge::{ClusterLifecycle, ManifestLifecycle, ObservedNode};
use serde::Serialize;

use crate::Context;
use crate::backends::Backends;
use crate::config::{Document, ResourceType, Target};
use crate::engine::{self, DocumentPlan, ExecuteOptions, differ, planner};
use crate::state::HostState;
use crate::ui;

// ============================================================================
// Loading
// ============================================================================

fn load_document(ctx: &Context, required: bool) -> Result<Document> {
    if !required && !ctx.file.exists() {
        log::debug!("{} not found, using defaults", ctx.file.display());
        return Ok(Document::default());
    }
    Document::load(&ctx.file)
}

fn load_state(ctx: &Context) -> Result<HostState> {
    HostState::load(&ctx.state_path)
}

fn parse_target(target: Option<&str>) -> Result<Target> {
    Target::parse(target).context("Invalid target")
}

fn converge_options(dry_run: bool, ctx: &Context) -> converge::ExecuteOptions {
    converge::ExecuteOptions {
        dry_run,
        verbose: ctx.verbose > 0,
    }
}

// ============================================================================
// Validate Command
// ============================================================================

pub fn validate(ctx: &Context) -> Result<()> {
    let doc = load_document(ctx, true)?;
    let desired = doc.desired()?;

    ui::success(&format!(
        "{} is valid ({} clusters, {} manifests)",
        ctx.file.display(),
        desired.clusters.len(),
        desired.manifests.len()
    ));

    if !ctx.quiet {
        for (addr, spec) in &desired.clusters {
            ui::dim(&format!(
                "clusters.{addr}: {} ({} control-plane, {} nodes)",
                spec.name,
                spec.control_planes(),
                spec.nodes.len()
            ));
        }
        for (addr, spec) in &desired.manifests {
            ui::dim(&format!(
                "manifests.{addr}: {} ({})",
                ui::truncate_path(&spec.id(), 60),
                spec.mode
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Plan Command
// ============================================================================

pub fn plan(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("Plan");

    let target = parse_target(target)?;
    let doc = load_document(ctx, true)?;
    let desired = doc.desired()?;
    let state = load_state(ctx)?;

    let backends = Backends::from_config(&doc.backend);
    backends.check(&doc.backend);
    let opts = converge_options(true, ctx);
    let clusters = ClusterLifecycle::new(&backends.clusters, &backends.manifests, opts.clone());
    let manifests = ManifestLifecycle::new(&backends.clusters, &backends.manifests, opts);

    let doc_plan = planner::plan_apply(&desired, &state, &target, &clusters, &manifests)?;
    differ::display_plan(&doc_plan);
    Ok(())
}

// ============================================================================
// Apply Command
// ============================================================================

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    ui::header("Applying Configuration");

    if dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let target = parse_target(target)?;
    let doc = load_document(ctx, true)?;
    let desired = doc.desired()?;
    let mut state = load_state(ctx)?;

    let backends = Backends::from_config(&doc.backend);
    backends.check(&doc.backend);
    let opts = converge_options(dry_run, ctx);
    let clusters = ClusterLifecycle::new(&backends.clusters, &backends.manifests, opts.clone());
    let manifests = ManifestLifecycle::new(&backends.clusters, &backends.manifests, opts);

    let doc_plan = planner::plan_apply(&desired, &state, &target, &clusters, &manifests)?;
    run(ctx, &doc_plan, &clusters, &manifests, &mut state, dry_run, yes)
}

// ============================================================================
// Replace Command
// ============================================================================

pub fn replace(ctx: &Context, target: &str, yes: bool) -> Result<()> {
    ui::header("Replacing Cluster");

    let target = parse_target(Some(target))?;
    let doc = load_document(ctx, true)?;
    let desired = doc.desired()?;
    let mut state = load_state(ctx)?;

    let backends = Backends::from_config(&doc.backend);
    backends.check(&doc.backend);
    let opts = converge_options(false, ctx);
    let clusters = ClusterLifecycle::new(&backends.clusters, &backends.manifests, opts.clone());
    let manifests = ManifestLifecycle::new(&backends.clusters, &backends.manifests, opts);

    let doc_plan = planner::plan_replace(&desired, &state, &target, &clusters)?;
    run(ctx, &doc_plan, &clusters, &manifests, &mut state, false, yes)
}

// ============================================================================
// Destroy Command
// ============================================================================

pub fn destroy(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    ui::header("Destroying");

    let target = parse_target(target)?;
    let doc = load_document(ctx, false)?;
    let mut state = load_state(ctx)?;

    let backends = Backends::from_config(&doc.backend);
    backends.check(&doc.backend);
    let opts = converge_options(dry_run, ctx);
    let clusters = ClusterLifecycle::new(&backends.clusters, &backends.manifests, opts.clone());
    let manifests = ManifestLifecycle::new(&backends.clusters, &backends.manifests, opts);

    let doc_plan = planner::plan_destroy(&state, &target, &clusters, &manifests);
    if doc_plan.is_empty() {
        ui::info("Nothing recorded in state");
        return Ok(());
    }
    run(ctx, &doc_plan, &clusters, &manifests, &mut state, dry_run, yes)
}

fn run(
    ctx: &Context,
    doc_plan: &DocumentPlan,
    clusters: &ClusterLifecycle<'_>,
    manifests: &ManifestLifecycle<'_>,
    state: &mut HostState,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    differ::display_plan(doc_plan);

    let opts = ExecuteOptions {
        dry_run,
        yes,
        quiet: ctx.quiet,
    };
    let summary = engine::execute(doc_plan, clusters, manifests, state, &ctx.state_path, &opts)?;
    engine::print_summary(&summary, dry_run);
    Ok(())
}

// ============================================================================
// Status Command
// ============================================================================

#[derive(Debug, Serialize)]
struct StatusEntry {
    address: String,
    /// Stored id, if any
    id: Option<String>,
    /// `None` when the resource is not probed
    present: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<ObservedNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// Report stored ids against the backends without writing state
///
/// A recorded cluster that is gone is shown as missing; the next `apply`
/// forgets its id before recreating it.
pub fn status(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let target = parse_target(target)?;
    let doc = load_document(ctx, false)?;
    let state = load_state(ctx)?;

    let backends = Backends::from_config(&doc.backend);
    let opts = converge_options(true, ctx);
    let clusters = ClusterLifecycle::new(&backends.clusters, &backends.manifests, opts.clone());
    let manifests = ManifestLifecycle::new(&backends.clusters, &backends.manifests, opts);

    let mut entries = Vec::new();

    let mut cluster_addrs: Vec<&String> = doc.clusters.keys().chain(state.clusters.keys()).collect();
    cluster_addrs.sort();
    cluster_addrs.dedup();
    for addr in cluster_addrs {
        if !target.includes(ResourceType::Clusters, addr) {
            continue;
        }
        let record = state.clusters.get(addr);
        let name = record
            .map(|r| r.id.clone())
            .or_else(|| doc.clusters.get(addr).map(|c| c.name.trim().to_string()));
        let observed = match &name {
            Some(name) => clusters.read(name)?,
            None => None,
        };
        entries.push(StatusEntry {
            address: format!("clusters.{addr}"),
            id: record.map(|r| r.id.clone()),
            present: Some(observed.is_some()),
            nodes: observed.map(|o| o.nodes).unwrap_or_default(),
            updated_at: record.map(|r| r.updated_at.to_rfc3339()),
        });
    }

    let mut manifest_addrs: Vec<&String> =
        doc.manifests.keys().chain(state.manifests.keys()).collect();
    manifest_addrs.sort();
    manifest_addrs.dedup();
    for addr in manifest_addrs {
        if !target.includes(ResourceType::Manifests, addr) {
            continue;
        }
        let record = state.manifest(addr);
        entries.push(StatusEntry {
            address: format!("manifests.{addr}"),
            id: record.and_then(|r| manifests.read(&r.id)),
            present: None,
            nodes: Vec::new(),
            updated_at: record.map(|r| r.updated_at.to_rfc3339()),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    ui::header("kindform Status");
    if entries.is_empty() {
        ui::info("No resources declared or recorded");
        return Ok(());
    }

    for entry in &entries {
        let icon = match (entry.present, &entry.id) {
            (Some(true), _) | (None, Some(_)) => "✓".green(),
            (Some(false), Some(_)) => "✗".red(),
            _ => "○".dimmed(),
        };
        println!("  {} {}", icon, entry.address.bold());

        if ctx.quiet {
            continue;
        }
        match &entry.id {
            Some(id) => ui::kv("id", id),
            None => ui::dim("not created"),
        }
        if entry.present == Some(false) && entry.id.is_some() {
            ui::dim("recorded but missing; apply will recreate it");
        }
        for node in &entry.nodes {
            ui::dim(&format!("{} ({})", node.name, node.role));
        }
        if let Some(at) = &entry.updated_at {
            ui::kv("updated", at);
        }
    }

    Ok(())
}
