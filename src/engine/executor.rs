//! Execution engine - runs a document plan with spinners and prompts

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use converge::{
    ClusterLifecycle, ClusterState, ConfirmCallback, ExecuteSummary, ExecutionResult,
    ManifestLifecycle, ProgressCallback, ReconcileAction,
};
use indicatif::ProgressBar;
use std::path::Path;

use super::planner::{DocumentPlan, StepKind};
use crate::progress;
use crate::state::HostState;
use crate::ui;

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// No spinners
    pub quiet: bool,
}

/// Spinner per action
pub struct SpinnerProgress {
    quiet: bool,
    current: Option<ProgressBar>,
}

impl SpinnerProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: None,
        }
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_plan_start(&mut self, count: usize) {
        log::debug!("Running {count} actions");
    }

    fn on_action_start(&mut self, action: &ReconcileAction) {
        if !self.quiet {
            self.current = Some(progress::spinner(&format!("{action}...")));
        }
    }

    fn on_action_complete(&mut self, action: &ReconcileAction, result: &ExecutionResult) {
        let Some(pb) = self.current.take() else {
            return;
        };
        match result {
            ExecutionResult::NoChange => progress::finish_unchanged(&pb, &action.to_string()),
            ExecutionResult::Skipped { reason } => {
                progress::finish_unchanged(&pb, &format!("{action} ({reason})"));
            }
            _ => progress::finish_success(&pb, &action.to_string()),
        }
    }

    fn on_action_failed(&mut self, action: &ReconcileAction, error: &converge::Error) {
        match self.current.take() {
            Some(pb) => progress::finish_error(&pb, &format!("{action}: {error}")),
            None => ui::error(&format!("{action}: {error}")),
        }
    }

    fn on_plan_complete(&mut self) {}
}

/// Asks on the terminal unless `--yes` was given
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.yes {
            return true;
        }

        match dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("Could not read confirmation: {e}");
                false
            }
        }
    }
}

/// Run every step in order, saving host state after each one
///
/// Stops at the first failing step. Steps that already ran stay recorded.
pub fn execute(
    doc: &DocumentPlan,
    clusters: &ClusterLifecycle<'_>,
    manifests: &ManifestLifecycle<'_>,
    state: &mut HostState,
    state_path: &Path,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    let mut summary = ExecuteSummary::default();
    let mut progress = SpinnerProgress::new(opts.quiet);
    let mut confirm = PromptConfirm { yes: opts.yes };

    for step in &doc.steps {
        if let StepKind::ClusterHandover(heir) = &step.kind {
            if !opts.quiet {
                ui::dim(&format!("{} is now tracked as clusters.{heir}", step.label()));
            }
            if !opts.dry_run {
                state.set_cluster(&step.address, None);
                state.touch(state_path)?;
            }
            continue;
        }

        if step.stale_id && !opts.dry_run {
            log::info!("{}: stored cluster is gone, forgetting its id", step.label());
            state.set_cluster(&step.address, None);
            state.touch(state_path)?;
        }

        if !opts.quiet && !step.plan.is_noop() {
            println!();
            println!("  {} {}", "→".cyan(), step.label().bold());
        }

        let result = match step.kind {
            StepKind::Cluster | StepKind::ClusterHandover(_) => {
                clusters.apply(&step.plan, &mut progress, &mut confirm)
            }
            StepKind::Manifest(_) | StepKind::ManifestRemoval => {
                manifests.apply(&step.plan, &mut progress, &mut confirm)
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if step.kind == StepKind::Cluster && e.cluster_state() == ClusterState::Absent {
                    state.set_cluster(&step.address, None);
                    state.touch(state_path)?;
                }
                ui::dim(e.advice());
                return Err(e).with_context(|| format!("{} failed", step.label()));
            }
        };

        summary.merge(&outcome.report.summary);

        if outcome.report.is_declined() {
            ui::warn(&format!("Skipped {}", step.label()));
            continue;
        }
        if opts.dry_run {
            continue;
        }

        match &step.kind {
            StepKind::Cluster | StepKind::ClusterHandover(_) => {
                state.set_cluster(&step.address, outcome.id);
            }
            StepKind::Manifest(spec) => state.record_manifest(&step.address, spec),
            StepKind::ManifestRemoval => state.forget_manifest(&step.address),
        }
        state.touch(state_path)?;
    }

    Ok(summary)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }

    println!("  {} Done", "✓".green().bold());

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.applied > 0 {
        println!("    • {} applied", summary.applied);
    }
    if summary.removed > 0 {
        println!("    • {} removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.no_change > 0 {
        println!("    • {} unchanged", summary.no_change);
    }
}
