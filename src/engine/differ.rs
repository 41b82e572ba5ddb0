//! Plan display

use colored::{ColoredString, Colorize};
use converge::ReconcileAction;

use super::planner::{DocumentPlan, StepKind};

fn symbol(action: &ReconcileAction) -> ColoredString {
    match action {
        ReconcileAction::CreateCluster(_) | ReconcileAction::CreateNamespace(_) => "+".green(),
        ReconcileAction::DeleteCluster(_) | ReconcileAction::DeleteManifest(_) => "-".red(),
        ReconcileAction::ApplyManifest(_) => "~".yellow(),
        ReconcileAction::NoOp(_) => "=".dimmed(),
    }
}

/// Display a document plan grouped by resource address
pub fn display_plan(doc: &DocumentPlan) {
    if !doc.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    for step in &doc.steps {
        if let StepKind::ClusterHandover(heir) = &step.kind {
            println!("  {} {} now tracked as clusters.{heir}", "~".yellow(), step.label());
            continue;
        }
        if step.stale_id {
            println!("  {} {} stored cluster is gone", "!".yellow(), step.label());
        }
        if step.plan.is_noop() {
            println!("  {} {}", "=".dimmed(), step.label().dimmed());
            continue;
        }

        println!("  {}", step.label().bold());
        for action in &step.plan {
            println!("    {} {}", symbol(action), action);
        }
    }

    let summary = doc.summary();
    println!();
    println!(
        "  Plan: {} to add, {} to remove, {} unchanged",
        summary.additions.to_string().green(),
        summary.removals.to_string().red(),
        summary.unchanged.to_string().dimmed()
    );
}
