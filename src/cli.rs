use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kindform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative local Kubernetes clusters and manifests", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Desired-state document
    #[arg(
        short,
        long,
        global = true,
        env = "KINDFORM_FILE",
        default_value = crate::config::DEFAULT_FILE
    )]
    pub file: PathBuf,

    /// State file (default: ~/.local/state/kindform/state.toml)
    #[arg(long, global = true, env = "KINDFORM_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the document without touching any cluster
    Validate,

    /// Show what apply would change
    Plan(TargetArgs),

    /// Make clusters and manifests match the document
    Apply(ApplyArgs),

    /// Show stored ids and what the backends report
    Status(StatusArgs),

    /// Delete and recreate one cluster
    Replace(ReplaceArgs),

    /// Delete everything kindform has created
    Destroy(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this resource type or address: clusters, manifests, clusters.<addr>, manifests.<addr>
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this resource type or address: clusters, manifests, clusters.<addr>, manifests.<addr>
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only this resource type or address
    pub target: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReplaceArgs {
    /// Cluster to replace, e.g. clusters.dev
    pub target: String,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}
