mod backends;
mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Desired-state document
    pub file: PathBuf,
    /// Host state file
    pub state_path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "kindform", &mut io::stdout());
        return Ok(());
    }

    let state_path = match cli.state {
        Some(path) => path,
        None => paths::state_file()?,
    };

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
        state_path,
    };

    match cli.command {
        Command::Validate => commands::declarative::validate(&ctx),
        Command::Plan(args) => commands::declarative::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(
            &ctx,
            args.target.as_deref(),
            args.dry_run,
            args.yes,
        ),
        Command::Status(args) => {
            commands::declarative::status(&ctx, args.target.as_deref(), args.json)
        }
        Command::Replace(args) => commands::declarative::replace(&ctx, &args.target, args.yes),
        Command::Destroy(args) => commands::declarative::destroy(
            &ctx,
            args.target.as_deref(),
            args.dry_run,
            args.yes,
        ),
        Command::Completions { .. } => Ok(()),
    }
}
