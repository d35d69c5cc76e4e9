mod cli;
mod commands;
mod config;
mod dialog;
mod git;
mod paths;
mod planner;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match dispatch(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Sync { all, dry_run } => commands::sync::run(ctx, all, dry_run),
        Command::Hack { branch, dry_run } => commands::hack::run(ctx, &branch, dry_run),
        Command::Ship { branch, dry_run } => commands::ship::run(ctx, branch.as_deref(), dry_run),
        Command::Undo => commands::resolve::undo(ctx),
        Command::Continue => commands::resolve::continue_run(ctx),
        Command::Skip => commands::resolve::skip(ctx),
        Command::Discard => commands::resolve::discard(ctx),
        Command::Status { json } => commands::status::run(ctx, json),
        Command::Alias { enable } => commands::alias::run(ctx, enable),
        Command::PushNewBranches { value, global } => {
            commands::push_new_branches::run(ctx, value, global)
        }
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "twig", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error with advice for engine failures
fn report_error(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(engine) = err.downcast_ref::<branchvm::Error>() {
        if let branchvm::Error::AutomaticUndo { undo_failures, .. } = engine {
            for failure in undo_failures {
                ui::dim(&format!("undo step failed: {failure}"));
            }
        }
        let category = engine.category();
        ui::dim(&format!("{}: {}", category.description(), category.advice()));
    }
}
