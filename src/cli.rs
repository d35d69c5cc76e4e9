use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "twig")]
#[command(version)]
#[command(about = "Resumable, undoable git branch workflows", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Update the main branch and the current branch
    Sync {
        /// Sync every local branch
        #[arg(short, long)]
        all: bool,

        /// Print the git commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a feature branch off the main branch
    Hack {
        /// Name of the new branch
        branch: String,

        /// Print the git commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge a feature branch into the main branch and delete it
    Ship {
        /// Branch to ship (default: current branch)
        branch: Option<String>,

        /// Print the git commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert the last (or the unfinished) twig command
    Undo,

    /// Resume the unfinished command after resolving conflicts
    Continue,

    /// Skip the branch the unfinished command stopped on
    Skip,

    /// Forget the unfinished command
    Discard,

    /// Show the unfinished command, if any
    Status {
        /// Print the stored run state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add or remove git aliases for twig commands (git sync, git hack, ...)
    Alias {
        /// true to add the aliases, false to remove them
        #[arg(action = clap::ArgAction::Set)]
        enable: bool,
    },

    /// Show or set whether new branches are pushed to origin
    PushNewBranches {
        /// New value (omit to show the current one)
        #[arg(action = clap::ArgAction::Set)]
        value: Option<bool>,

        /// Change the global git config instead of this repository's
        #[arg(long)]
        global: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
