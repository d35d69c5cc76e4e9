//! Command implementations
//!
//! Workflow commands (`sync`, `hack`, `ship`) share [`run_workflow`]:
//! lock the repository, settle any unfinished run, plan, wrap, execute and
//! report. The resolution commands (`continue`, `skip`, `undo`, `discard`)
//! act on the stored run directly.

pub mod alias;
pub mod hack;
pub mod push_new_branches;
pub mod resolve;
pub mod ship;
pub mod status;
pub mod sync;

use crate::Context;
use crate::config::{self, Settings, UserConfig};
use crate::dialog;
use crate::git::GitRepository;
use crate::paths;
use crate::ui;
use anyhow::{Context as _, Result};
use branchvm::{
    Connector, Dialog, Handled, Outcome, Program, Resolution, RunContext, RunState,
    StateStore, UndoReport, WrapOptions,
};
use std::path::Path;

/// Everything a command needs to work on one repository
pub struct Session {
    pub repo: GitRepository,
    /// Record of the unfinished run, if any
    pub store: StateStore,
    /// Record of the last finished run, kept for `twig undo`
    pub history: StateStore,
    pub user: UserConfig,
    pub dialog: Box<dyn Dialog>,
    connector: Option<Box<dyn Connector>>,
    dry_run: bool,
}

impl Session {
    /// Open the repository in the current directory
    pub fn open(dry_run: bool) -> Result<Self> {
        let cwd = std::env::current_dir().context("Could not read the current directory")?;
        let repo = GitRepository::open(&cwd, dry_run)?;
        let user = UserConfig::load()?;
        let state_dir = paths::state_dir()?;

        let token = config::resolve_token(
            &repo,
            &user,
            std::env::var(config::ENV_GITHUB_TOKEN).ok(),
        )?;
        let connector = repo.origin_url().and_then(|url| {
            hostkit::connector_for(&url, token, user.github.api_base.as_deref())
        });
        if connector.is_none() {
            log::debug!("No hosting connector for this repository");
        }

        Ok(Self {
            repo,
            store: StateStore::new(&state_dir),
            history: StateStore::new(state_dir.join("finished")),
            user,
            dialog: dialog::from_env(),
            connector,
            dry_run,
        })
    }

    pub fn root(&self) -> &Path {
        self.repo.root()
    }

    /// Settings for this repository
    pub fn settings(&self) -> Result<Settings> {
        Settings::resolve(
            &self.repo,
            &self.user,
            std::env::var(config::ENV_GITHUB_TOKEN).ok(),
        )
    }

    pub fn connector(&self) -> Option<&dyn Connector> {
        self.connector.as_deref()
    }

    pub fn context(&self) -> RunContext<'_> {
        RunContext {
            repo: &self.repo,
            connector: self.connector(),
            dry_run: self.dry_run,
        }
    }
}

/// Run a workflow planned by `plan`
pub fn run_workflow<F>(ctx: &Context, session: &Session, command: &str, plan: F) -> Result<()>
where
    F: FnOnce(&Session, &Settings) -> Result<Program>,
{
    let root = session.root();
    let _lock = session.store.lock(root)?;
    let run_ctx = session.context();
    let pending = session.store.load(root)?.map(|state| state.command);

    match branchvm::handle_unfinished_state(
        session.dialog.as_ref(),
        &run_ctx,
        &session.store,
        root,
    )? {
        Resolution::Proceed => {}
        Resolution::Exit(handled) => {
            let pending = pending.unwrap_or_else(|| command.to_string());
            return report_handled(ctx, session, &pending, &handled);
        }
    }

    let settings = session.settings()?;
    let mut program = plan(session, &settings)?;
    if program.is_empty() {
        ui::info("Nothing to do");
        return Ok(());
    }
    program.wrap(&WrapOptions::for_repository(
        &session.repo,
        session.dry_run,
        settings.stash_open_changes,
    )?);
    log::debug!("Program for {command}:\n{program}");

    let mut state = RunState::begin(command, program, &session.repo, session.dry_run)?;
    session.history.delete(root)?;
    let outcome = branchvm::execute(&mut state, &run_ctx, &session.store, root)?;
    report_outcome(ctx, session, &state, &outcome)
}

/// Tell the user how the run ended
pub fn report_outcome(
    ctx: &Context,
    session: &Session,
    state: &RunState,
    outcome: &Outcome,
) -> Result<()> {
    match outcome {
        Outcome::Finished => {
            if !state.dry_run {
                session.history.save(session.root(), state)?;
            }
            if !ctx.quiet {
                println!();
                ui::success(&format!("twig {} done", state.command));
            }
        }
        Outcome::Halted(details) => {
            println!();
            ui::warn(&format!(
                "twig {} stopped on branch {} because of conflicts",
                state.command, details.end_branch
            ));
            ui::dim("Resolve the conflicts and stage the files, then run `twig continue`");
            if details.can_skip {
                ui::dim(&format!(
                    "Run `twig skip` to leave {} alone for now",
                    details.end_branch
                ));
            }
            ui::dim("Run `twig undo` to revert everything this run did");
        }
    }
    Ok(())
}

/// Describe an undo
pub fn report_undo(ctx: &Context, command: &str, report: &UndoReport) {
    if report.executed == 0 {
        ui::info(&format!("Nothing to undo for twig {command}"));
        return;
    }
    if report.is_clean() {
        if !ctx.quiet {
            ui::success(&format!("Undid twig {command}"));
        }
        return;
    }
    ui::warn(&format!(
        "Undid twig {command}, but {} of {} steps failed:",
        report.failures.len(),
        report.executed
    ));
    for failure in &report.failures {
        ui::dim(&failure.to_string());
    }
}

fn report_handled(ctx: &Context, session: &Session, command: &str, handled: &Handled) -> Result<()> {
    match handled {
        Handled::Continued(outcome) | Handled::Skipped(outcome) => {
            report_resumed(ctx, session, command, outcome)
        }
        Handled::Undone(report) => {
            report_undo(ctx, command, report);
            Ok(())
        }
        Handled::Quit => {
            ui::info("Nothing changed");
            Ok(())
        }
    }
}

/// Report a resumed run; a halted one left its record behind
pub fn report_resumed(
    ctx: &Context,
    session: &Session,
    command: &str,
    outcome: &Outcome,
) -> Result<()> {
    match outcome {
        Outcome::Finished => {
            if !ctx.quiet {
                println!();
                ui::success(&format!("twig {command} done"));
            }
            Ok(())
        }
        Outcome::Halted(_) => match session.store.load(session.root())? {
            Some(state) => report_outcome(ctx, session, &state, outcome),
            None => Ok(()),
        },
    }
}
