//! Resolving a run that stopped before it finished
//!
//! Every workflow calls [`handle_unfinished_state`] before planning its
//! own program. When the previous run in the repository halted, the user
//! decides what happens to it first.

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::interpreter::{Outcome, execute};
use crate::opcodes::Checkout;
use crate::program::Program;
use crate::runstate::{RunState, UnfinishedDetails};
use crate::statefile::StateStore;
use crate::undo::{UndoReport, undo};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What to do with an unfinished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Forget the unfinished run
    Discard,
    /// Resume after the user resolved the conflicts
    Continue,
    /// Revert everything the unfinished run did
    Undo,
    /// Drop the rest of the blocking branch's work and resume
    Skip,
    /// Stop; ask again next time
    Quit,
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Discard => "discard",
            Response::Continue => "continue",
            Response::Undo => "undo",
            Response::Skip => "skip",
            Response::Quit => "quit",
        }
    }

    /// Human readable choice for dialogs
    pub fn describe(&self, details: &UnfinishedDetails) -> String {
        match self {
            Response::Discard => "Discard the unfinished run and start fresh".to_string(),
            Response::Continue => "Continue, I have resolved the conflicts".to_string(),
            Response::Undo => "Undo the unfinished run".to_string(),
            Response::Skip => format!("Skip branch {} and continue", details.end_branch),
            Response::Quit => "Quit without doing anything".to_string(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "discard" => Ok(Response::Discard),
            "continue" => Ok(Response::Continue),
            "undo" => Ok(Response::Undo),
            "skip" => Ok(Response::Skip),
            "quit" => Ok(Response::Quit),
            _ => Err(Error::UnexpectedResponse(s.to_string())),
        }
    }
}

/// Source of the user's decision
pub trait Dialog {
    /// Pick one of `options` for the unfinished run of `command`
    fn choose(
        &self,
        command: &str,
        details: &UnfinishedDetails,
        options: &[Response],
    ) -> Result<Response>;
}

/// Responses offered for the given unfinished run
pub fn options(state: &RunState) -> Vec<Response> {
    let mut options = vec![Response::Quit, Response::Continue, Response::Undo];
    if state.can_skip() {
        options.push(Response::Skip);
    }
    options.push(Response::Discard);
    options
}

/// How the unfinished run was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Continued(Outcome),
    Skipped(Outcome),
    Undone(UndoReport),
    Quit,
}

/// Whether the calling workflow should run its own program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing is unfinished (any more)
    Proceed,
    /// The unfinished run was dealt with instead; stop here
    Exit(Handled),
}

/// Check for an unfinished run and let the user decide about it
pub fn handle_unfinished_state(
    dialog: &dyn Dialog,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<Resolution> {
    let Some(state) = store.load(root)? else {
        return Ok(Resolution::Proceed);
    };
    let Some(details) = state.unfinished_details.clone() else {
        return Ok(Resolution::Proceed);
    };

    let response = dialog.choose(&state.command, &details, &options(&state))?;
    log::debug!("Unfinished {} resolved with {response}", state.command);
    let handled = match response {
        Response::Discard => {
            discard(store, root)?;
            return Ok(Resolution::Proceed);
        }
        Response::Continue => Handled::Continued(continue_run(state, ctx, store, root)?),
        Response::Undo => Handled::Undone(undo(&state, ctx, store, root)?),
        Response::Skip => Handled::Skipped(skip(state, ctx, store, root)?),
        Response::Quit => Handled::Quit,
    };
    Ok(Resolution::Exit(handled))
}

/// Delete the record of the unfinished run
pub fn discard(store: &StateStore, root: &Path) -> Result<()> {
    store.delete(root)
}

/// Resume the run where it stopped
///
/// Fails with [`Error::UnresolvedConflicts`] while the working copy still
/// has conflicts, leaving the record as it is.
pub fn continue_run(
    mut state: RunState,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<Outcome> {
    if ctx.repo.repo_status()?.conflicts {
        return Err(Error::UnresolvedConflicts);
    }
    execute(&mut state, ctx, store, root)
}

/// Skip the rest of the blocking branch's work and resume
///
/// Cancels the git operation in progress, reverts what the run already
/// did on the blocking branch and resumes with the next branch. The
/// checked out branch is read from the repository; if the user switched
/// away from the branch the run stopped on, that branch is checked out
/// again before its changes are reverted.
pub fn skip(
    mut state: RunState,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<Outcome> {
    let Some(details) = state.unfinished_details.clone() else {
        return Err(Error::InvalidInput("the run is not unfinished".to_string()));
    };
    if !details.can_skip {
        return Err(Error::SkipNotSupported);
    }

    let mut compensation = Program::new();
    if ctx.repo.repo_status()?.operation_in_progress() {
        compensation.append_program(state.abort_program.clone());
    }
    let current = ctx.repo.current_branch()?;
    if current != details.end_branch {
        log::warn!(
            "The run stopped on {} but {current} is checked out, returning to {}",
            details.end_branch,
            details.end_branch
        );
        compensation.add(Checkout {
            branch: details.end_branch.clone(),
        });
    }
    compensation.append_program(state.undo.branch_program.clone());

    for opcode in compensation.iter() {
        log::debug!("Skipping with {opcode}");
        opcode.run(ctx)?;
    }

    state.undo = std::mem::take(&mut state.undo).drop_branch();
    state.abort_program = Program::new();
    state.run_program.skip_current_branch();
    execute(&mut state, ctx, store, root)
}
