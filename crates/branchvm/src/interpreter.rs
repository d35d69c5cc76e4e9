//! Interpreter - runs programs step by step, halting or rolling back on failure

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::opcodes::Opcode;
use crate::program::Program;
use crate::runstate::{RunState, UndoLedger, UnfinishedDetails};
use crate::statefile::StateStore;
use crate::types::LocalBranchName;
use std::fmt;
use std::path::Path;

/// How a run ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every opcode ran
    Finished,
    /// A conflict needs the user; the run state has been saved
    Halted(UnfinishedDetails),
}

/// An opcode that failed while running a program best-effort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeFailure {
    pub opcode: String,
    pub message: String,
}

impl fmt::Display for OpcodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.opcode, self.message)
    }
}

enum Step {
    Advanced(UndoLedger),
    Failed { ledger: UndoLedger, error: Error },
}

/// Run one opcode, threading the undo ledger through
///
/// The inverse is computed against the state before the opcode runs and
/// recorded only if it succeeds.
fn step(opcode: &Opcode, ctx: &RunContext<'_>, ledger: UndoLedger) -> Step {
    let undo = match opcode.undo_program(ctx) {
        Ok(undo) => undo,
        Err(error) => return Step::Failed { ledger, error },
    };
    match opcode.run(ctx) {
        Ok(()) => Step::Advanced(ledger.record(opcode, undo)),
        Err(error) => Step::Failed { ledger, error },
    }
}

/// Execute the remaining program of a run
///
/// # Arguments
/// * `state` - Run state; its `run_program` is consumed and its undo ledger grows
/// * `ctx` - Repository and hosting access for the opcodes
/// * `store` - Where the run state is saved if the run stops early
/// * `root` - Repository root the run state belongs to
///
/// # Returns
/// [`Outcome::Finished`] after the last opcode, with any saved record
/// deleted. [`Outcome::Halted`] when a conflict needs the user.
///
/// # Errors
/// [`Error::AutomaticUndo`] after a failed opcode was rolled back, or the
/// failure itself when the run stopped without rollback. In the latter
/// case the run state is saved so the next invocation can resolve it.
pub fn execute(
    state: &mut RunState,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<Outcome> {
    if state.run_program.is_empty() && !state.is_unfinished() {
        return Ok(Outcome::Finished);
    }
    state.unfinished_details = None;
    state.abort_program = Program::new();

    while let Some(opcode) = state.run_program.pop_front() {
        log::debug!("Running {opcode}");
        match step(&opcode, ctx, std::mem::take(&mut state.undo)) {
            Step::Advanced(ledger) => state.undo = ledger,
            Step::Failed { ledger, error } => {
                state.undo = ledger;
                return handle_failure(state, opcode, error, ctx, store, root);
            }
        }
    }

    log::debug!("{} finished", state.command);
    store.delete(root)?;
    Ok(Outcome::Finished)
}

fn handle_failure(
    state: &mut RunState,
    opcode: Opcode,
    error: Error,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<Outcome> {
    if opcode.is_continuable_after_conflict() {
        log::warn!("{} stopped: {error}", opcode.name());
        let mut program = Program::from(opcode.continue_program());
        program.append_program(std::mem::take(&mut state.run_program));
        state.run_program = program;
        state.abort_program = Program::from(opcode.abort_program());
        state.mark_unfinished(end_branch(state, ctx), opcode.is_skippable());
        store.save(root, state)?;
        let details = state
            .unfinished_details
            .clone()
            .ok_or_else(|| Error::InvalidInput("run state lost its unfinished details".into()))?;
        return Ok(Outcome::Halted(details));
    }

    if opcode.is_automatically_undoable() {
        log::warn!("{} failed, undoing the changes made so far", opcode.name());
        let failures = run_best_effort(&state.undo.program, ctx);
        store.delete(root)?;
        let failures = failures.iter().map(ToString::to_string).collect();
        return Err(opcode.build_automatic_undo_error(error, failures));
    }

    log::warn!("{} failed, stopping", opcode.name());
    let can_skip = opcode.is_skippable();
    state.abort_program = Program::from(opcode.abort_program());
    state.run_program.prepend(opcode);
    state.mark_unfinished(end_branch(state, ctx), can_skip);
    store.save(root, state)?;
    Err(error)
}

fn end_branch(state: &RunState, ctx: &RunContext<'_>) -> LocalBranchName {
    match ctx.repo.current_branch() {
        Ok(branch) => branch,
        Err(e) => {
            log::debug!("Cannot determine current branch: {e}");
            state
                .begin_branches_snapshot
                .active
                .clone()
                .unwrap_or_else(|| LocalBranchName::new("HEAD"))
        }
    }
}

/// Run every opcode of `program`, collecting failures instead of stopping
///
/// Used for undo programs, whose opcodes revert independent changes.
pub fn run_best_effort(program: &Program, ctx: &RunContext<'_>) -> Vec<OpcodeFailure> {
    let mut failures = Vec::new();
    for opcode in program.iter() {
        log::debug!("Undoing with {opcode}");
        if let Err(e) = opcode.run(ctx) {
            log::warn!("{} failed: {e}", opcode.name());
            failures.push(OpcodeFailure {
                opcode: opcode.to_string(),
                message: e.to_string(),
            });
        }
    }
    failures
}
