//! Undo engine - reverts a run to the state captured when it began

use crate::context::RunContext;
use crate::error::Result;
use crate::interpreter::{OpcodeFailure, run_best_effort};
use crate::opcodes::Checkout;
use crate::program::Program;
use crate::runstate::RunState;
use crate::statefile::StateStore;
use std::path::Path;

/// Result of undoing a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Number of undo opcodes attempted
    pub executed: usize,
    pub failures: Vec<OpcodeFailure>,
}

impl UndoReport {
    /// Every undo opcode succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build the program that restores the begin snapshots of `state`
///
/// An unfinished run first cancels the rebase or merge it left in
/// progress, even when no ref, config entry or stash entry has changed
/// yet. The rest is empty when the repository already matches the begin
/// snapshots. A finished run ends on the branch that was checked out when
/// it began.
pub fn undo_program(state: &RunState, ctx: &RunContext<'_>) -> Result<Program> {
    let repo = ctx.repo;
    let mut program = Program::new();
    if state.is_unfinished() && repo.repo_status()?.operation_in_progress() {
        program.append_program(state.abort_program.clone());
    }

    if repo.branches_snapshot()? == state.begin_branches_snapshot
        && repo.config_snapshot()? == state.begin_config_snapshot
        && repo.stash_size()? == state.begin_stash_size
    {
        log::debug!("Repository matches the state before {}", state.command);
        return Ok(program);
    }

    program.append_program(state.undo.program.clone());
    if !state.is_unfinished()
        && let Some(active) = &state.begin_branches_snapshot.active
    {
        program.add(Checkout {
            branch: active.clone(),
        });
    }
    Ok(program)
}

/// Revert the run described by `state` and delete its record
///
/// Undo opcodes run best-effort: a failing one is reported and the rest
/// still run. The record is deleted either way. The opcodes run in a
/// fresh context built from the repository, connector and dry-run flag
/// of `ctx`.
pub fn undo(
    state: &RunState,
    ctx: &RunContext<'_>,
    store: &StateStore,
    root: &Path,
) -> Result<UndoReport> {
    let ctx = RunContext {
        repo: ctx.repo,
        connector: ctx.connector,
        dry_run: ctx.dry_run,
    };
    let program = undo_program(state, &ctx)?;
    log::info!("Undoing {} ({} steps)", state.command, program.len());
    let failures = run_best_effort(&program, &ctx);
    store.delete(root)?;
    Ok(UndoReport {
        executed: program.len(),
        failures,
    })
}
