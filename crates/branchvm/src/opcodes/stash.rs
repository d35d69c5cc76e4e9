//! Opcodes that park uncommitted changes while a workflow runs

use super::{Instruction, Opcode};
use crate::context::RunContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Stash uncommitted changes, including untracked files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashOpenChanges;

impl Instruction for StashOpenChanges {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if !ctx.repo.repo_status()?.open_changes {
            return Ok(());
        }
        ctx.repo
            .git(&["stash", "push", "--include-untracked"])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        if ctx.repo.repo_status()?.open_changes {
            Ok(vec![RestoreOpenChanges.into()])
        } else {
            Ok(Vec::new())
        }
    }

    fn is_housekeeping(&self) -> bool {
        true
    }
}

/// Pop the most recent stash entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOpenChanges;

impl Instruction for RestoreOpenChanges {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if ctx.repo.stash_size()?.0 == 0 {
            return Ok(());
        }
        ctx.repo.git(&["stash", "pop"])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        if ctx.repo.stash_size()?.0 > 0 {
            Ok(vec![StashOpenChanges.into()])
        } else {
            Ok(Vec::new())
        }
    }

    fn is_housekeeping(&self) -> bool {
        true
    }
}
