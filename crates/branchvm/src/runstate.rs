//! The record of one workflow run

use crate::context::Repository;
use crate::error::Result;
use crate::opcodes::Opcode;
use crate::program::Program;
use crate::types::{BranchesSnapshot, ConfigSnapshot, LocalBranchName, StashSize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where and when a run stopped before completing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfinishedDetails {
    /// Branch checked out when the run stopped
    pub end_branch: LocalBranchName,
    pub end_time: DateTime<Utc>,
    /// Whether the user may skip the blocking branch
    pub can_skip: bool,
}

/// Inverse opcodes of the steps executed so far
///
/// `program` reverts the whole run. `branch_program` holds the part of it
/// that reverts work on the branch currently being processed and starts
/// over at every end-of-branch marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLedger {
    pub program: Program,
    #[serde(default)]
    pub branch_program: Program,
}

impl UndoLedger {
    /// Account for a successfully executed opcode and its inverse
    #[must_use]
    pub fn record(mut self, opcode: &Opcode, undo: Vec<Opcode>) -> Self {
        if opcode.ends_branch() {
            self.branch_program = Program::new();
            return self;
        }
        let undo = Program::from(undo);
        if !opcode.is_housekeeping() {
            self.branch_program.prepend_program(undo.clone());
        }
        self.program.prepend_program(undo);
        self
    }

    /// Forget the inverses of the current branch's work
    ///
    /// Used once that work has been reverted by other means.
    #[must_use]
    pub fn drop_branch(mut self) -> Self {
        let branch = std::mem::take(&mut self.branch_program);
        // branch inverses are always the most recently prepended entries
        let prefix: Vec<&Opcode> = self.program.iter().take(branch.len()).collect();
        if prefix.into_iter().eq(branch.iter()) {
            self.program.drop_front(branch.len());
        } else {
            log::warn!("Undo ledger out of sync with the current branch, keeping it");
        }
        self
    }
}

/// Persisted progress of one workflow invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Name of the workflow that started the run, e.g. `sync`
    pub command: String,
    #[serde(default)]
    pub dry_run: bool,
    /// Opcodes not executed yet
    pub run_program: Program,
    /// Cancels the git operation a conflicting opcode left in progress
    #[serde(default)]
    pub abort_program: Program,
    #[serde(default)]
    pub undo: UndoLedger,
    pub unfinished_details: Option<UnfinishedDetails>,
    pub begin_branches_snapshot: BranchesSnapshot,
    pub begin_config_snapshot: ConfigSnapshot,
    pub begin_stash_size: StashSize,
}

impl RunState {
    /// Start a run, capturing the state undo restores
    pub fn begin(
        command: impl Into<String>,
        program: Program,
        repo: &dyn Repository,
        dry_run: bool,
    ) -> Result<Self> {
        Ok(Self {
            command: command.into(),
            dry_run,
            run_program: program,
            abort_program: Program::new(),
            undo: UndoLedger::default(),
            unfinished_details: None,
            begin_branches_snapshot: repo.branches_snapshot()?,
            begin_config_snapshot: repo.config_snapshot()?,
            begin_stash_size: repo.stash_size()?,
        })
    }

    /// The run stopped early and awaits a decision
    pub fn is_unfinished(&self) -> bool {
        self.unfinished_details.is_some()
    }

    /// All opcodes executed
    pub fn is_finished(&self) -> bool {
        self.unfinished_details.is_none() && self.run_program.is_empty()
    }

    pub fn can_skip(&self) -> bool {
        self.unfinished_details.as_ref().is_some_and(|d| d.can_skip)
    }

    pub(crate) fn mark_unfinished(&mut self, end_branch: LocalBranchName, can_skip: bool) {
        self.unfinished_details = Some(UnfinishedDetails {
            end_branch,
            end_time: Utc::now(),
            can_skip,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{
        Checkout, EndOfBranchProgram, RebaseBranch, ResetCurrentBranchToSha, RestoreOpenChanges,
        StashOpenChanges,
    };
    use crate::testing::FakeRepository;
    use crate::types::Sha;

    fn reset(sha: &str) -> Opcode {
        Opcode::from(ResetCurrentBranchToSha {
            sha: Sha::new(sha),
            hard: true,
        })
    }

    #[test]
    fn test_ledger_prepends_inverses() {
        let rebase = Opcode::from(RebaseBranch {
            onto: "origin/a".to_string(),
        });
        let ledger = UndoLedger::default()
            .record(
                &Opcode::from(StashOpenChanges),
                vec![Opcode::from(RestoreOpenChanges)],
            )
            .record(&rebase, vec![reset("1")]);
        assert_eq!(
            ledger.program.iter().map(Opcode::name).collect::<Vec<_>>(),
            vec!["ResetCurrentBranchToSha", "RestoreOpenChanges"]
        );
        // housekeeping does not belong to any branch
        assert_eq!(ledger.branch_program.len(), 1);
    }

    #[test]
    fn test_ledger_branch_resets_at_marker() {
        let checkout = Opcode::from(Checkout {
            branch: "a".into(),
        });
        let ledger = UndoLedger::default()
            .record(&checkout, vec![reset("1")])
            .record(&Opcode::from(EndOfBranchProgram), Vec::new())
            .record(&checkout, vec![reset("2")]);
        assert_eq!(ledger.branch_program, Program::from(vec![reset("2")]));
        assert_eq!(ledger.program.len(), 2);

        let ledger = ledger.drop_branch();
        assert_eq!(ledger.program, Program::from(vec![reset("1")]));
        assert!(ledger.branch_program.is_empty());
    }

    #[test]
    fn test_begin_captures_snapshots() {
        let repo = FakeRepository::new("main");
        repo.add_branch("feature", "abc");
        let state = RunState::begin("sync", Program::new(), &repo, false).unwrap();
        assert_eq!(state.begin_branches_snapshot.branches.len(), 2);
        assert_eq!(state.begin_stash_size, StashSize(0));
        assert!(state.is_finished());
        assert!(!state.can_skip());
    }

    #[test]
    fn test_serialization_round_trip() {
        let repo = FakeRepository::new("main");
        let mut state =
            RunState::begin("sync", Program::from(vec![reset("9")]), &repo, false).unwrap();
        state.mark_unfinished("main".into(), true);
        let json = serde_json::to_string_pretty(&state).unwrap();
        let back: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(back.can_skip());
    }
}
