//! Programs: ordered sequences of opcodes

use crate::context::Repository;
use crate::error::Result;
use crate::opcodes::{Opcode, PreserveCheckoutHistory, RestoreOpenChanges, StashOpenChanges};
use crate::types::LocalBranchName;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Opcodes in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program(VecDeque<Opcode>);

/// Housekeeping added around a workflow's own opcodes
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    pub dry_run: bool,
    /// Branch `git checkout -` should lead to once the workflow is done
    pub previous_branch: Option<LocalBranchName>,
    /// Stash uncommitted changes for the duration of the program
    pub stash_open_changes: bool,
}

impl WrapOptions {
    /// Options for a program about to run against `repo`
    ///
    /// Stashing is only requested while the working copy has open changes,
    /// so the closing restore never pops a stash entry the run didn't make.
    pub fn for_repository(
        repo: &dyn Repository,
        dry_run: bool,
        stash_open_changes: bool,
    ) -> Result<Self> {
        let stash_open_changes = stash_open_changes && repo.repo_status()?.open_changes;
        Ok(Self {
            dry_run,
            previous_branch: repo.previously_checked_out_branch(),
            stash_open_changes,
        })
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opcode> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Opcode> {
        self.0.front()
    }

    /// Append an opcode
    pub fn add(&mut self, opcode: impl Into<Opcode>) {
        self.0.push_back(opcode.into());
    }

    /// Insert an opcode in front of all others
    pub fn prepend(&mut self, opcode: impl Into<Opcode>) {
        self.0.push_front(opcode.into());
    }

    /// Insert another program in front of this one, keeping its order
    pub fn prepend_program(&mut self, other: Program) {
        for opcode in other.0.into_iter().rev() {
            self.0.push_front(opcode);
        }
    }

    pub fn append_program(&mut self, mut other: Program) {
        self.0.append(&mut other.0);
    }

    pub fn pop_front(&mut self) -> Option<Opcode> {
        self.0.pop_front()
    }

    /// Remove the first `count` opcodes
    pub fn drop_front(&mut self, count: usize) {
        let count = count.min(self.0.len());
        self.0.drain(..count);
    }

    /// Drop the remaining work for the branch at the front of the program
    ///
    /// Removes opcodes up to and including the next end-of-branch marker.
    /// Housekeeping opcodes in that range are kept.
    pub fn skip_current_branch(&mut self) {
        let mut kept = VecDeque::new();
        while let Some(opcode) = self.0.pop_front() {
            if opcode.ends_branch() {
                break;
            }
            if opcode.is_housekeeping() {
                kept.push_back(opcode);
            }
        }
        kept.append(&mut self.0);
        self.0 = kept;
    }

    /// Bracket the program with housekeeping opcodes
    ///
    /// Resulting order: `[stash, program..., restore, preserve-history]`.
    /// Empty programs stay empty.
    pub fn wrap(&mut self, options: &WrapOptions) {
        if self.is_empty() {
            return;
        }
        if options.stash_open_changes {
            self.prepend(StashOpenChanges);
            self.add(RestoreOpenChanges);
        }
        if !options.dry_run {
            self.add(PreserveCheckoutHistory {
                previous_branch: options.previous_branch.clone(),
            });
        }
    }
}

impl From<Vec<Opcode>> for Program {
    fn from(opcodes: Vec<Opcode>) -> Self {
        Self(opcodes.into())
    }
}

impl FromIterator<Opcode> for Program {
    fn from_iter<I: IntoIterator<Item = Opcode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Program {
    type Item = Opcode;
    type IntoIter = std::collections::vec_deque::IntoIter<Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(empty program)");
        }
        for (i, opcode) in self.0.iter().enumerate() {
            writeln!(f, "{:>3}. {opcode}", i + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::interpreter::{Outcome, execute};
    use crate::opcodes::{Checkout, EndOfBranchProgram, Fetch, PushCurrentBranch, RebaseBranch};
    use crate::runstate::RunState;
    use crate::statefile::StateStore;
    use crate::testing::FakeRepository;
    use crate::types::StashSize;
    use std::path::Path;
    use tempfile::TempDir;

    fn names(program: &Program) -> Vec<&'static str> {
        program.iter().map(Opcode::name).collect()
    }

    fn rebase(onto: &str) -> RebaseBranch {
        RebaseBranch {
            onto: onto.to_string(),
        }
    }

    #[test]
    fn test_wrap_empty_program_is_noop() {
        let mut program = Program::new();
        program.wrap(&WrapOptions {
            dry_run: false,
            previous_branch: Some("main".into()),
            stash_open_changes: true,
        });
        assert!(program.is_empty());
    }

    #[test]
    fn test_wrap_order() {
        let mut program = Program::new();
        program.add(Fetch);
        program.add(rebase("origin/feature"));
        program.wrap(&WrapOptions {
            dry_run: false,
            previous_branch: Some("main".into()),
            stash_open_changes: true,
        });
        assert_eq!(
            names(&program),
            vec![
                "StashOpenChanges",
                "Fetch",
                "RebaseBranch",
                "RestoreOpenChanges",
                "PreserveCheckoutHistory",
            ]
        );
    }

    #[test]
    fn test_wrap_dry_run_skips_history() {
        let mut program = Program::new();
        program.add(Fetch);
        program.wrap(&WrapOptions {
            dry_run: true,
            previous_branch: None,
            stash_open_changes: false,
        });
        assert_eq!(names(&program), vec!["Fetch"]);
    }

    #[test]
    fn test_clean_tree_keeps_existing_stash_entry() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let repo = FakeRepository::new("main");
        repo.set_stash_size(1);
        let ctx = RunContext::new(&repo);

        let options = WrapOptions::for_repository(&repo, false, true).unwrap();
        assert!(!options.stash_open_changes);
        let mut program = Program::from(vec![Opcode::from(Fetch)]);
        program.wrap(&options);
        assert_eq!(names(&program), vec!["Fetch", "PreserveCheckoutHistory"]);

        let mut state = RunState::begin("sync", program, &repo, false).unwrap();
        let outcome = execute(&mut state, &ctx, &store, Path::new("/repo")).unwrap();
        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(repo.commands(), vec!["git fetch --prune --tags".to_string()]);
        assert_eq!(repo.stash_size().unwrap(), StashSize(1));
        assert!(!repo.repo_status().unwrap().open_changes);
    }

    #[test]
    fn test_open_changes_are_stashed_on_top_of_existing_entry() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let repo = FakeRepository::new("main");
        repo.set_stash_size(1);
        repo.set_open_changes(true);
        let ctx = RunContext::new(&repo);

        let options = WrapOptions::for_repository(&repo, false, true).unwrap();
        assert!(options.stash_open_changes);
        let mut program = Program::from(vec![Opcode::from(Fetch)]);
        program.wrap(&options);

        let mut state = RunState::begin("sync", program, &repo, false).unwrap();
        execute(&mut state, &ctx, &store, Path::new("/repo")).unwrap();
        assert_eq!(
            repo.commands(),
            vec![
                "git stash push --include-untracked".to_string(),
                "git fetch --prune --tags".to_string(),
                "git stash pop".to_string(),
            ]
        );
        assert_eq!(repo.stash_size().unwrap(), StashSize(1));
        assert!(repo.repo_status().unwrap().open_changes);
    }

    #[test]
    fn test_stashing_disabled_by_setting() {
        let repo = FakeRepository::new("main");
        repo.set_open_changes(true);
        let options = WrapOptions::for_repository(&repo, true, false).unwrap();
        assert!(!options.stash_open_changes);
        assert!(options.dry_run);
    }

    #[test]
    fn test_prepend_program_keeps_order() {
        let mut program = Program::from(vec![Opcode::from(Fetch)]);
        program.prepend_program(Program::from(vec![
            Opcode::from(Checkout {
                branch: "a".into(),
            }),
            Opcode::from(rebase("origin/a")),
        ]));
        assert_eq!(names(&program), vec!["Checkout", "RebaseBranch", "Fetch"]);
    }

    #[test]
    fn test_skip_current_branch() {
        let mut program = Program::new();
        program.add(rebase("origin/feature"));
        program.add(PushCurrentBranch {
            branch: "feature".into(),
            force_with_lease: false,
            set_upstream: false,
        });
        program.add(EndOfBranchProgram);
        program.add(Checkout {
            branch: "other".into(),
        });
        program.add(RestoreOpenChanges);

        program.skip_current_branch();
        assert_eq!(names(&program), vec!["Checkout", "RestoreOpenChanges"]);
    }

    #[test]
    fn test_skip_keeps_housekeeping_without_marker() {
        let mut program = Program::new();
        program.add(rebase("origin/feature"));
        program.add(RestoreOpenChanges);
        program.skip_current_branch();
        assert_eq!(names(&program), vec!["RestoreOpenChanges"]);
    }
}
