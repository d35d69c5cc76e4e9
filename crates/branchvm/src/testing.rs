//! In-memory doubles for testing workflows without git or network access
//!
//! [`FakeRepository`] interprets the git command lines opcodes produce
//! and keeps just enough state (branches, remote branches, stash,
//! conflicts, config) for the engine to observe their effects.
//! [`FakeConnector`] holds proposals in memory.
//!
//! ```
//! use branchvm::testing::FakeRepository;
//! use branchvm::{Checkout, Program, RunContext};
//!
//! let repo = FakeRepository::new("main");
//! repo.add_branch("feature", "222222");
//! let mut program = Program::new();
//! program.add(Checkout { branch: "feature".into() });
//! let ctx = RunContext::new(&repo);
//! for opcode in program.iter() {
//!     opcode.run(&ctx).unwrap();
//! }
//! assert_eq!(repo.current(), "feature");
//! ```

use crate::context::{Connector, Repository};
use crate::error::{Error, Result};
use crate::types::{
    BranchInfo, BranchesSnapshot, ConfigSnapshot, LocalBranchName, Proposal, RepoStatus, Sha,
    StashSize,
};
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Debug)]
struct ScriptedFailure {
    prefix: String,
    conflict: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    current: String,
    previous: Option<String>,
    branches: BTreeMap<String, String>,
    remotes: BTreeMap<String, String>,
    config: BTreeMap<String, String>,
    status: RepoStatus,
    stash: usize,
    commands: Vec<String>,
    failures: Vec<ScriptedFailure>,
    commits: usize,
}

impl FakeState {
    fn new_sha(&mut self) -> String {
        self.commits += 1;
        format!("c{:05}", self.commits)
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        if reference == "HEAD" {
            return self.branches.get(&self.current).cloned();
        }
        if let Some(name) = reference.strip_prefix("refs/heads/") {
            return self.branches.get(name).cloned();
        }
        if let Some(name) = reference.strip_prefix("origin/") {
            return self.remotes.get(name).cloned();
        }
        self.branches.get(reference).cloned()
    }

    fn advance_current(&mut self) {
        let sha = self.new_sha();
        let current = self.current.clone();
        self.branches.insert(current, sha);
    }

    fn apply(&mut self, command: &str, args: &[&str]) -> Result<()> {
        match args {
            ["checkout", "--quiet", branch] | ["checkout", branch] => {
                if !self.branches.contains_key(*branch) {
                    return Err(Error::command(command, "no such branch"));
                }
                let previous = std::mem::replace(&mut self.current, (*branch).to_string());
                self.previous = Some(previous);
            }
            ["branch", "-D", branch] => {
                if *branch == self.current {
                    return Err(Error::command(command, "cannot delete checked out branch"));
                }
                self.branches.remove(*branch);
            }
            ["branch", branch, start] => {
                let sha = self
                    .resolve(start)
                    .unwrap_or_else(|| (*start).to_string());
                self.branches.insert((*branch).to_string(), sha);
            }
            ["reset", _, sha] => {
                let current = self.current.clone();
                self.branches.insert(current, (*sha).to_string());
            }
            ["rebase", "--abort"] => {
                self.status.rebase_in_progress = false;
                self.status.conflicts = false;
            }
            ["-c", _, "rebase", "--continue"] => {
                self.status.rebase_in_progress = false;
                self.status.conflicts = false;
                self.advance_current();
            }
            ["merge", "--abort"] => {
                self.status.merge_in_progress = false;
                self.status.conflicts = false;
            }
            ["-c", _, "commit", ..] => {
                self.status.merge_in_progress = false;
                self.status.conflicts = false;
                self.advance_current();
            }
            ["rebase", _] | ["merge", ..] => self.advance_current(),
            ["stash", "push", ..] => {
                self.stash += 1;
                self.status.open_changes = false;
            }
            ["stash", "pop"] => {
                if self.stash == 0 {
                    return Err(Error::command(command, "no stash entries found"));
                }
                self.stash -= 1;
                self.status.open_changes = true;
            }
            ["push", rest @ ..] => {
                let target = rest.last().copied().unwrap_or_default();
                if rest.contains(&"--delete") {
                    self.remotes.remove(target);
                } else if let Some((sha, branch)) = target.split_once(":refs/heads/") {
                    self.remotes.insert(branch.to_string(), sha.to_string());
                } else if let Some(sha) = self.branches.get(target).cloned() {
                    self.remotes.insert(target.to_string(), sha);
                }
            }
            ["config", "--unset", key] => {
                self.config.remove(*key);
            }
            ["config", key, value] => {
                self.config.insert((*key).to_string(), (*value).to_string());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Scriptable in-memory repository
#[derive(Debug, Default)]
pub struct FakeRepository {
    state: RefCell<FakeState>,
}

impl FakeRepository {
    /// Create a repository with a single branch checked out
    pub fn new(current: &str) -> Self {
        let repo = Self::default();
        {
            let mut state = repo.state.borrow_mut();
            state.current = current.to_string();
            let sha = state.new_sha();
            state.branches.insert(current.to_string(), sha);
        }
        repo
    }

    pub fn add_branch(&self, name: &str, sha: &str) {
        self.state
            .borrow_mut()
            .branches
            .insert(name.to_string(), sha.to_string());
    }

    /// Add `origin/<name>` at the given commit
    pub fn add_remote_branch(&self, name: &str, sha: &str) {
        self.state
            .borrow_mut()
            .remotes
            .insert(name.to_string(), sha.to_string());
    }

    pub fn set_open_changes(&self, open: bool) {
        self.state.borrow_mut().status.open_changes = open;
    }

    /// Pretend the user already has `size` stash entries
    pub fn set_stash_size(&self, size: usize) {
        self.state.borrow_mut().stash = size;
    }

    pub fn set_conflicts(&self, conflicts: bool) {
        self.state.borrow_mut().status.conflicts = conflicts;
    }

    pub fn set_rebase_in_progress(&self, in_progress: bool) {
        self.state.borrow_mut().status.rebase_in_progress = in_progress;
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .config
            .insert(key.to_string(), value.to_string());
    }

    /// Make the next command starting with `prefix` fail
    pub fn fail_on(&self, prefix: &str) {
        self.state.borrow_mut().failures.push(ScriptedFailure {
            prefix: prefix.to_string(),
            conflict: false,
        });
    }

    /// Make the next command starting with `prefix` stop with a conflict
    pub fn conflict_on(&self, prefix: &str) {
        self.state.borrow_mut().failures.push(ScriptedFailure {
            prefix: prefix.to_string(),
            conflict: true,
        });
    }

    /// Every git command run so far, as `git <args>`
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    pub fn current(&self) -> String {
        self.state.borrow().current.clone()
    }

    /// Commit the given local branch points to, empty if it doesn't exist
    pub fn sha(&self, branch: &str) -> String {
        self.state
            .borrow()
            .branches
            .get(branch)
            .cloned()
            .unwrap_or_default()
    }
}

impl Repository for FakeRepository {
    fn current_branch(&self) -> Result<LocalBranchName> {
        Ok(LocalBranchName::new(self.state.borrow().current.clone()))
    }

    fn previously_checked_out_branch(&self) -> Option<LocalBranchName> {
        self.state
            .borrow()
            .previous
            .clone()
            .map(LocalBranchName::new)
    }

    fn sha_of(&self, reference: &str) -> Result<Option<Sha>> {
        Ok(self.state.borrow().resolve(reference).map(Sha::new))
    }

    fn repo_status(&self) -> Result<RepoStatus> {
        Ok(self.state.borrow().status)
    }

    fn stash_size(&self) -> Result<StashSize> {
        Ok(StashSize(self.state.borrow().stash))
    }

    fn branches_snapshot(&self) -> Result<BranchesSnapshot> {
        let state = self.state.borrow();
        let branches = state
            .branches
            .iter()
            .map(|(name, sha)| {
                let tracking_sha = state.remotes.get(name).map(Sha::new);
                BranchInfo {
                    name: LocalBranchName::new(name.clone()),
                    local_sha: Some(Sha::new(sha.clone())),
                    tracking: tracking_sha.as_ref().map(|_| format!("origin/{name}")),
                    tracking_sha,
                }
            })
            .collect();
        Ok(BranchesSnapshot {
            active: Some(LocalBranchName::new(state.current.clone())),
            branches,
        })
    }

    fn config_snapshot(&self) -> Result<ConfigSnapshot> {
        Ok(ConfigSnapshot {
            global: BTreeMap::new(),
            local: self.state.borrow().config.clone(),
        })
    }

    fn config_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().config.get(key).cloned())
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let command = format!("git {}", args.join(" "));
        let mut state = self.state.borrow_mut();
        state.commands.push(command.clone());

        if let Some(index) = state
            .failures
            .iter()
            .position(|f| command.starts_with(&f.prefix))
        {
            let failure = state.failures.remove(index);
            if failure.conflict {
                state.status.conflicts = true;
                match args.first() {
                    Some(&"rebase") => state.status.rebase_in_progress = true,
                    Some(&"merge") => state.status.merge_in_progress = true,
                    _ => {}
                }
            }
            return Err(Error::command(command, "exit status: 1"));
        }

        state.apply(&command, args)
    }
}

/// In-memory hosting connector
#[derive(Debug, Default)]
pub struct FakeConnector {
    proposals: RefCell<BTreeMap<u64, Proposal>>,
    failing_updates: RefCell<Vec<u64>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_proposal(&self, number: u64, source: &str, target: &str) {
        self.proposals.borrow_mut().insert(
            number,
            Proposal {
                number,
                title: format!("Proposal {number}"),
                source: source.into(),
                target: target.into(),
                url: format!("https://example.com/pull/{number}"),
            },
        );
    }

    /// Make updates of the given proposal fail
    pub fn fail_updates_of(&self, number: u64) {
        self.failing_updates.borrow_mut().push(number);
    }

    pub fn target_of(&self, number: u64) -> Option<LocalBranchName> {
        self.proposals
            .borrow()
            .get(&number)
            .map(|p| p.target.clone())
    }
}

impl Connector for FakeConnector {
    fn proposal(&self, number: u64) -> Result<Proposal> {
        self.proposals
            .borrow()
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::Hosting(format!("proposal #{number} not found")))
    }

    fn proposals_targeting(&self, branch: &LocalBranchName) -> Result<Vec<Proposal>> {
        Ok(self
            .proposals
            .borrow()
            .values()
            .filter(|p| &p.target == branch)
            .cloned()
            .collect())
    }

    fn update_proposal_target(&self, number: u64, target: &LocalBranchName) -> Result<()> {
        if self.failing_updates.borrow().contains(&number) {
            return Err(Error::Hosting(format!("HTTP 422 updating proposal #{number}")));
        }
        let mut proposals = self.proposals.borrow_mut();
        let proposal = proposals
            .get_mut(&number)
            .ok_or_else(|| Error::Hosting(format!("proposal #{number} not found")))?;
        proposal.target = target.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_conflict_marks_rebase_in_progress() {
        let repo = FakeRepository::new("feature");
        repo.conflict_on("git rebase origin/feature");
        assert!(repo.git(&["rebase", "origin/feature"]).is_err());
        let status = repo.repo_status().unwrap();
        assert!(status.conflicts);
        assert!(status.rebase_in_progress);

        // failures are one-shot
        repo.git(&["rebase", "--abort"]).unwrap();
        repo.git(&["rebase", "origin/feature"]).unwrap();
        assert!(!repo.repo_status().unwrap().conflicts);
    }

    #[test]
    fn test_snapshot_reports_tracking() {
        let repo = FakeRepository::new("main");
        repo.add_remote_branch("main", "c00001");
        let snapshot = repo.branches_snapshot().unwrap();
        let main = snapshot.find(&"main".into()).unwrap();
        assert_eq!(main.tracking.as_deref(), Some("origin/main"));
        assert_eq!(main.local_sha, main.tracking_sha);
    }

    #[test]
    fn test_connector_update() {
        let connector = FakeConnector::new();
        connector.add_proposal(3, "child", "parent");
        connector
            .update_proposal_target(3, &"main".into())
            .unwrap();
        assert_eq!(connector.target_of(3), Some("main".into()));
        assert_eq!(
            connector.proposals_targeting(&"main".into()).unwrap().len(),
            1
        );
    }
}
