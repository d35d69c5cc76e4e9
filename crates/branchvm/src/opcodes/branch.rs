//! Opcodes that move between, create and remove local branches

use super::{Instruction, Opcode};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::types::{LocalBranchName, Sha};
use serde::{Deserialize, Serialize};

/// Check out the given branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub branch: LocalBranchName,
}

impl Instruction for Checkout {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if ctx.repo.current_branch()? == self.branch {
            return Ok(());
        }
        ctx.repo.git(&["checkout", self.branch.as_str()])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        let current = ctx.repo.current_branch()?;
        if current == self.branch {
            return Ok(Vec::new());
        }
        Ok(vec![Checkout { branch: current }.into()])
    }

    fn is_automatically_undoable(&self) -> bool {
        true
    }

    fn automatic_undo_message(&self) -> String {
        format!("cannot check out branch {}", self.branch)
    }
}

/// Create a local branch at the given starting point without checking it out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBranch {
    pub branch: LocalBranchName,
    /// Branch name or commit the new branch starts at
    pub starting_point: String,
}

impl Instruction for CreateBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo
            .git(&["branch", self.branch.as_str(), &self.starting_point])
    }

    fn undo_program(&self, _ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        Ok(vec![
            DeleteLocalBranch {
                branch: self.branch.clone(),
            }
            .into(),
        ])
    }

    fn is_automatically_undoable(&self) -> bool {
        true
    }

    fn automatic_undo_message(&self) -> String {
        format!("cannot create branch {}", self.branch)
    }
}

/// Force-delete a local branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLocalBranch {
    pub branch: LocalBranchName,
}

impl Instruction for DeleteLocalBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["branch", "-D", self.branch.as_str()])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        let sha = ctx.repo.sha_of(&format!("refs/heads/{}", self.branch))?;
        Ok(sha
            .map(|sha| {
                Opcode::from(CreateBranch {
                    branch: self.branch.clone(),
                    starting_point: sha.to_string(),
                })
            })
            .into_iter()
            .collect())
    }
}

/// Point the current branch at the given commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCurrentBranchToSha {
    pub sha: Sha,
    /// Discard working copy changes too
    pub hard: bool,
}

impl Instruction for ResetCurrentBranchToSha {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let mode = if self.hard { "--hard" } else { "--soft" };
        ctx.repo.git(&["reset", mode, self.sha.as_str()])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        let head = ctx
            .repo
            .sha_of("HEAD")?
            .ok_or_else(|| Error::InvalidInput("HEAD does not point to a commit".to_string()))?;
        if head == self.sha {
            return Ok(Vec::new());
        }
        Ok(vec![
            ResetCurrentBranchToSha {
                sha: head,
                hard: self.hard,
            }
            .into(),
        ])
    }
}

/// Make `git checkout -` return to the branch the user started on
///
/// Workflows hop between branches. Without this step the user's
/// "previous branch" would be whatever the workflow visited last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreserveCheckoutHistory {
    pub previous_branch: Option<LocalBranchName>,
}

impl Instruction for PreserveCheckoutHistory {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let Some(previous) = &self.previous_branch else {
            return Ok(());
        };
        if ctx.repo.previously_checked_out_branch().as_ref() == Some(previous) {
            return Ok(());
        }
        if !ctx.repo.has_local_branch(previous)? {
            log::debug!("Previous branch {previous} no longer exists");
            return Ok(());
        }
        let current = ctx.repo.current_branch()?;
        if &current == previous {
            return Ok(());
        }
        ctx.repo.git(&["checkout", "--quiet", previous.as_str()])?;
        ctx.repo.git(&["checkout", "--quiet", current.as_str()])
    }

    fn is_housekeeping(&self) -> bool {
        true
    }
}

/// Boundary between the opcodes of two branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfBranchProgram;

impl Instruction for EndOfBranchProgram {
    fn run(&self, _ctx: &RunContext<'_>) -> Result<()> {
        Ok(())
    }

    fn ends_branch(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Repository;
    use crate::testing::FakeRepository;

    #[test]
    fn test_checkout_same_branch_is_noop() {
        let repo = FakeRepository::new("main");
        let ctx = RunContext::new(&repo);
        let op = Checkout {
            branch: "main".into(),
        };
        assert!(op.undo_program(&ctx).unwrap().is_empty());
        op.run(&ctx).unwrap();
        assert!(repo.commands().is_empty());
    }

    #[test]
    fn test_checkout_undo_returns_to_current() {
        let repo = FakeRepository::new("main");
        repo.add_branch("feature", "222222");
        let ctx = RunContext::new(&repo);
        let op = Checkout {
            branch: "feature".into(),
        };
        let undo = op.undo_program(&ctx).unwrap();
        op.run(&ctx).unwrap();
        assert_eq!(
            undo,
            vec![Opcode::from(Checkout {
                branch: "main".into()
            })]
        );
        assert_eq!(repo.current(), "feature");
    }

    #[test]
    fn test_delete_branch_undo_recreates_at_sha() {
        let repo = FakeRepository::new("main");
        repo.add_branch("old", "abc123");
        let ctx = RunContext::new(&repo);
        let undo = DeleteLocalBranch {
            branch: "old".into(),
        }
        .undo_program(&ctx)
        .unwrap();
        assert_eq!(
            undo,
            vec![Opcode::from(CreateBranch {
                branch: "old".into(),
                starting_point: "abc123".to_string(),
            })]
        );
    }

    #[test]
    fn test_preserve_checkout_history() {
        let repo = FakeRepository::new("main");
        repo.add_branch("feature", "222222");
        let ctx = RunContext::new(&repo);
        PreserveCheckoutHistory {
            previous_branch: Some("feature".into()),
        }
        .run(&ctx)
        .unwrap();
        assert_eq!(
            repo.commands(),
            vec![
                "git checkout --quiet feature".to_string(),
                "git checkout --quiet main".to_string(),
            ]
        );
        assert_eq!(
            repo.previously_checked_out_branch(),
            Some(LocalBranchName::from("feature"))
        );
    }
}
