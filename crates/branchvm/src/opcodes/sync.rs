//! Opcodes that exchange commits with other branches and the remote

use super::{Instruction, Opcode, ResetCurrentBranchToSha};
use crate::context::RunContext;
use crate::error::Result;
use crate::types::{LocalBranchName, Sha};
use serde::{Deserialize, Serialize};

/// Undo for history-rewriting steps: reset to the pre-step HEAD
fn reset_to_head(ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
    Ok(ctx
        .repo
        .sha_of("HEAD")?
        .map(|sha| Opcode::from(ResetCurrentBranchToSha { sha, hard: true }))
        .into_iter()
        .collect())
}

/// Undo for steps that change a branch at `origin`
fn restore_remote(ctx: &RunContext<'_>, branch: &LocalBranchName) -> Result<Vec<Opcode>> {
    let opcode = match ctx.repo.sha_of(&branch.at_remote())? {
        Some(sha) => Opcode::from(ResetRemoteBranchToSha {
            branch: branch.clone(),
            sha,
        }),
        None => Opcode::from(DeleteTrackingBranch {
            branch: branch.clone(),
        }),
    };
    Ok(vec![opcode])
}

/// Fetch all updates from `origin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fetch;

impl Instruction for Fetch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["fetch", "--prune", "--tags"])
    }
}

/// Rebase the current branch onto the given ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseBranch {
    /// Ref to rebase onto, e.g. `origin/feature`
    pub onto: String,
}

impl Instruction for RebaseBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["rebase", &self.onto])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        reset_to_head(ctx)
    }

    fn abort_program(&self) -> Vec<Opcode> {
        vec![RebaseAbort.into()]
    }

    fn continue_program(&self) -> Vec<Opcode> {
        vec![RebaseContinue.into()]
    }

    fn is_skippable(&self) -> bool {
        true
    }

    fn is_continuable_after_conflict(&self) -> bool {
        true
    }
}

/// Cancel the rebase in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseAbort;

impl Instruction for RebaseAbort {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["rebase", "--abort"])
    }
}

/// Finish a rebase after the user resolved its conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseContinue;

impl Instruction for RebaseContinue {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if !ctx.repo.repo_status()?.rebase_in_progress {
            return Ok(());
        }
        ctx.repo
            .git(&["-c", "core.editor=true", "rebase", "--continue"])
    }

    fn abort_program(&self) -> Vec<Opcode> {
        vec![RebaseAbort.into()]
    }

    fn continue_program(&self) -> Vec<Opcode> {
        vec![RebaseContinue.into()]
    }

    fn is_skippable(&self) -> bool {
        true
    }

    fn is_continuable_after_conflict(&self) -> bool {
        true
    }
}

/// Merge the given ref into the current branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeBranch {
    pub branch: String,
    /// Refuse anything but a fast-forward
    #[serde(default)]
    pub ff_only: bool,
}

impl Instruction for MergeBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if self.ff_only {
            ctx.repo.git(&["merge", "--ff-only", &self.branch])
        } else {
            ctx.repo.git(&["merge", "--no-edit", &self.branch])
        }
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        reset_to_head(ctx)
    }

    fn abort_program(&self) -> Vec<Opcode> {
        vec![MergeAbort.into()]
    }

    fn continue_program(&self) -> Vec<Opcode> {
        vec![MergeContinue.into()]
    }

    fn is_skippable(&self) -> bool {
        true
    }

    fn is_continuable_after_conflict(&self) -> bool {
        true
    }
}

/// Cancel the merge in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAbort;

impl Instruction for MergeAbort {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["merge", "--abort"])
    }
}

/// Commit a merge after the user resolved its conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeContinue;

impl Instruction for MergeContinue {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if !ctx.repo.repo_status()?.merge_in_progress {
            return Ok(());
        }
        ctx.repo
            .git(&["-c", "core.editor=true", "commit", "--no-edit"])
    }

    fn abort_program(&self) -> Vec<Opcode> {
        vec![MergeAbort.into()]
    }

    fn is_skippable(&self) -> bool {
        true
    }

    fn is_continuable_after_conflict(&self) -> bool {
        true
    }
}

/// Push the given branch to `origin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCurrentBranch {
    pub branch: LocalBranchName,
    /// Overwrite rewritten history, failing if the remote moved meanwhile
    #[serde(default)]
    pub force_with_lease: bool,
    /// Create the tracking relationship
    #[serde(default)]
    pub set_upstream: bool,
}

impl Instruction for PushCurrentBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let mut args = vec!["push"];
        if self.force_with_lease {
            args.push("--force-with-lease");
        }
        if self.set_upstream {
            args.push("-u");
        }
        args.push("origin");
        args.push(self.branch.as_str());
        ctx.repo.git(&args)
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        restore_remote(ctx, &self.branch)
    }
}

/// Force the branch at `origin` to the given commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRemoteBranchToSha {
    pub branch: LocalBranchName,
    pub sha: Sha,
}

impl Instruction for ResetRemoteBranchToSha {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let refspec = format!("{}:refs/heads/{}", self.sha, self.branch);
        ctx.repo
            .git(&["push", "--force-with-lease", "origin", &refspec])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        restore_remote(ctx, &self.branch)
    }
}

/// Delete the branch at `origin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTrackingBranch {
    pub branch: LocalBranchName,
}

impl Instruction for DeleteTrackingBranch {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo
            .git(&["push", "origin", "--delete", self.branch.as_str()])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        Ok(ctx
            .repo
            .sha_of(&self.branch.at_remote())?
            .map(|sha| {
                Opcode::from(ResetRemoteBranchToSha {
                    branch: self.branch.clone(),
                    sha,
                })
            })
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRepository;

    #[test]
    fn test_rebase_undo_resets_to_previous_head() {
        let repo = FakeRepository::new("feature");
        let ctx = RunContext::new(&repo);
        let op = RebaseBranch {
            onto: "origin/feature".to_string(),
        };
        let undo = op.undo_program(&ctx).unwrap();
        assert_eq!(
            undo,
            vec![Opcode::from(ResetCurrentBranchToSha {
                sha: Sha::new(repo.sha("feature")),
                hard: true,
            })]
        );
        assert_eq!(op.abort_program(), vec![Opcode::from(RebaseAbort)]);
        assert_eq!(op.continue_program(), vec![Opcode::from(RebaseContinue)]);
    }

    #[test]
    fn test_rebase_continue_without_rebase_is_noop() {
        let repo = FakeRepository::new("feature");
        let ctx = RunContext::new(&repo);
        RebaseContinue.run(&ctx).unwrap();
        assert!(repo.commands().is_empty());
    }

    #[test]
    fn test_push_undo_depends_on_remote_state() {
        let repo = FakeRepository::new("feature");
        let ctx = RunContext::new(&repo);
        let push = PushCurrentBranch {
            branch: "feature".into(),
            force_with_lease: false,
            set_upstream: true,
        };
        assert_eq!(
            push.undo_program(&ctx).unwrap(),
            vec![Opcode::from(DeleteTrackingBranch {
                branch: "feature".into()
            })]
        );

        repo.add_remote_branch("feature", "999999");
        assert_eq!(
            push.undo_program(&ctx).unwrap(),
            vec![Opcode::from(ResetRemoteBranchToSha {
                branch: "feature".into(),
                sha: Sha::new("999999"),
            })]
        );
    }

    #[test]
    fn test_push_arguments() {
        let repo = FakeRepository::new("feature");
        let ctx = RunContext::new(&repo);
        PushCurrentBranch {
            branch: "feature".into(),
            force_with_lease: true,
            set_upstream: false,
        }
        .run(&ctx)
        .unwrap();
        assert_eq!(
            repo.commands(),
            vec!["git push --force-with-lease origin feature".to_string()]
        );
    }
}
