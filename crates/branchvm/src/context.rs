//! Execution context and provider traits
//!
//! These traits allow the engine to run without depending on a specific
//! git invocation strategy or hosting platform client.

use crate::error::{Error, Result};
use crate::types::{
    BranchesSnapshot, ConfigSnapshot, LocalBranchName, Proposal, RepoStatus, Sha, StashSize,
};

/// Access to the version-controlled working copy
///
/// Query methods never change the repository. All mutations go through
/// [`Repository::git`], so a test double only has to interpret git
/// command lines.
pub trait Repository {
    /// Branch currently checked out (the branch being rebased during a rebase)
    fn current_branch(&self) -> Result<LocalBranchName>;

    /// Branch that `git checkout -` would switch to
    fn previously_checked_out_branch(&self) -> Option<LocalBranchName>;

    /// Resolve a ref to a commit, `None` if it doesn't exist
    fn sha_of(&self, reference: &str) -> Result<Option<Sha>>;

    fn repo_status(&self) -> Result<RepoStatus>;

    fn stash_size(&self) -> Result<StashSize>;

    fn branches_snapshot(&self) -> Result<BranchesSnapshot>;

    fn config_snapshot(&self) -> Result<ConfigSnapshot>;

    /// Read a single local git config value
    fn config_value(&self, key: &str) -> Result<Option<String>>;

    /// Run a mutating git command
    fn git(&self, args: &[&str]) -> Result<()>;

    /// Whether a local branch exists
    fn has_local_branch(&self, branch: &LocalBranchName) -> Result<bool> {
        Ok(self
            .sha_of(&format!("refs/heads/{branch}"))?
            .is_some())
    }
}

/// Client for a code hosting platform's proposal API
pub trait Connector {
    /// Look up a proposal by number
    fn proposal(&self, number: u64) -> Result<Proposal>;

    /// Open proposals whose target is the given branch
    fn proposals_targeting(&self, branch: &LocalBranchName) -> Result<Vec<Proposal>>;

    /// Change the branch a proposal merges into
    fn update_proposal_target(&self, number: u64, target: &LocalBranchName) -> Result<()>;
}

/// Context passed to opcodes
pub struct RunContext<'a> {
    pub repo: &'a dyn Repository,
    /// Absent when no hosting integration is configured
    pub connector: Option<&'a dyn Connector>,
    /// Whether this is a dry run
    pub dry_run: bool,
}

impl<'a> RunContext<'a> {
    /// Create a context without hosting integration
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self {
            repo,
            connector: None,
            dry_run: false,
        }
    }

    /// Create a context with a hosting connector
    pub fn with_connector(repo: &'a dyn Repository, connector: &'a dyn Connector) -> Self {
        Self {
            repo,
            connector: Some(connector),
            dry_run: false,
        }
    }

    /// Get the connector, or error if not configured
    pub fn require_connector(&self) -> Result<&'a dyn Connector> {
        self.connector.ok_or(Error::HostingNotConfigured)
    }
}
