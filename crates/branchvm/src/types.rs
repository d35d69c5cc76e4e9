//! Core types for branch workflows

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of a local branch, e.g. `feature`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalBranchName(String);

impl LocalBranchName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The branch of the same name at `origin`
    pub fn at_remote(&self) -> String {
        format!("origin/{}", self.0)
    }
}

impl fmt::Display for LocalBranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalBranchName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A commit id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

impl Sha {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local branch and its tracking counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: LocalBranchName,
    pub local_sha: Option<Sha>,
    /// Tracking ref, e.g. `origin/feature`
    pub tracking: Option<String>,
    pub tracking_sha: Option<Sha>,
}

impl BranchInfo {
    pub fn has_tracking_branch(&self) -> bool {
        self.tracking.is_some()
    }
}

/// State of all branches at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchesSnapshot {
    /// Checked out branch, if any
    pub active: Option<LocalBranchName>,
    pub branches: Vec<BranchInfo>,
}

impl BranchesSnapshot {
    pub fn find(&self, name: &LocalBranchName) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| &b.name == name)
    }

    pub fn local_branch_names(&self) -> Vec<LocalBranchName> {
        self.branches.iter().map(|b| b.name.clone()).collect()
    }
}

/// Git configuration entries at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub global: BTreeMap<String, String>,
    #[serde(default)]
    pub local: BTreeMap<String, String>,
}

/// Number of entries on the stash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StashSize(pub usize);

impl fmt::Display for StashSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Working copy status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStatus {
    /// Unmerged paths are present
    pub conflicts: bool,
    /// Uncommitted changes are present
    pub open_changes: bool,
    pub rebase_in_progress: bool,
    pub merge_in_progress: bool,
}

impl RepoStatus {
    /// Whether git is in the middle of a rebase or merge
    pub fn operation_in_progress(&self) -> bool {
        self.rebase_in_progress || self.merge_in_progress
    }
}

/// A change proposal (pull request) at the code hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub number: u64,
    pub title: String,
    pub source: LocalBranchName,
    pub target: LocalBranchName,
    pub url: String,
}
