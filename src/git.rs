//! Git-backed execution context
//!
//! [`GitRepository`] answers the engine's queries by running git
//! subprocesses in the repository root and performs mutations through
//! [`Repository::git`], echoing each command the way the user would type
//! it. Output parsing lives in small pure functions so it can be tested
//! without a repository.

use crate::config::KEY_GITHUB_TOKEN;
use crate::runner;
use crate::ui;
use anyhow::{Context, Result};
use branchvm::{
    BranchInfo, BranchesSnapshot, ConfigSnapshot, LocalBranchName, RepoStatus, Repository, Sha,
    StashSize,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config keys captured in config snapshots (the token is removed after reading)
const CONFIG_KEYS: &str = r"^(twig\.|branch\..+\.twig-parent$)";

/// Status codes `git status --porcelain` uses for unmerged paths
const UNMERGED_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

pub struct GitRepository {
    root: PathBuf,
    git_dir: PathBuf,
    dry_run: bool,
}

impl GitRepository {
    /// Open the repository containing `cwd`
    pub fn open(cwd: &Path, dry_run: bool) -> Result<Self> {
        let root = runner::run_capture_in(cwd, "git", &["rev-parse", "--show-toplevel"])
            .context("Not inside a git repository")?;
        let root = PathBuf::from(root);
        let git_dir = runner::run_capture_in(&root, "git", &["rev-parse", "--absolute-git-dir"])
            .context("Could not locate the .git directory")?;
        log::debug!("Opened repository at {}", root.display());
        Ok(Self {
            root,
            git_dir: PathBuf::from(git_dir),
            dry_run,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL of the `origin` remote, if configured
    pub fn origin_url(&self) -> Option<String> {
        self.query_optional(&["remote", "get-url", "origin"])
            .ok()
            .flatten()
    }

    fn query(&self, args: &[&str]) -> branchvm::Result<String> {
        log::trace!("git {}", args.join(" "));
        runner::run_capture_in(&self.root, "git", args)
            .map_err(|e| branchvm::Error::command(format!("git {}", args.join(" ")), e.to_string()))
    }

    fn query_optional(&self, args: &[&str]) -> branchvm::Result<Option<String>> {
        log::trace!("git {}", args.join(" "));
        runner::run_optional_in(&self.root, "git", args)
            .map_err(|e| branchvm::Error::command(format!("git {}", args.join(" ")), e.to_string()))
    }

    /// Branch being rebased, read from the rebase state directory
    fn rebasing_branch(&self) -> Option<LocalBranchName> {
        ["rebase-merge", "rebase-apply"].iter().find_map(|dir| {
            let content = std::fs::read_to_string(self.git_dir.join(dir).join("head-name")).ok()?;
            branch_from_head_name(&content)
        })
    }
}

impl Repository for GitRepository {
    fn current_branch(&self) -> branchvm::Result<LocalBranchName> {
        let name = self.query(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if name != "HEAD" {
            return Ok(LocalBranchName::new(name));
        }
        self.rebasing_branch().ok_or_else(|| {
            branchvm::Error::InvalidInput("HEAD is detached and no rebase is in progress".to_string())
        })
    }

    fn previously_checked_out_branch(&self) -> Option<LocalBranchName> {
        self.query_optional(&["rev-parse", "--verify", "--quiet", "--abbrev-ref", "@{-1}"])
            .ok()
            .flatten()
            .filter(|name| !name.is_empty())
            .map(LocalBranchName::new)
    }

    fn sha_of(&self, reference: &str) -> branchvm::Result<Option<Sha>> {
        Ok(self
            .query_optional(&["rev-parse", "--verify", "--quiet", reference])?
            .filter(|sha| !sha.is_empty())
            .map(Sha::new))
    }

    fn repo_status(&self) -> branchvm::Result<RepoStatus> {
        let porcelain = self.query(&["status", "--porcelain"])?;
        let (conflicts, open_changes) = parse_porcelain(&porcelain);
        Ok(RepoStatus {
            conflicts,
            open_changes,
            rebase_in_progress: self.git_dir.join("rebase-merge").exists()
                || self.git_dir.join("rebase-apply").exists(),
            merge_in_progress: self.git_dir.join("MERGE_HEAD").exists(),
        })
    }

    fn stash_size(&self) -> branchvm::Result<StashSize> {
        let list = self.query(&["stash", "list"])?;
        Ok(StashSize(list.lines().filter(|l| !l.trim().is_empty()).count()))
    }

    fn branches_snapshot(&self) -> branchvm::Result<BranchesSnapshot> {
        let refs = self.query(&[
            "for-each-ref",
            "--format=%(refname)\t%(objectname)\t%(upstream)",
            "refs/heads",
            "refs/remotes",
        ])?;
        let active = self
            .current_branch()
            .ok()
            .filter(|name| name.as_str() != "HEAD");
        Ok(parse_branches(&refs, active))
    }

    fn config_snapshot(&self) -> branchvm::Result<ConfigSnapshot> {
        let read = |scope: &str| -> branchvm::Result<BTreeMap<String, String>> {
            let mut entries = self
                .query_optional(&["config", scope, "--get-regexp", CONFIG_KEYS])?
                .map(|out| parse_config_lines(&out))
                .unwrap_or_default();
            entries.remove(KEY_GITHUB_TOKEN);
            Ok(entries)
        };
        Ok(ConfigSnapshot {
            global: read("--global")?,
            local: read("--local")?,
        })
    }

    fn config_value(&self, key: &str) -> branchvm::Result<Option<String>> {
        self.query_optional(&["config", "--local", "--get", key])
    }

    fn git(&self, args: &[&str]) -> branchvm::Result<()> {
        let branch = self.current_branch().ok();
        ui::command(branch.as_ref().map(LocalBranchName::as_str), args);
        if self.dry_run {
            return Ok(());
        }
        let command = format!("git {}", args.join(" "));
        let status = runner::run_in(&self.root, "git", args)
            .map_err(|e| branchvm::Error::command(command.clone(), e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(branchvm::Error::command(command, status.to_string()))
        }
    }
}

// ============================================================================
// Output parsing
// ============================================================================

/// Branch name from the content of a rebase `head-name` file
pub fn branch_from_head_name(content: &str) -> Option<LocalBranchName> {
    content
        .trim()
        .strip_prefix("refs/heads/")
        .filter(|name| !name.is_empty())
        .map(LocalBranchName::new)
}

/// Whether `git status --porcelain` output shows (conflicts, open changes)
pub fn parse_porcelain(output: &str) -> (bool, bool) {
    let mut conflicts = false;
    let mut open_changes = false;
    for line in output.lines().filter(|l| l.len() >= 2) {
        open_changes = true;
        if line.get(..2).is_some_and(|code| UNMERGED_CODES.contains(&code)) {
            conflicts = true;
        }
    }
    (conflicts, open_changes)
}

/// Build a snapshot from `for-each-ref` lines of `refname\tsha\tupstream`
pub fn parse_branches(output: &str, active: Option<LocalBranchName>) -> BranchesSnapshot {
    let mut remote_shas = BTreeMap::new();
    let mut locals = Vec::new();
    for line in output.lines() {
        let mut fields = line.split('\t');
        let (Some(refname), Some(sha)) = (fields.next(), fields.next()) else {
            continue;
        };
        let upstream = fields.next().unwrap_or_default();
        if let Some(remote) = refname.strip_prefix("refs/remotes/") {
            if !remote.ends_with("/HEAD") {
                remote_shas.insert(remote.to_string(), Sha::new(sha));
            }
        } else if let Some(name) = refname.strip_prefix("refs/heads/") {
            let tracking = upstream
                .strip_prefix("refs/remotes/")
                .map(ToString::to_string);
            locals.push((LocalBranchName::new(name), Sha::new(sha), tracking));
        }
    }

    let branches = locals
        .into_iter()
        .map(|(name, sha, tracking)| BranchInfo {
            tracking_sha: tracking.as_ref().and_then(|t| remote_shas.get(t).cloned()),
            name,
            local_sha: Some(sha),
            tracking,
        })
        .collect();
    BranchesSnapshot { active, branches }
}

/// Parse `git config --get-regexp` output into key/value pairs
pub fn parse_config_lines(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| match line.split_once(' ') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_from_head_name() {
        assert_eq!(
            branch_from_head_name("refs/heads/feature/login\n"),
            Some(LocalBranchName::from("feature/login"))
        );
        assert_eq!(branch_from_head_name("detached HEAD"), None);
        assert_eq!(branch_from_head_name("refs/heads/"), None);
    }

    #[test]
    fn test_parse_porcelain_clean() {
        assert_eq!(parse_porcelain(""), (false, false));
    }

    #[test]
    fn test_parse_porcelain_open_changes() {
        assert_eq!(parse_porcelain(" M src/lib.rs\n?? notes.txt"), (false, true));
    }

    #[test]
    fn test_parse_porcelain_conflicts() {
        assert_eq!(parse_porcelain("UU README.md\nM  other.rs"), (true, true));
        assert_eq!(parse_porcelain("AA both-added.txt"), (true, true));
    }

    #[test]
    fn test_parse_branches() {
        let output = "refs/heads/feature\taaa111\trefs/remotes/origin/feature\n\
                      refs/heads/local-only\tbbb222\t\n\
                      refs/heads/main\tccc333\trefs/remotes/origin/main\n\
                      refs/remotes/origin/HEAD\tccc333\t\n\
                      refs/remotes/origin/feature\tddd444\t\n\
                      refs/remotes/origin/main\tccc333\t";
        let snapshot = parse_branches(output, Some("feature".into()));

        assert_eq!(snapshot.active, Some("feature".into()));
        assert_eq!(snapshot.branches.len(), 3);

        let feature = snapshot.find(&"feature".into()).unwrap();
        assert_eq!(feature.local_sha, Some(Sha::new("aaa111")));
        assert_eq!(feature.tracking.as_deref(), Some("origin/feature"));
        assert_eq!(feature.tracking_sha, Some(Sha::new("ddd444")));

        let local_only = snapshot.find(&"local-only".into()).unwrap();
        assert!(!local_only.has_tracking_branch());
        assert_eq!(local_only.tracking_sha, None);
    }

    #[test]
    fn test_parse_branches_upstream_without_remote_ref() {
        let output = "refs/heads/gone\taaa111\trefs/remotes/origin/gone";
        let snapshot = parse_branches(output, None);
        let gone = snapshot.find(&"gone".into()).unwrap();
        assert_eq!(gone.tracking.as_deref(), Some("origin/gone"));
        assert_eq!(gone.tracking_sha, None);
    }

    #[test]
    fn test_parse_config_lines() {
        let parsed = parse_config_lines(
            "twig.main-branch main\nbranch.feature.twig-parent main\ntwig.flag\n",
        );
        assert_eq!(parsed.get("twig.main-branch").map(String::as_str), Some("main"));
        assert_eq!(
            parsed.get("branch.feature.twig-parent").map(String::as_str),
            Some("main")
        );
        assert_eq!(parsed.get("twig.flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_open_real_repository() {
        if !runner::command_exists("git") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        for args in [
            vec!["init", "--quiet", "--initial-branch=main"],
            vec!["config", "user.email", "twig@example.com"],
            vec!["config", "user.name", "twig"],
            vec!["commit", "--quiet", "--allow-empty", "-m", "initial"],
        ] {
            runner::run_capture_in(path, "git", &args).unwrap();
        }

        let repo = GitRepository::open(path, false).unwrap();
        assert_eq!(repo.current_branch().unwrap(), LocalBranchName::from("main"));
        assert!(repo.sha_of("HEAD").unwrap().is_some());
        assert!(repo.sha_of("refs/heads/missing").unwrap().is_none());
        assert_eq!(repo.stash_size().unwrap(), StashSize(0));
        assert_eq!(repo.repo_status().unwrap(), RepoStatus::default());
        assert_eq!(repo.origin_url(), None);

        repo.git(&["config", "twig.main-branch", "main"]).unwrap();
        assert_eq!(
            repo.config_value("twig.main-branch").unwrap().as_deref(),
            Some("main")
        );
        let snapshot = repo.config_snapshot().unwrap();
        assert_eq!(
            snapshot.local.get("twig.main-branch").map(String::as_str),
            Some("main")
        );
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        if !runner::command_exists("git") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        runner::run_capture_in(dir.path(), "git", &["init", "--quiet"]).unwrap();
        let repo = GitRepository::open(dir.path(), true).unwrap();
        repo.git(&["config", "twig.dry", "yes"]).unwrap();
        assert_eq!(repo.config_value("twig.dry").unwrap(), None);
    }
}
