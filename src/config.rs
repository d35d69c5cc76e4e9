use crate::paths;
use anyhow::{Context, Result};
use branchvm::{ConfigSnapshot, LocalBranchName, Repository};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Git config key naming the main branch
pub const KEY_MAIN_BRANCH: &str = "twig.main-branch";
/// Git config key enabling pushes of branches without a tracking branch
pub const KEY_PUSH_NEW_BRANCHES: &str = "twig.push-new-branches";
/// Git config key holding the hosting API token
pub const KEY_GITHUB_TOKEN: &str = "twig.github-token";
/// Environment variable holding the hosting API token
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Git config key recording a branch's parent
pub fn parent_key(branch: &LocalBranchName) -> String {
    format!("branch.{branch}.twig-parent")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has value {value:?}, expected true or false")]
    InvalidBool { key: String, value: String },

    #[error(
        "cannot determine the main branch, set it with `git config {KEY_MAIN_BRANCH} <branch>`"
    )]
    UnknownMainBranch,
}

/// Parse a boolean the way git config spells it
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// User Config (config.toml)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_branch: Option<String>,
    #[serde(default)]
    pub push_new_branches: bool,
    /// Stash uncommitted changes around every workflow
    #[serde(default = "default_true")]
    pub stash_open_changes: bool,
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// API base for GitHub Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            main_branch: None,
            push_new_branches: false,
            stash_open_changes: true,
            github: GitHubConfig::default(),
        }
    }
}

impl UserConfig {
    /// Path of config.toml in the config directory
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join("config.toml"))
    }

    /// Load config.toml, defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Settings for one repository: git config overrides config.toml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub main_branch: LocalBranchName,
    pub push_new_branches: bool,
    pub stash_open_changes: bool,
    pub github_token: Option<String>,
    pub github_api_base: Option<String>,
}

impl Settings {
    pub fn resolve(
        repo: &dyn Repository,
        user: &UserConfig,
        env_token: Option<String>,
    ) -> Result<Self> {
        let config = repo.config_snapshot()?;
        let main_branch = match effective(&config, KEY_MAIN_BRANCH) {
            Some(branch) if !branch.trim().is_empty() => LocalBranchName::new(branch.trim()),
            _ => match &user.main_branch {
                Some(branch) => LocalBranchName::new(branch.as_str()),
                None => detect_main_branch(repo)?,
            },
        };

        let push_new_branches = match effective(&config, KEY_PUSH_NEW_BRANCHES) {
            Some(value) => parse_bool(KEY_PUSH_NEW_BRANCHES, &value)?,
            None => user.push_new_branches,
        };

        let github_token = resolve_token(repo, user, env_token)?;

        log::debug!("Main branch: {main_branch}, push new branches: {push_new_branches}");
        Ok(Self {
            main_branch,
            push_new_branches,
            stash_open_changes: user.stash_open_changes,
            github_token,
            github_api_base: user.github.api_base.clone(),
        })
    }
}

/// Value of `key`, repository config overriding global config
fn effective(config: &ConfigSnapshot, key: &str) -> Option<String> {
    config
        .local
        .get(key)
        .or_else(|| config.global.get(key))
        .cloned()
}

/// Hosting token: repository git config, then `GITHUB_TOKEN`, then config.toml
///
/// Read directly rather than from a config snapshot; snapshots are
/// persisted with run state and never carry the token.
pub fn resolve_token(
    repo: &dyn Repository,
    user: &UserConfig,
    env_token: Option<String>,
) -> Result<Option<String>> {
    Ok(repo
        .config_value(KEY_GITHUB_TOKEN)?
        .or(env_token)
        .or_else(|| user.github.token.clone())
        .filter(|t| !t.trim().is_empty()))
}

/// Fall back to a local `main` or `master` branch
fn detect_main_branch(repo: &dyn Repository) -> Result<LocalBranchName> {
    for candidate in ["main", "master"] {
        let branch = LocalBranchName::from(candidate);
        if repo.has_local_branch(&branch)? {
            return Ok(branch);
        }
    }
    Err(ConfigError::UnknownMainBranch.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchvm::testing::FakeRepository;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("k", "yes").unwrap());
        assert!(parse_bool("k", "TRUE").unwrap());
        assert!(!parse_bool("k", "off").unwrap());
        assert!(matches!(
            parse_bool("k", "sometimes"),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_parent_key() {
        assert_eq!(
            parent_key(&"feature".into()),
            "branch.feature.twig-parent"
        );
    }

    #[test]
    fn test_user_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.stash_open_changes);
        assert!(!config.push_new_branches);
        assert_eq!(config.main_branch, None);
    }

    #[test]
    fn test_user_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = UserConfig {
            main_branch: Some("trunk".to_string()),
            push_new_branches: true,
            stash_open_changes: false,
            github: GitHubConfig {
                token: None,
                api_base: Some("https://ghe.example.com/api/v3".to_string()),
            },
        };
        config.save_to(&path).unwrap();
        assert_eq!(UserConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_user_config_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "push_new_branches = true\n[github]\ntoken = \"abc\"\n").unwrap();
        let config = UserConfig::load_from(&path).unwrap();
        assert!(config.push_new_branches);
        assert!(config.stash_open_changes);
        assert_eq!(config.github.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "push_new_branches = [").unwrap();
        assert!(UserConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_git_config_overrides_user_config() {
        let repo = FakeRepository::new("trunk");
        repo.set_config(KEY_MAIN_BRANCH, "trunk");
        repo.set_config(KEY_PUSH_NEW_BRANCHES, "false");
        let user = UserConfig {
            main_branch: Some("main".to_string()),
            push_new_branches: true,
            ..Default::default()
        };
        let settings = Settings::resolve(&repo, &user, None).unwrap();
        assert_eq!(settings.main_branch, LocalBranchName::from("trunk"));
        assert!(!settings.push_new_branches);
    }

    #[test]
    fn test_global_config_applies_without_local_value() {
        let mut config = ConfigSnapshot::default();
        config
            .global
            .insert(KEY_PUSH_NEW_BRANCHES.to_string(), "true".to_string());
        assert_eq!(
            effective(&config, KEY_PUSH_NEW_BRANCHES).as_deref(),
            Some("true")
        );
        config
            .local
            .insert(KEY_PUSH_NEW_BRANCHES.to_string(), "false".to_string());
        assert_eq!(
            effective(&config, KEY_PUSH_NEW_BRANCHES).as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_main_branch_detection() {
        let repo = FakeRepository::new("master");
        let settings = Settings::resolve(&repo, &UserConfig::default(), None).unwrap();
        assert_eq!(settings.main_branch, LocalBranchName::from("master"));

        let repo = FakeRepository::new("develop");
        let err = Settings::resolve(&repo, &UserConfig::default(), None).unwrap_err();
        assert!(err.to_string().contains(KEY_MAIN_BRANCH));
    }

    #[test]
    fn test_token_precedence() {
        let repo = FakeRepository::new("main");
        let mut user = UserConfig::default();
        user.github.token = Some("from-file".to_string());

        let settings = Settings::resolve(&repo, &user, None).unwrap();
        assert_eq!(settings.github_token.as_deref(), Some("from-file"));

        let settings = Settings::resolve(&repo, &user, Some("from-env".to_string())).unwrap();
        assert_eq!(settings.github_token.as_deref(), Some("from-env"));

        repo.set_config(KEY_GITHUB_TOKEN, "from-git");
        let settings = Settings::resolve(&repo, &user, Some("from-env".to_string())).unwrap();
        assert_eq!(settings.github_token.as_deref(), Some("from-git"));
    }
}
