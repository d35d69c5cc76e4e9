//! Parsing of `origin` remote URLs

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `https://host/owner/repo.git`, `ssh://git@host:22/owner/repo`
static URL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|ssh|git)://(?:[^@/]+@)?([^/:]+)(?::\d+)?/(.+)/([^/]+?)(?:\.git)?/?$")
        .unwrap()
});

/// `git@host:owner/repo.git`
static SCP_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[^@/]+@)?([^:/]+):(.+)/([^/]+?)(?:\.git)?/?$").unwrap());

/// Where a repository lives at its hosting platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub host: String,
    /// Owner or organization; may contain `/` for nested groups
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.repo)
    }
}

/// Split a remote URL into host, owner and repository name
pub fn parse_origin_url(url: &str) -> Option<RepoCoordinates> {
    let url = url.trim();
    let captures = URL_FORM
        .captures(url)
        .or_else(|| SCP_FORM.captures(url))?;
    Some(RepoCoordinates {
        host: captures[1].to_lowercase(),
        owner: captures[2].to_string(),
        repo: captures[3].to_string(),
    })
}
