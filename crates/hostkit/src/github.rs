//! GitHub pull request connector.
//!
//! Implements [`branchvm::Connector`] on top of GitHub's REST API.
//!
//! # Authentication
//!
//! Reading public pull requests works without a token, subject to the
//! unauthenticated rate limit of 60 requests per hour. Changing a pull
//! request's base branch requires a token with write access.

use crate::error::{Error, Result};
use crate::origin::RepoCoordinates;
use branchvm::{Connector, LocalBranchName, Proposal};
use serde::Deserialize;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Pull requests of one GitHub repository.
///
/// # Example
///
/// ```no_run
/// use hostkit::{GitHubConnector, parse_origin_url};
/// use branchvm::Connector;
///
/// let coords = parse_origin_url("git@github.com:acme/widgets.git").unwrap();
/// let connector = GitHubConnector::new(coords, Some("ghp_example".to_string()));
/// let proposal = connector.proposal(42).unwrap();
/// println!("#{} {} -> {}", proposal.number, proposal.source, proposal.target);
/// ```
pub struct GitHubConnector {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// GitHub API base URL.
    api_base: String,
    coords: RepoCoordinates,
    token: Option<String>,
}

impl GitHubConnector {
    /// Create a connector for the given repository.
    #[must_use]
    pub fn new(coords: RepoCoordinates, token: Option<String>) -> Self {
        Self::with_api_base(coords, token, DEFAULT_API_BASE)
    }

    /// Create a connector with a custom API base (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(
        coords: RepoCoordinates,
        token: Option<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        let api_base: String = api_base.into();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            coords,
            token,
        }
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build the API URL for the repository's pull requests.
    fn pulls_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.api_base, self.coords.owner, self.coords.repo
        )
    }

    /// Build the API URL for a single pull request.
    fn pull_url(&self, number: u64) -> String {
        format!("{}/{number}", self.pulls_url())
    }

    fn headers<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "twig");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn fetch_proposal(&self, number: u64) -> Result<Proposal> {
        log::debug!("GET {}", self.pull_url(number));
        let pull: PullRequest = self
            .headers(self.agent.get(&self.pull_url(number)))
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(404) => Error::ProposalNotFound(number),
                other => other.into(),
            })?
            .body_mut()
            .read_json()?;
        Ok(pull.into())
    }

    fn fetch_proposals_targeting(&self, branch: &LocalBranchName) -> Result<Vec<Proposal>> {
        log::debug!("GET {}?base={branch}", self.pulls_url());
        let pulls: Vec<PullRequest> = self
            .headers(self.agent.get(&self.pulls_url()))
            .query("base", branch.as_str())
            .query("state", "open")
            .call()?
            .body_mut()
            .read_json()?;
        Ok(pulls.into_iter().map(Into::into).collect())
    }

    fn patch_base(&self, number: u64, target: &LocalBranchName) -> Result<()> {
        log::debug!("PATCH {} base={target}", self.pull_url(number));
        self.headers(self.agent.patch(&self.pull_url(number)))
            .send_json(serde_json::json!({ "base": target.as_str() }))?;
        Ok(())
    }
}

impl Connector for GitHubConnector {
    fn proposal(&self, number: u64) -> branchvm::Result<Proposal> {
        Ok(self.fetch_proposal(number)?)
    }

    fn proposals_targeting(&self, branch: &LocalBranchName) -> branchvm::Result<Vec<Proposal>> {
        Ok(self.fetch_proposals_targeting(branch)?)
    }

    fn update_proposal_target(
        &self,
        number: u64,
        target: &LocalBranchName,
    ) -> branchvm::Result<()> {
        Ok(self.patch_base(number, target)?)
    }
}

// =============================================================================
// GitHub API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    html_url: String,
    head: BranchRef,
    base: BranchRef,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
}

impl From<PullRequest> for Proposal {
    fn from(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            source: LocalBranchName::new(pr.head.name),
            target: LocalBranchName::new(pr.base.name),
            url: pr.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(api_base: &str) -> GitHubConnector {
        GitHubConnector::with_api_base(
            RepoCoordinates {
                host: "github.com".to_string(),
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
            },
            None,
            api_base,
        )
    }

    #[test]
    fn test_urls() {
        let connector = connector(DEFAULT_API_BASE);
        assert_eq!(
            connector.pulls_url(),
            "https://api.github.com/repos/acme/widgets/pulls"
        );
        assert_eq!(
            connector.pull_url(7),
            "https://api.github.com/repos/acme/widgets/pulls/7"
        );
    }

    #[test]
    fn test_custom_api_base_trailing_slash() {
        let connector = connector("https://ghe.example.com/api/v3/");
        assert_eq!(connector.api_base(), "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_pull_request_conversion() {
        let json = r#"{
            "number": 12,
            "title": "Add widgets",
            "html_url": "https://github.com/acme/widgets/pull/12",
            "head": { "ref": "feature", "sha": "abc" },
            "base": { "ref": "main", "sha": "def" },
            "state": "open"
        }"#;
        let pull: PullRequest = serde_json::from_str(json).unwrap();
        let proposal: Proposal = pull.into();
        assert_eq!(proposal.number, 12);
        assert_eq!(proposal.source, LocalBranchName::from("feature"));
        assert_eq!(proposal.target, LocalBranchName::from("main"));
        assert_eq!(proposal.url, "https://github.com/acme/widgets/pull/12");
    }
}
