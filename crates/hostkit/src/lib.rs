//! # hostkit
//!
//! Code hosting connectors for twig workflows.
//!
//! This crate provides:
//! - Parsing of `origin` remote URLs into host, owner and repository
//! - A GitHub pull request connector implementing [`branchvm::Connector`]
//!
//! ## Example
//!
//! ```no_run
//! let connector = hostkit::connector_for(
//!     "git@github.com:acme/widgets.git",
//!     std::env::var("GITHUB_TOKEN").ok(),
//!     None,
//! )
//! .expect("GitHub remote");
//! let open = connector.proposals_targeting(&"main".into()).unwrap();
//! println!("{} open pull requests target main", open.len());
//! ```

pub mod error;
pub mod github;
pub mod origin;

pub use error::{Error, ErrorCategory, Result};
pub use github::{DEFAULT_API_BASE, GitHubConnector};
pub use origin::{RepoCoordinates, parse_origin_url};

use branchvm::Connector;

/// Connector for the platform hosting `origin_url`
///
/// Returns `None` when the URL cannot be parsed or the host has no
/// connector. A custom `api_base` selects a GitHub Enterprise instance
/// and also makes any host acceptable.
pub fn connector_for(
    origin_url: &str,
    token: Option<String>,
    api_base: Option<&str>,
) -> Option<Box<dyn Connector>> {
    let coords = parse_origin_url(origin_url)?;
    match api_base {
        Some(base) => Some(Box::new(GitHubConnector::with_api_base(coords, token, base))),
        None if coords.host == "github.com" => Some(Box::new(GitHubConnector::new(coords, token))),
        None => {
            log::debug!("No connector for host {}", coords.host);
            None
        }
    }
}
