//! Error types for hosting operations.
//!
//! Errors are categorized so callers can tell transient network trouble
//! apart from configuration problems.

use std::fmt;

/// Result type alias for hosting operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of hosting errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// The token is missing, invalid or lacks permissions.
    Auth,
    /// Proposal or repository not found.
    NotFound,
    /// The API answered with something unexpected.
    Format,
    /// The remote is not hosted on a supported platform.
    Unsupported,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::NotFound => "Not found at the hosting platform",
            Self::Format => "Unexpected API response",
            Self::Unsupported => "Unsupported hosting platform",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Auth => "Set GITHUB_TOKEN or `git config twig.github-token <token>`",
            Self::NotFound => "Verify the proposal exists and the token can see the repository",
            Self::Format => "The API may have changed, check the error details",
            Self::Unsupported => "Proposal updates are only available for GitHub remotes",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to a hosting platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    HttpError {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The proposal does not exist.
    #[error("proposal #{0} not found")]
    ProposalNotFound(u64),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The origin remote points to a host without a connector.
    #[error("unsupported hosting platform: {0}")]
    UnsupportedHost(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::HttpError {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::HttpError {
                status: Some(401 | 403),
                ..
            } => ErrorCategory::Auth,
            Error::HttpError {
                status: Some(404), ..
            } => ErrorCategory::NotFound,
            Error::HttpError { .. } => ErrorCategory::Network,
            Error::ProposalNotFound(_) => ErrorCategory::NotFound,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::UnsupportedHost(_) => ErrorCategory::Unsupported,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::HttpError {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::HttpError {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<Error> for branchvm::Error {
    fn from(err: Error) -> Self {
        branchvm::Error::Hosting(err.to_string())
    }
}
