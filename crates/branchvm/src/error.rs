//! Error types for the branch workflow engine.
//!
//! Errors are categorized so the command layer can decide how to present
//! them. A conflict halt is not an error: it is reported through
//! [`crate::interpreter::Outcome::Halted`].

use std::fmt;
use std::path::PathBuf;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of engine errors for user-facing presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller passed malformed input.
    Input,
    /// A git command or hosting call failed.
    Command,
    /// The working copy needs attention before the run can proceed.
    Conflict,
    /// Reading or writing the persisted run state failed.
    Persistence,
    /// Hosting integration is missing or failed.
    Hosting,
    /// The user stopped the operation.
    Aborted,
    /// Engine contract violation.
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid input",
            Self::Command => "Command failed",
            Self::Conflict => "Unresolved conflicts",
            Self::Persistence => "Run state problem",
            Self::Hosting => "Code hosting problem",
            Self::Aborted => "Aborted",
            Self::Internal => "Internal error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Input => "Check the command arguments",
            Self::Command => "Inspect the git output above, fix the problem, then run `twig continue`",
            Self::Conflict => "Resolve the conflicts, stage the files, then run `twig continue`",
            Self::Persistence => "Run `twig discard` to remove the stored run state",
            Self::Hosting => "Configure a token with `git config twig.github-token <token>`",
            Self::Aborted => "Run the command again when ready",
            Self::Internal => "Please report this problem",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while planning, running, or resolving workflows.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed arguments to an engine entry point.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An opcode failed and the engine rolled back the steps before it.
    #[error("{message}")]
    AutomaticUndo {
        /// Description of the opcode that triggered the rollback.
        message: String,
        /// The failure of that opcode.
        #[source]
        source: Box<Error>,
        /// Undo opcodes that failed during the rollback.
        undo_failures: Vec<String>,
    },

    /// The user asked to continue while the working copy still has conflicts.
    #[error("you must resolve the conflicts before continuing")]
    UnresolvedConflicts,

    /// The user asked to skip an opcode that cannot be skipped.
    #[error("cannot skip: the interrupted step is not skippable")]
    SkipNotSupported,

    /// Reading, writing or deleting the persisted run state failed.
    #[error("run state at {}: {message}", .path.display())]
    Persistence {
        /// Location of the persisted record.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Another invocation holds the lock for this repository.
    #[error(
        "another twig command is running in this repository (lock file {})",
        .path.display()
    )]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },

    /// An opcode needs a hosting connector but none is configured.
    #[error("no code hosting connector configured for this repository")]
    HostingNotConfigured,

    /// The hosting platform rejected or failed a request.
    #[error("code hosting: {0}")]
    Hosting(String),

    /// A git command exited unsuccessfully.
    #[error("command failed: {command}: {message}")]
    CommandFailed {
        /// The command line that ran.
        command: String,
        /// Exit status or stderr summary.
        message: String,
    },

    /// The dialog produced a response the resolver does not understand.
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(String),

    /// The user dismissed the dialog.
    #[error("user aborted")]
    UserAborted,
}

impl Error {
    /// Create a persistence error for the given record path.
    pub fn persistence(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a command failure.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput(_) => ErrorCategory::Input,
            Error::AutomaticUndo { source, .. } => source.category(),
            Error::UnresolvedConflicts => ErrorCategory::Conflict,
            Error::SkipNotSupported => ErrorCategory::Input,
            Error::Persistence { .. } | Error::Locked { .. } => ErrorCategory::Persistence,
            Error::HostingNotConfigured | Error::Hosting(_) => ErrorCategory::Hosting,
            Error::CommandFailed { .. } => ErrorCategory::Command,
            Error::UnexpectedResponse(_) => ErrorCategory::Internal,
            Error::UserAborted => ErrorCategory::Aborted,
        }
    }
}
