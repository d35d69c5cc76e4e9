//! # branchvm
//!
//! A resumable, undoable interpreter for multi-step git branch workflows.
//!
//! Workflows such as "sync all branches" or "ship this branch" are
//! planned as a [`Program`] of small [`Opcode`]s. The interpreter runs
//! them one at a time and records how to revert each completed step. When
//! a step stops with a conflict the run is saved, and the next invocation
//! lets the user continue, skip, undo or discard it.
//!
//! ## Core Concepts
//!
//! - **Opcode**: one git command or hosting API call, with optional undo,
//!   abort, continue and skip capabilities ([`Instruction`])
//! - **Program**: opcodes in execution order
//! - **RunState**: the persisted progress of one workflow run
//! - **StateStore**: at most one run state per repository root
//! - **Interpreter**: [`execute`] runs a program against a [`RunContext`]
//! - **Resolver**: [`handle_unfinished_state`] deals with a halted run
//!
//! ## Example
//!
//! ```
//! use branchvm::testing::FakeRepository;
//! use branchvm::{Checkout, Fetch, Outcome, Program, RunContext, RunState, StateStore};
//! use std::path::Path;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = StateStore::new(dir.path());
//! let repo = FakeRepository::new("main");
//! repo.add_branch("feature", "abc123");
//!
//! let mut program = Program::new();
//! program.add(Fetch);
//! program.add(Checkout { branch: "feature".into() });
//!
//! let ctx = RunContext::new(&repo);
//! let mut state = RunState::begin("sync", program, &repo, false).unwrap();
//! let outcome = branchvm::execute(&mut state, &ctx, &store, Path::new("/repo")).unwrap();
//! assert_eq!(outcome, Outcome::Finished);
//! ```

pub mod context;
pub mod error;
pub mod interpreter;
pub mod opcodes;
pub mod program;
pub mod resolver;
pub mod runstate;
pub mod statefile;
pub mod testing;
pub mod types;
pub mod undo;

pub use context::{Connector, Repository, RunContext};
pub use error::{Error, ErrorCategory, Result};
pub use interpreter::{OpcodeFailure, Outcome, execute, run_best_effort};
pub use opcodes::*;
pub use program::{Program, WrapOptions};
pub use resolver::{
    Dialog, Handled, Resolution, Response, continue_run, discard, handle_unfinished_state, skip,
};
pub use runstate::{RunState, UndoLedger, UnfinishedDetails};
pub use statefile::{RunLock, StateStore};
pub use types::{
    BranchInfo, BranchesSnapshot, ConfigSnapshot, LocalBranchName, Proposal, RepoStatus, Sha,
    StashSize,
};
pub use undo::{UndoReport, undo, undo_program};
