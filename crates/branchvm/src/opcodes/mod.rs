//! Opcodes: the atomic steps of a workflow
//!
//! Every opcode is a small struct implementing [`Instruction`]. The
//! [`Opcode`] enum wraps them so programs can be persisted between
//! invocations and inspected by the interpreter.

mod branch;
mod config;
mod proposal;
mod stash;
mod sync;

pub use branch::{
    Checkout, CreateBranch, DeleteLocalBranch, EndOfBranchProgram, PreserveCheckoutHistory,
    ResetCurrentBranchToSha,
};
pub use config::{RemoveLocalConfig, SetLocalConfig};
pub use proposal::UpdateProposalTarget;
pub use stash::{RestoreOpenChanges, StashOpenChanges};
pub use sync::{
    DeleteTrackingBranch, Fetch, MergeAbort, MergeBranch, MergeContinue, PushCurrentBranch,
    RebaseAbort, RebaseBranch, RebaseContinue, ResetRemoteBranchToSha,
};

use crate::context::RunContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capabilities of a single workflow step
///
/// Only [`Instruction::run`] is required. The remaining methods describe
/// how the interpreter treats the opcode when it succeeds or fails; their
/// defaults describe an ordinary step that halts the run on failure.
pub trait Instruction: fmt::Debug {
    /// Perform the step
    fn run(&self, ctx: &RunContext<'_>) -> Result<()>;

    /// Opcodes reverting this step, computed against the state *before* it runs
    ///
    /// The interpreter keeps the result only if [`Instruction::run`] succeeds.
    fn undo_program(&self, _ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        Ok(Vec::new())
    }

    /// Opcodes that cancel this step's in-progress git operation after a failure
    fn abort_program(&self) -> Vec<Opcode> {
        Vec::new()
    }

    /// Opcodes that finish this step once the user has resolved its conflicts
    fn continue_program(&self) -> Vec<Opcode> {
        Vec::new()
    }

    /// Roll back the run immediately when this step fails
    fn is_automatically_undoable(&self) -> bool {
        false
    }

    /// Message for the error reported after an automatic rollback
    fn automatic_undo_message(&self) -> String {
        format!("{self:?} failed, the changes made before it have been undone")
    }

    /// The user may skip the branch this step belongs to
    fn is_skippable(&self) -> bool {
        false
    }

    /// Failure means "conflict": halt for the user instead of rolling back
    fn is_continuable_after_conflict(&self) -> bool {
        false
    }

    /// Bookkeeping step that is never dropped when skipping a branch
    fn is_housekeeping(&self) -> bool {
        false
    }

    /// Marks the end of the opcodes belonging to one branch
    fn ends_branch(&self) -> bool {
        false
    }
}

macro_rules! opcodes {
    ($($variant:ident),+ $(,)?) => {
        /// A persisted, type-tagged opcode
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "data")]
        pub enum Opcode {
            $($variant($variant),)+
        }

        impl Opcode {
            /// The capabilities of the wrapped opcode
            pub fn instruction(&self) -> &dyn Instruction {
                match self {
                    $(Opcode::$variant(op) => op as &dyn Instruction,)+
                }
            }

            /// Variant name, for logs and status output
            pub fn name(&self) -> &'static str {
                match self {
                    $(Opcode::$variant(_) => stringify!($variant),)+
                }
            }
        }

        $(
            impl From<$variant> for Opcode {
                fn from(op: $variant) -> Self {
                    Opcode::$variant(op)
                }
            }
        )+
    };
}

opcodes! {
    Checkout,
    CreateBranch,
    DeleteLocalBranch,
    DeleteTrackingBranch,
    EndOfBranchProgram,
    Fetch,
    MergeAbort,
    MergeBranch,
    MergeContinue,
    PreserveCheckoutHistory,
    PushCurrentBranch,
    RebaseAbort,
    RebaseBranch,
    RebaseContinue,
    RemoveLocalConfig,
    ResetCurrentBranchToSha,
    ResetRemoteBranchToSha,
    RestoreOpenChanges,
    SetLocalConfig,
    StashOpenChanges,
    UpdateProposalTarget,
}

impl Opcode {
    pub fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        self.instruction().run(ctx)
    }

    pub fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        self.instruction().undo_program(ctx)
    }

    pub fn abort_program(&self) -> Vec<Opcode> {
        self.instruction().abort_program()
    }

    pub fn continue_program(&self) -> Vec<Opcode> {
        self.instruction().continue_program()
    }

    pub fn is_automatically_undoable(&self) -> bool {
        self.instruction().is_automatically_undoable()
    }

    pub fn is_skippable(&self) -> bool {
        self.instruction().is_skippable()
    }

    pub fn is_continuable_after_conflict(&self) -> bool {
        self.instruction().is_continuable_after_conflict()
    }

    pub fn is_housekeeping(&self) -> bool {
        self.instruction().is_housekeeping()
    }

    pub fn ends_branch(&self) -> bool {
        self.instruction().ends_branch()
    }

    /// Compose the error reported after the interpreter rolled back the run
    pub fn build_automatic_undo_error(&self, failure: Error, undo_failures: Vec<String>) -> Error {
        Error::AutomaticUndo {
            message: self.instruction().automatic_undo_message(),
            source: Box::new(failure),
            undo_failures,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.instruction())
    }
}
