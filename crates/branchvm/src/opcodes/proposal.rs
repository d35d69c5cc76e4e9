//! Opcodes that talk to the code hosting platform

use super::{Instruction, Opcode};
use crate::context::RunContext;
use crate::error::Result;
use crate::types::LocalBranchName;
use serde::{Deserialize, Serialize};

/// Change the branch the given proposal merges into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProposalTarget {
    pub proposal_number: u64,
    pub new_target: LocalBranchName,
}

impl Instruction for UpdateProposalTarget {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        let connector = ctx.require_connector()?;
        if ctx.dry_run {
            log::info!(
                "Would update target of proposal #{} to {}",
                self.proposal_number,
                self.new_target
            );
            return Ok(());
        }
        connector.update_proposal_target(self.proposal_number, &self.new_target)
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        let current = ctx.require_connector()?.proposal(self.proposal_number)?;
        if current.target == self.new_target {
            return Ok(Vec::new());
        }
        Ok(vec![
            UpdateProposalTarget {
                proposal_number: self.proposal_number,
                new_target: current.target,
            }
            .into(),
        ])
    }

    fn is_automatically_undoable(&self) -> bool {
        true
    }

    fn automatic_undo_message(&self) -> String {
        format!(
            "cannot update the target branch of proposal #{}",
            self.proposal_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{FakeConnector, FakeRepository};

    #[test]
    fn test_requires_connector() {
        let repo = FakeRepository::new("main");
        let ctx = RunContext::new(&repo);
        let op = UpdateProposalTarget {
            proposal_number: 1,
            new_target: "main".into(),
        };
        assert!(matches!(op.run(&ctx), Err(Error::HostingNotConfigured)));
    }

    #[test]
    fn test_undo_restores_previous_target() {
        let repo = FakeRepository::new("main");
        let connector = FakeConnector::new();
        connector.add_proposal(4, "child", "parent");
        let ctx = RunContext::with_connector(&repo, &connector);
        let op = UpdateProposalTarget {
            proposal_number: 4,
            new_target: "main".into(),
        };
        let undo = op.undo_program(&ctx).unwrap();
        op.run(&ctx).unwrap();
        assert_eq!(connector.target_of(4), Some(LocalBranchName::from("main")));
        assert_eq!(
            undo,
            vec![Opcode::from(UpdateProposalTarget {
                proposal_number: 4,
                new_target: "parent".into(),
            })]
        );
    }
}
