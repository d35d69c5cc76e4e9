//! Opcodes that change repository-local git configuration

use super::{Instruction, Opcode};
use crate::context::RunContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};

fn restore_value(ctx: &RunContext<'_>, key: &str) -> Result<Vec<Opcode>> {
    let opcode = match ctx.repo.config_value(key)? {
        Some(value) => Opcode::from(SetLocalConfig {
            key: key.to_string(),
            value,
        }),
        None => Opcode::from(RemoveLocalConfig {
            key: key.to_string(),
        }),
    };
    Ok(vec![opcode])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLocalConfig {
    pub key: String,
    pub value: String,
}

impl Instruction for SetLocalConfig {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        ctx.repo.git(&["config", &self.key, &self.value])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        restore_value(ctx, &self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLocalConfig {
    pub key: String,
}

impl Instruction for RemoveLocalConfig {
    fn run(&self, ctx: &RunContext<'_>) -> Result<()> {
        if ctx.repo.config_value(&self.key)?.is_none() {
            return Ok(());
        }
        ctx.repo.git(&["config", "--unset", &self.key])
    }

    fn undo_program(&self, ctx: &RunContext<'_>) -> Result<Vec<Opcode>> {
        restore_value(ctx, &self.key)
    }
}
