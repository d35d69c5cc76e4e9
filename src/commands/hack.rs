use crate::Context;
use crate::commands::{Session, run_workflow};
use crate::planner;
use anyhow::{Result, bail};
use branchvm::LocalBranchName;

pub fn run(ctx: &Context, branch: &str, dry_run: bool) -> Result<()> {
    let branch = branch.trim();
    if branch.is_empty() {
        bail!("branch name must not be empty");
    }
    let branch = LocalBranchName::new(branch);
    let session = Session::open(dry_run)?;
    run_workflow(ctx, &session, "hack", |session, settings| {
        planner::hack(&session.repo, settings, &branch)
    })
}
