use crate::Context;
use crate::commands::{Session, run_workflow};
use crate::planner;
use crate::ui;
use anyhow::Result;
use branchvm::LocalBranchName;

pub fn run(ctx: &Context, branch: Option<&str>, dry_run: bool) -> Result<()> {
    let session = Session::open(dry_run)?;
    if session.connector().is_none() {
        ui::dim("No hosting connector, proposals of child branches won't be retargeted");
    }
    let branch = branch.map(LocalBranchName::new);
    run_workflow(ctx, &session, "ship", |session, settings| {
        planner::ship(&session.repo, settings, session.connector(), branch)
    })
}
