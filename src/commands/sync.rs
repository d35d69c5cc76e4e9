use crate::Context;
use crate::commands::{Session, run_workflow};
use crate::planner;
use anyhow::Result;

pub fn run(ctx: &Context, all: bool, dry_run: bool) -> Result<()> {
    let session = Session::open(dry_run)?;
    run_workflow(ctx, &session, "sync", |session, settings| {
        planner::sync(&session.repo, settings, all)
    })
}
