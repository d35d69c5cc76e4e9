//! `twig push-new-branches`: show or change whether new branches are pushed

use crate::Context;
use crate::commands::Session;
use crate::config::KEY_PUSH_NEW_BRANCHES;
use crate::runner;
use crate::ui;
use anyhow::{Result, bail};

pub fn run(ctx: &Context, value: Option<bool>, global: bool) -> Result<()> {
    let session = Session::open(false)?;

    let Some(value) = value else {
        let settings = session.settings()?;
        ui::kv("push-new-branches", ui::yes_no(settings.push_new_branches));
        return Ok(());
    };

    let value = value.to_string();
    let mut args = vec!["config"];
    if global {
        args.push("--global");
    }
    args.push(KEY_PUSH_NEW_BRANCHES);
    args.push(&value);

    ui::command(None, &args);
    let status = runner::run_in(session.root(), "git", &args)?;
    if !status.success() {
        bail!("git {} failed: {status}", args.join(" "));
    }
    if !ctx.quiet {
        let scope = if global { "globally" } else { "for this repository" };
        ui::success(&format!("push-new-branches set to {value} {scope}"));
    }
    Ok(())
}
