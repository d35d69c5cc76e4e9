//! `twig alias`: make `git sync`, `git hack` and friends call twig

use crate::Context;
use crate::runner;
use crate::ui;
use anyhow::{Context as _, Result, bail};

/// Commands that get a git alias
pub const ALIASED_COMMANDS: [&str; 7] =
    ["continue", "discard", "hack", "ship", "skip", "sync", "undo"];

/// Git arguments adding or removing the alias for `command`
///
/// Removal is planned only when the alias still points at twig, so
/// aliases the user set up differently are left alone.
pub fn alias_args(command: &str, enable: bool, current: Option<&str>) -> Option<Vec<String>> {
    let key = format!("alias.{command}");
    let value = format!("!twig {command}");
    match (enable, current) {
        (true, Some(existing)) if existing == value => None,
        (true, _) => Some(vec!["config".into(), "--global".into(), key, value]),
        (false, Some(existing)) if existing == value => Some(vec![
            "config".into(),
            "--global".into(),
            "--unset".into(),
            key,
        ]),
        (false, _) => None,
    }
}

pub fn run(ctx: &Context, enable: bool) -> Result<()> {
    if !runner::command_exists("git") {
        bail!("git is not installed");
    }
    let cwd = std::env::current_dir().context("Could not read the current directory")?;
    let mut changed = 0;
    for command in ALIASED_COMMANDS {
        let key = format!("alias.{command}");
        let current = runner::run_optional_in(&cwd, "git", &["config", "--global", "--get", &key])?;
        let Some(args) = alias_args(command, enable, current.as_deref()) else {
            log::debug!("{key} needs no change");
            continue;
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        ui::command(None, &args);
        let status = runner::run_in(&cwd, "git", &args)?;
        if !status.success() {
            bail!("git {} failed: {status}", args.join(" "));
        }
        changed += 1;
    }
    if !ctx.quiet {
        let verb = if enable { "Added" } else { "Removed" };
        ui::success(&format!("{verb} {changed} git aliases"));
    }
    Ok(())
}
