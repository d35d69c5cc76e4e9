use crate::Context;
use crate::commands::Session;
use crate::ui;
use anyhow::Result;
use branchvm::RunState;
use chrono::Utc;
use colored::Colorize;

pub fn run(_ctx: &Context, json: bool) -> Result<()> {
    let session = Session::open(false)?;
    let root = session.root();
    let pending = session.store.load(root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    ui::header("twig status");
    ui::kv("Repository", &root.display().to_string());
    ui::kv(
        "Run state",
        &session.store.record_path(root).display().to_string(),
    );

    match pending {
        Some(state) if state.is_unfinished() => show_unfinished(&state),
        _ => {
            println!();
            ui::success("No unfinished twig command");
            if let Some(last) = session.history.load(root)? {
                ui::dim(&format!("`twig undo` reverts the last twig {}", last.command));
            }
        }
    }
    Ok(())
}

fn show_unfinished(state: &RunState) {
    ui::section("Unfinished command");
    ui::kv("Command", &format!("twig {}", state.command));
    if let Some(details) = &state.unfinished_details {
        ui::kv("Stopped on", &details.end_branch.to_string());
        ui::kv("When", &ui::format_elapsed(details.end_time, Utc::now()));
        ui::kv("Can skip", ui::yes_no(details.can_skip));
    }
    ui::kv("Remaining steps", &state.run_program.len().to_string());

    ui::section("Remaining program");
    for (i, opcode) in state.run_program.iter().enumerate() {
        println!("  {} {opcode}", format!("{:>3}.", i + 1).dimmed());
    }

    println!();
    ui::dim("Run `twig continue`, `twig skip`, `twig undo` or `twig discard`");
}
