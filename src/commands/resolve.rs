//! `continue`, `skip`, `undo` and `discard`

use crate::Context;
use crate::commands::{Session, report_resumed, report_undo};
use crate::ui;
use anyhow::Result;
use branchvm::RunState;

/// The stored unfinished run, or a note that there is none
fn unfinished(session: &Session) -> Result<Option<RunState>> {
    let state = session
        .store
        .load(session.root())?
        .filter(RunState::is_unfinished);
    if state.is_none() {
        ui::info("There is no unfinished twig command in this repository");
    }
    Ok(state)
}

pub fn continue_run(ctx: &Context) -> Result<()> {
    let session = Session::open(false)?;
    let _lock = session.store.lock(session.root())?;
    let Some(state) = unfinished(&session)? else {
        return Ok(());
    };
    let command = state.command.clone();
    let outcome = branchvm::continue_run(state, &session.context(), &session.store, session.root())?;
    report_resumed(ctx, &session, &command, &outcome)
}

pub fn skip(ctx: &Context) -> Result<()> {
    let session = Session::open(false)?;
    let _lock = session.store.lock(session.root())?;
    let Some(state) = unfinished(&session)? else {
        return Ok(());
    };
    let command = state.command.clone();
    let outcome = branchvm::skip(state, &session.context(), &session.store, session.root())?;
    report_resumed(ctx, &session, &command, &outcome)
}

/// Undo the unfinished run, else the last finished one
pub fn undo(ctx: &Context) -> Result<()> {
    let session = Session::open(false)?;
    let root = session.root();
    let _lock = session.store.lock(root)?;
    let run_ctx = session.context();

    if let Some(state) = session.store.load(root)? {
        let report = branchvm::undo(&state, &run_ctx, &session.store, root)?;
        report_undo(ctx, &state.command, &report);
        return Ok(());
    }
    if let Some(state) = session.history.load(root)? {
        let report = branchvm::undo(&state, &run_ctx, &session.history, root)?;
        report_undo(ctx, &state.command, &report);
        return Ok(());
    }
    ui::info("Nothing to undo");
    Ok(())
}

pub fn discard(ctx: &Context) -> Result<()> {
    let session = Session::open(false)?;
    let _lock = session.store.lock(session.root())?;
    let Some(state) = unfinished(&session)? else {
        return Ok(());
    };
    branchvm::discard(&session.store, session.root())?;
    if !ctx.quiet {
        ui::success(&format!("Discarded the unfinished twig {}", state.command));
    }
    Ok(())
}
