//! Asking the user what to do with an unfinished run

use crate::ui;
use branchvm::{Dialog, Response, UnfinishedDetails};
use chrono::Utc;
use dialoguer::Select;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Comma-separated answers used instead of prompting
pub const ENV_DIALOG_INPUTS: &str = "TWIG_DIALOG_INPUTS";

/// Interactive selection in the terminal
pub struct TerminalDialog;

impl Dialog for TerminalDialog {
    fn choose(
        &self,
        command: &str,
        details: &UnfinishedDetails,
        options: &[Response],
    ) -> branchvm::Result<Response> {
        ui::warn(&format!(
            "`twig {command}` stopped on branch {} {}",
            details.end_branch,
            ui::format_elapsed(details.end_time, Utc::now())
        ));
        let items: Vec<String> = options.iter().map(|o| o.describe(details)).collect();
        let index = Select::new()
            .with_prompt("What would you like to do?")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| {
                log::debug!("Dialog failed: {e}");
                branchvm::Error::UserAborted
            })?
            .ok_or(branchvm::Error::UserAborted)?;
        options
            .get(index)
            .copied()
            .ok_or(branchvm::Error::UserAborted)
    }
}

/// Answers taken from a list, for scripts and tests
pub struct ScriptedDialog {
    inputs: RefCell<VecDeque<String>>,
}

impl ScriptedDialog {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: RefCell::new(inputs.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse `continue,skip` style input
    pub fn parse(spec: &str) -> Self {
        Self::new(
            spec.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
        )
    }
}

impl Dialog for ScriptedDialog {
    fn choose(
        &self,
        command: &str,
        details: &UnfinishedDetails,
        options: &[Response],
    ) -> branchvm::Result<Response> {
        let input = self
            .inputs
            .borrow_mut()
            .pop_front()
            .ok_or(branchvm::Error::UserAborted)?;
        let response: Response = input.parse()?;
        if !options.contains(&response) {
            return Err(branchvm::Error::UnexpectedResponse(input));
        }
        log::info!(
            "Answering {response} for unfinished `{command}` on {}",
            details.end_branch
        );
        Ok(response)
    }
}

/// Scripted answers from the environment, else the terminal
pub fn from_env() -> Box<dyn Dialog> {
    match std::env::var(ENV_DIALOG_INPUTS) {
        Ok(spec) if !spec.trim().is_empty() => Box::new(ScriptedDialog::parse(&spec)),
        _ => Box::new(TerminalDialog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(can_skip: bool) -> UnfinishedDetails {
        UnfinishedDetails {
            end_branch: "feature".into(),
            end_time: Utc::now(),
            can_skip,
        }
    }

    const ALL: [Response; 5] = [
        Response::Quit,
        Response::Continue,
        Response::Undo,
        Response::Skip,
        Response::Discard,
    ];

    #[test]
    fn test_scripted_answers_in_order() {
        let dialog = ScriptedDialog::parse("continue, Skip ,undo");
        let d = details(true);
        assert_eq!(dialog.choose("sync", &d, &ALL).unwrap(), Response::Continue);
        assert_eq!(dialog.choose("sync", &d, &ALL).unwrap(), Response::Skip);
        assert_eq!(dialog.choose("sync", &d, &ALL).unwrap(), Response::Undo);
    }

    #[test]
    fn test_scripted_dialog_runs_out() {
        let dialog = ScriptedDialog::parse("");
        let err = dialog.choose("sync", &details(false), &ALL).unwrap_err();
        assert!(matches!(err, branchvm::Error::UserAborted));
    }

    #[test]
    fn test_scripted_unknown_answer() {
        let dialog = ScriptedDialog::parse("maybe");
        let err = dialog.choose("sync", &details(false), &ALL).unwrap_err();
        assert!(matches!(err, branchvm::Error::UnexpectedResponse(_)));
    }

    #[test]
    fn test_scripted_answer_not_offered() {
        let dialog = ScriptedDialog::new(["skip"]);
        let offered = [Response::Quit, Response::Continue, Response::Discard];
        let err = dialog.choose("ship", &details(false), &offered).unwrap_err();
        assert!(matches!(err, branchvm::Error::UnexpectedResponse(s) if s == "skip"));
    }
}
