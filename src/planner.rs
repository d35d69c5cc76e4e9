//! Workflow planners
//!
//! Each planner inspects the repository and returns the [`Program`] the
//! interpreter runs. Planners never change the repository themselves.

use crate::config::{Settings, parent_key};
use anyhow::{Result, bail};
use branchvm::{
    BranchesSnapshot, Checkout, Connector, CreateBranch, DeleteLocalBranch, DeleteTrackingBranch,
    EndOfBranchProgram, Fetch, LocalBranchName, MergeBranch, Program, PushCurrentBranch,
    RebaseBranch, RemoveLocalConfig, Repository, SetLocalConfig, UpdateProposalTarget,
};

/// Parent of a feature branch: recorded lineage, else the main branch
fn parent_of(
    repo: &dyn Repository,
    settings: &Settings,
    branch: &LocalBranchName,
) -> Result<LocalBranchName> {
    Ok(repo
        .config_value(&parent_key(branch))?
        .map(LocalBranchName::new)
        .unwrap_or_else(|| settings.main_branch.clone()))
}

/// Bring one branch up to date with its tracking branch and parent
fn sync_branch(
    program: &mut Program,
    repo: &dyn Repository,
    settings: &Settings,
    snapshot: &BranchesSnapshot,
    branch: &LocalBranchName,
) -> Result<()> {
    let tracking = snapshot.find(branch).and_then(|b| b.tracking.clone());
    let is_main = branch == &settings.main_branch;

    program.add(Checkout {
        branch: branch.clone(),
    });
    if let Some(tracking) = &tracking {
        program.add(RebaseBranch {
            onto: tracking.clone(),
        });
    }
    if !is_main {
        program.add(RebaseBranch {
            onto: parent_of(repo, settings, branch)?.to_string(),
        });
    }
    if tracking.is_some() {
        program.add(PushCurrentBranch {
            branch: branch.clone(),
            force_with_lease: !is_main,
            set_upstream: false,
        });
    } else if settings.push_new_branches && !is_main {
        program.add(PushCurrentBranch {
            branch: branch.clone(),
            force_with_lease: false,
            set_upstream: true,
        });
    }
    program.add(EndOfBranchProgram);
    Ok(())
}

/// Update the main branch and the current (or every) branch
pub fn sync(repo: &dyn Repository, settings: &Settings, all: bool) -> Result<Program> {
    let initial = repo.current_branch()?;
    let snapshot = repo.branches_snapshot()?;
    let main = &settings.main_branch;

    let mut branches = vec![main.clone()];
    if all {
        branches.extend(
            snapshot
                .local_branch_names()
                .into_iter()
                .filter(|b| b != main),
        );
    } else if &initial != main {
        branches.push(initial.clone());
    }
    log::debug!("Syncing {} branches", branches.len());

    let mut program = Program::new();
    program.add(Fetch);
    for branch in &branches {
        sync_branch(&mut program, repo, settings, &snapshot, branch)?;
    }
    program.add(Checkout { branch: initial });
    Ok(program)
}

/// Create a feature branch off the main branch and check it out
pub fn hack(
    repo: &dyn Repository,
    settings: &Settings,
    branch: &LocalBranchName,
) -> Result<Program> {
    if repo.has_local_branch(branch)? {
        bail!("branch {branch} already exists");
    }
    let main = &settings.main_branch;

    let mut program = Program::new();
    program.add(CreateBranch {
        branch: branch.clone(),
        starting_point: main.to_string(),
    });
    program.add(Checkout {
        branch: branch.clone(),
    });
    program.add(SetLocalConfig {
        key: parent_key(branch),
        value: main.to_string(),
    });
    if settings.push_new_branches {
        program.add(PushCurrentBranch {
            branch: branch.clone(),
            force_with_lease: false,
            set_upstream: true,
        });
    }
    Ok(program)
}

/// Land a feature branch on the main branch and remove it
pub fn ship(
    repo: &dyn Repository,
    settings: &Settings,
    connector: Option<&dyn Connector>,
    branch: Option<LocalBranchName>,
) -> Result<Program> {
    let initial = repo.current_branch()?;
    let branch = branch.unwrap_or_else(|| initial.clone());
    let main = &settings.main_branch;
    if &branch == main {
        bail!("cannot ship the main branch");
    }
    if !repo.has_local_branch(&branch)? {
        bail!("there is no branch {branch}");
    }
    let snapshot = repo.branches_snapshot()?;
    let main_tracking = snapshot.find(main).and_then(|b| b.tracking.clone());
    let branch_tracking = snapshot.find(&branch).is_some_and(|b| b.has_tracking_branch());

    let mut program = Program::new();
    program.add(Fetch);
    program.add(Checkout {
        branch: main.clone(),
    });
    if let Some(tracking) = &main_tracking {
        program.add(RebaseBranch {
            onto: tracking.clone(),
        });
    }
    program.add(Checkout {
        branch: branch.clone(),
    });
    program.add(RebaseBranch {
        onto: main.to_string(),
    });
    program.add(Checkout {
        branch: main.clone(),
    });
    program.add(MergeBranch {
        branch: branch.to_string(),
        ff_only: true,
    });
    if main_tracking.is_some() {
        program.add(PushCurrentBranch {
            branch: main.clone(),
            force_with_lease: false,
            set_upstream: false,
        });
    }

    if let Some(connector) = connector {
        for proposal in connector.proposals_targeting(&branch)? {
            program.add(UpdateProposalTarget {
                proposal_number: proposal.number,
                new_target: main.clone(),
            });
        }
    }
    let config = repo.config_snapshot()?;
    for child in snapshot.local_branch_names() {
        if config.local.get(&parent_key(&child)) == Some(&branch.to_string()) {
            program.add(SetLocalConfig {
                key: parent_key(&child),
                value: main.to_string(),
            });
        }
    }

    if branch_tracking {
        program.add(DeleteTrackingBranch {
            branch: branch.clone(),
        });
    }
    program.add(DeleteLocalBranch {
        branch: branch.clone(),
    });
    program.add(RemoveLocalConfig {
        key: parent_key(&branch),
    });
    if initial != branch && &initial != main {
        program.add(Checkout { branch: initial });
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchvm::testing::{FakeConnector, FakeRepository};
    use branchvm::{Opcode, RunContext};

    fn settings() -> Settings {
        Settings {
            main_branch: "main".into(),
            push_new_branches: false,
            stash_open_changes: true,
            github_token: None,
            github_api_base: None,
        }
    }

    fn names(program: &Program) -> Vec<&'static str> {
        program.iter().map(Opcode::name).collect()
    }

    fn run(program: &Program, ctx: &RunContext<'_>) {
        for opcode in program.iter() {
            opcode.run(ctx).unwrap();
        }
    }

    #[test]
    fn test_sync_current_feature_branch() {
        let repo = FakeRepository::new("main");
        repo.add_remote_branch("main", "c00001");
        repo.add_branch("feature", "f00001");
        repo.add_remote_branch("feature", "f00002");
        repo.git(&["checkout", "feature"]).unwrap();

        let program = sync(&repo, &settings(), false).unwrap();
        assert_eq!(
            names(&program),
            vec![
                "Fetch",
                "Checkout",
                "RebaseBranch",
                "PushCurrentBranch",
                "EndOfBranchProgram",
                "Checkout",
                "RebaseBranch",
                "RebaseBranch",
                "PushCurrentBranch",
                "EndOfBranchProgram",
                "Checkout",
            ]
        );
        assert_eq!(
            program.iter().nth(7),
            Some(&Opcode::from(RebaseBranch {
                onto: "main".to_string()
            }))
        );
        assert_eq!(
            program.iter().last(),
            Some(&Opcode::from(Checkout {
                branch: "feature".into()
            }))
        );
    }

    #[test]
    fn test_sync_on_main_only_touches_main() {
        let repo = FakeRepository::new("main");
        repo.add_branch("other", "a00001");
        let program = sync(&repo, &settings(), false).unwrap();
        assert_eq!(
            names(&program),
            vec!["Fetch", "Checkout", "EndOfBranchProgram", "Checkout"]
        );
    }

    #[test]
    fn test_sync_all_uses_recorded_parent() {
        let repo = FakeRepository::new("main");
        repo.add_branch("a", "a00001");
        repo.add_branch("b", "b00001");
        repo.set_config("branch.b.twig-parent", "a");

        let program = sync(&repo, &settings(), true).unwrap();
        let rebases: Vec<&Opcode> = program
            .iter()
            .filter(|op| op.name() == "RebaseBranch")
            .collect();
        assert_eq!(
            rebases,
            vec![
                &Opcode::from(RebaseBranch {
                    onto: "main".to_string()
                }),
                &Opcode::from(RebaseBranch {
                    onto: "a".to_string()
                }),
            ]
        );
        let ends = program.iter().filter(|op| op.ends_branch()).count();
        assert_eq!(ends, 3);
    }

    #[test]
    fn test_sync_pushes_new_branches_when_enabled() {
        let repo = FakeRepository::new("feature");
        repo.add_branch("main", "m00001");
        let mut settings = settings();
        settings.push_new_branches = true;

        let program = sync(&repo, &settings, false).unwrap();
        assert!(program.iter().any(|op| op
            == &Opcode::from(PushCurrentBranch {
                branch: "feature".into(),
                force_with_lease: false,
                set_upstream: true,
            })));
    }

    #[test]
    fn test_hack_creates_and_records_parent() {
        let repo = FakeRepository::new("main");
        let program = hack(&repo, &settings(), &"login".into()).unwrap();
        assert_eq!(
            names(&program),
            vec!["CreateBranch", "Checkout", "SetLocalConfig"]
        );

        run(&program, &RunContext::new(&repo));
        assert_eq!(repo.current(), "login");
        assert_eq!(repo.sha("login"), repo.sha("main"));
        assert_eq!(
            repo.config_value("branch.login.twig-parent").unwrap().as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_hack_existing_branch_fails() {
        let repo = FakeRepository::new("main");
        repo.add_branch("login", "a00001");
        let err = hack(&repo, &settings(), &"login".into()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_ship_feature_branch() {
        let repo = FakeRepository::new("feature");
        repo.add_branch("main", "m00001");
        repo.add_remote_branch("main", "m00001");
        repo.add_remote_branch("feature", "c00001");
        repo.add_branch("child", "d00001");
        repo.set_config("branch.child.twig-parent", "feature");
        repo.set_config("branch.feature.twig-parent", "main");
        let connector = FakeConnector::new();
        connector.add_proposal(5, "child", "feature");
        connector.add_proposal(6, "other", "main");

        let program = ship(&repo, &settings(), Some(&connector), None).unwrap();
        assert!(program.iter().any(|op| op
            == &Opcode::from(UpdateProposalTarget {
                proposal_number: 5,
                new_target: "main".into(),
            })));
        assert!(!program
            .iter()
            .any(|op| matches!(op, Opcode::UpdateProposalTarget(u) if u.proposal_number == 6)));

        run(&program, &RunContext::with_connector(&repo, &connector));
        assert_eq!(repo.current(), "main");
        assert_eq!(repo.sha("feature"), "");
        assert_eq!(connector.target_of(5), Some("main".into()));
        assert_eq!(
            repo.config_value("branch.child.twig-parent").unwrap().as_deref(),
            Some("main")
        );
        assert_eq!(repo.config_value("branch.feature.twig-parent").unwrap(), None);
        assert!(repo
            .commands()
            .contains(&"git push origin --delete feature".to_string()));
    }

    #[test]
    fn test_ship_returns_to_initial_branch() {
        let repo = FakeRepository::new("other");
        repo.add_branch("main", "m00001");
        repo.add_branch("feature", "f00001");
        let program = ship(&repo, &settings(), None, Some("feature".into())).unwrap();
        assert_eq!(
            program.iter().last(),
            Some(&Opcode::from(Checkout {
                branch: "other".into()
            }))
        );
    }

    #[test]
    fn test_ship_main_branch_fails() {
        let repo = FakeRepository::new("main");
        assert!(ship(&repo, &settings(), None, None).is_err());
        assert!(ship(&repo, &settings(), None, Some("missing".into())).is_err());
    }
}
