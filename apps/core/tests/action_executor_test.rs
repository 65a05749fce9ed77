use std::sync::Mutex;

use nugetfind_core::action_executor::{
    perform, ActionOutcome, LaunchError, ProcessLauncher, ShellLauncher,
};
use nugetfind_core::model::{Action, PackageRecord};
use nugetfind_core::page::{Page, PageProfile};
use nugetfind_core::projector::project;

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<(String, bool)>>,
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, command_line: &str, visible_console: bool) -> Result<(), LaunchError> {
        self.launched
            .lock()
            .unwrap()
            .push((command_line.to_string(), visible_console));
        Ok(())
    }
}

#[test]
fn copy_action_returns_text_without_launching() {
    let launcher = RecordingLauncher::default();
    let action = Action::copy_text("Copy Package Name", "Serilog".to_string());

    let outcome = perform(&action, &launcher).unwrap();

    assert_eq!(outcome, ActionOutcome::Copied("Serilog".to_string()));
    assert!(launcher.launched.lock().unwrap().is_empty());
}

#[test]
fn install_action_launches_exact_command_in_visible_console() {
    let launcher = RecordingLauncher::default();
    let item = project(
        &PackageRecord::new("dotnet-ef", "9.0.0", None),
        &PageProfile::from(Page::DotnetTools),
    );
    let install = item
        .secondary
        .iter()
        .find(|action| action.label == "Install tool globally")
        .expect("tools page should offer a global install");

    let outcome = perform(install, &launcher).unwrap();

    assert_eq!(outcome, ActionOutcome::Launched);
    assert_eq!(
        launcher.launched.lock().unwrap().as_slice(),
        &[(
            "dotnet tool install --global dotnet-ef --version 9.0.0".to_string(),
            true
        )]
    );
}

#[test]
fn rejects_empty_command_line() {
    let launcher = RecordingLauncher::default();
    let action = Action::run_process("Run", "   ".to_string(), false);

    assert_eq!(perform(&action, &launcher), Err(LaunchError::EmptyCommand));
    assert!(launcher.launched.lock().unwrap().is_empty());
}

#[test]
fn shell_launcher_rejects_empty_command_line() {
    assert_eq!(ShellLauncher.launch("", false), Err(LaunchError::EmptyCommand));
}

#[cfg(not(target_os = "windows"))]
#[test]
fn shell_launcher_starts_hidden_command() {
    assert!(ShellLauncher.launch("true", false).is_ok());
}
