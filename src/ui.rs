// UI layer: interactive prompts using `dialoguer` and the two CLI drivers.
// The drivers only collect input and sequence `workflow` calls; everything
// they print goes through the `Reporter` handed in by the binary.

use crate::api::{FdmClient, FdmSession};
use crate::config::Settings;
use crate::models::ImportJobStatus;
use crate::report::Reporter;
use crate::workflow::{self, ExportOptions, ImportOptions, WorkflowFailed};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password, Select};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::warn;

/// Shown when the operator interrupts a run with Ctrl-C.
pub const CANCELLED: &str = "Operation cancelled by user";

/// The operator declined to continue, or a step failed and was reported.
#[derive(Debug, Error)]
#[error("operation aborted")]
pub struct Aborted;

/// Interactive import: prompt, authenticate, validate, upload, import.
pub fn run_import(reporter: &dyn Reporter) -> Result<()> {
    banner("FDM Configuration Importer");
    let settings = Settings::load()?;

    let host: String = Input::new().with_prompt("Target FDM IP address").interact_text()?;
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;
    let file_input: String = Input::new()
        .with_prompt("Configuration file path")
        .interact_text()?;
    let config_file = find_config_file(reporter, Path::new(file_input.trim()))?.ok_or(Aborted)?;

    let options = ImportOptions {
        poll: settings.import_poll(),
        ..ImportOptions::default()
    };
    reporter.info("Using default import settings:");
    reporter.detail(&format!("Auto-deploy: {}", options.auto_deploy));
    reporter.detail(&format!("Allow pending changes: {}", options.allow_pending_change));
    reporter.detail(&format!("Keep uploaded file: {}", options.preserve_config_file));

    let client = connect(reporter, &host, &settings, &username, &password)?;
    let outcome = workflow::import_configuration(&client, reporter, &config_file, &options)?;

    println!();
    banner("CONFIGURATION IMPORT COMPLETED SUCCESSFULLY!");
    report_deployment_state(reporter, &outcome.status);
    Ok(())
}

fn report_deployment_state(reporter: &dyn Reporter, status: &ImportJobStatus) {
    if status.auto_deploy == Some(true) {
        reporter.success("Configuration has been deployed");
        return;
    }
    reporter.warning("IMPORTANT: Configuration imported but NOT deployed yet");
    reporter.info("Manual deployment required to activate changes:");
    reporter.detail("1. Log into FDM web interface");
    reporter.detail("2. Navigate to Deploy > Deployment");
    reporter.detail("3. Review pending changes");
    reporter.detail("4. Click 'Deploy' to apply configuration");
}

/// Interactive export: prompt, authenticate, export, download, optionally
/// delete the file from the appliance.
pub fn run_export(reporter: &dyn Reporter) -> Result<()> {
    banner("FDM Configuration Exporter");
    let settings = Settings::load()?;

    let host: String = Input::new().with_prompt("FDM IP address").interact_text()?;
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;
    let output_dir: String = Input::new()
        .with_prompt("Download path")
        .default(".".to_string())
        .interact_text()?;
    let disk_file_name: String = Input::new()
        .with_prompt("Custom filename (optional)")
        .allow_empty(true)
        .interact_text()?;

    let client = connect(reporter, &host, &settings, &username, &password)?;
    workflow::list_config_files(&client, reporter);

    let options = ExportOptions {
        disk_file_name: Some(disk_file_name.trim().to_string()).filter(|n| !n.is_empty()),
        output_dir: PathBuf::from(output_dir.trim()),
        poll: settings.export_poll(),
    };
    let outcome = workflow::export_configuration(&client, reporter, &options)?;
    reporter.success(&format!(
        "Configuration exported successfully to: {}",
        outcome.file.path.display()
    ));

    let delete = Confirm::new()
        .with_prompt("Delete file from FDM?")
        .default(false)
        .interact()?;
    if delete {
        workflow::delete_config_file(&client, reporter, &outcome.disk_file_name);
    }
    Ok(())
}

/// Open a session and authenticate; failures are reported here.
fn connect(
    reporter: &dyn Reporter,
    host: &str,
    settings: &Settings,
    username: &str,
    password: &str,
) -> Result<FdmClient> {
    let session = FdmSession::new(host, settings)?;
    match session.authenticate(username.trim(), password) {
        Ok(client) => {
            reporter.success("Authentication successful");
            Ok(client)
        }
        Err(e) => {
            reporter.failure(&format!("Authentication failed: {e}"));
            Err(Aborted.into())
        }
    }
}

/// Resolve the configuration file. When `input` does not exist, offer the
/// `*.txt`, `*.json` and `*.zip` files of the current directory instead.
fn find_config_file(reporter: &dyn Reporter, input: &Path) -> Result<Option<PathBuf>> {
    if input.is_file() {
        return Ok(Some(input.to_path_buf()));
    }
    reporter.failure(&format!("File not found: {}", input.display()));

    let candidates = candidate_files(Path::new("."))?;
    if candidates.is_empty() {
        reporter.info("No configuration files found");
        return Ok(None);
    }

    let names: Vec<String> = candidates
        .iter()
        .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
        .collect();
    let choice = Select::new()
        .with_prompt("Configuration files found in current directory (Esc to exit)")
        .items(&names)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| candidates[i].clone()))
}

fn candidate_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "json" | "zip"));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn banner(title: &str) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{}", format!("{title:^60}").bold());
    println!("{rule}");
    println!();
}

/// Map a driver result to the process exit status (0 or 1), reporting
/// anything that was not already reported.
pub fn exit_status(reporter: &dyn Reporter, result: Result<()>) -> u8 {
    let err = match result {
        Ok(()) => return 0,
        Err(err) => err,
    };
    if err.downcast_ref::<WorkflowFailed>().is_some() || err.downcast_ref::<Aborted>().is_some() {
        return 1;
    }
    let interrupted = err
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::Interrupted);
    if interrupted {
        reporter.warning(CANCELLED);
    } else {
        reporter.failure(&format!("Unexpected error: {err:#}"));
    }
    1
}

/// Print the cancellation notice to `out`; returns the exit status.
fn cancel(out: &mut impl Write) -> i32 {
    let _ = writeln!(out, "\n{} {CANCELLED}", "⚠".yellow().bold());
    1
}

/// Turn Ctrl-C during requests, transfers and poll sleeps into the
/// cancellation notice and exit status 1. Installing twice is a no-op.
pub fn install_interrupt_handler() -> std::result::Result<(), ctrlc::Error> {
    match ctrlc::set_handler(|| std::process::exit(cancel(&mut std::io::stderr()))) {
        Err(ctrlc::Error::MultipleHandlers) => Ok(()),
        other => other,
    }
}

/// Entry point shared by the binaries.
pub fn run(reporter: &dyn Reporter, driver: fn(&dyn Reporter) -> Result<()>) -> ExitCode {
    if let Err(e) = install_interrupt_handler() {
        warn!(error = %e, "Ctrl-C handler not installed");
    }
    ExitCode::from(exit_status(reporter, driver(reporter)))
}
