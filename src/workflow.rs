// Import and export sequences without any prompting.
//
// Each step reports its outcome through a `Reporter` and a failed step
// stops the sequence with `WorkflowFailed`, naming the step. The CLI in
// `ui` wraps these with prompts and exit codes.

use crate::api::{DownloadedFile, FdmClient};
use crate::archive::{self, ConfigSummary, UploadFile};
use crate::jobs::{self, PollSettings};
use crate::models::{ConfigFile, ExportJobRequest, ImportJobRequest, ImportJobStatus, UploadedFile};
use crate::report::Reporter;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Upload,
    SubmitJob,
    WaitForJob,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validate => "validation",
            Stage::Upload => "upload",
            Stage::SubmitJob => "job submission",
            Stage::WaitForJob => "job",
            Stage::Download => "download",
        };
        f.write_str(s)
    }
}

/// A step failed; the details have already been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stage} failed")]
pub struct WorkflowFailed {
    pub stage: Stage,
}

fn failed(stage: Stage) -> WorkflowFailed {
    WorkflowFailed { stage }
}

/// Import options sent with `scheduleconfigimport`.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub auto_deploy: bool,
    pub allow_pending_change: bool,
    pub preserve_config_file: bool,
    pub poll: PollSettings,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            auto_deploy: false,
            allow_pending_change: false,
            preserve_config_file: true,
            poll: PollSettings::import_defaults(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub summary: ConfigSummary,
    pub disk_file_name: String,
    pub status: ImportJobStatus,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Name of the file on the appliance.
    pub disk_file_name: String,
    pub file: DownloadedFile,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Custom name for the file the appliance writes; empty means default.
    pub disk_file_name: Option<String>,
    pub output_dir: PathBuf,
    pub poll: PollSettings,
}

/// Print the appliance's file listing and return it. Failures are reported
/// and yield an empty listing.
pub fn list_config_files(client: &FdmClient, reporter: &dyn Reporter) -> Vec<ConfigFile> {
    match client.list_config_files() {
        Ok(files) if files.is_empty() => {
            reporter.info("No configuration files found");
            files
        }
        Ok(files) => {
            reporter.info(&format!("Available configuration files ({}):", files.len()));
            for file in &files {
                reporter.detail(&format!(
                    "{} ({} bytes) - Modified: {}",
                    file.disk_file_name,
                    group_thousands(file.size_bytes),
                    file.date_modified.as_deref().unwrap_or("unknown")
                ));
            }
            files
        }
        Err(e) => {
            reporter.failure(&format!("Failed to list configuration files: {e}"));
            Vec::new()
        }
    }
}

/// Best-effort removal of a file from the appliance.
pub fn delete_config_file(client: &FdmClient, reporter: &dyn Reporter, filename: &str) -> bool {
    match client.delete_config_file(filename) {
        Ok(()) => {
            reporter.success(&format!("Deleted file: {filename}"));
            true
        }
        Err(e) => {
            reporter.failure(&format!("Failed to delete {filename}: {e}"));
            false
        }
    }
}

/// Check a local configuration file before anything is uploaded.
pub fn validate(reporter: &dyn Reporter, path: &Path) -> Result<ConfigSummary, WorkflowFailed> {
    reporter.info(&format!("Validating configuration file: {}", display_name(path)));

    let result = if archive::is_zip(path) {
        archive::extract_payload(path).and_then(|payload| {
            reporter.detail(&format!("Files in archive: {}", payload.entries.join(", ")));
            reporter.detail(&format!("Using entry: {}", payload.entry_name));
            archive::validate_payload(&payload.contents)
        })
    } else {
        archive::validate_config_file(path)
    };

    match result {
        Ok(summary) => {
            reporter.success("Valid configuration file:");
            reporter.detail(&format!(
                "Hardware Model: {}",
                summary.hardware_model.as_deref().unwrap_or("Unknown")
            ));
            reporter.detail(&format!(
                "Software Version: {}",
                summary.software_version.as_deref().unwrap_or("Unknown")
            ));
            reporter.detail(&format!("Objects: {} total", summary.object_count));
            Ok(summary)
        }
        Err(e) => {
            reporter.failure(&e.to_string());
            Err(failed(Stage::Validate))
        }
    }
}

/// Upload a configuration file, wrapping non-ZIP input first. The temporary
/// wrapper is gone once this returns.
pub fn upload(
    client: &FdmClient,
    reporter: &dyn Reporter,
    path: &Path,
) -> Result<UploadedFile, WorkflowFailed> {
    let prepared = UploadFile::prepare(path).map_err(|e| {
        reporter.failure(&format!("Upload failed: {e}"));
        failed(Stage::Upload)
    })?;
    if prepared.is_wrapped() {
        reporter.success(&format!(
            "Created ZIP archive {} from {}",
            prepared.file_name(),
            display_name(path)
        ));
    }

    reporter.info(&format!("Uploading configuration file: {}", prepared.file_name()));
    let result = client.upload_config_file(prepared.path(), &prepared.file_name());
    let wrapper = prepared.is_wrapped().then(|| prepared.path().to_path_buf());
    drop(prepared);
    if let Some(wrapper) = wrapper {
        reporter.detail(&format!("Cleaned up temporary file: {}", wrapper.display()));
    }

    match result {
        Ok(uploaded) => {
            reporter.success(&format!(
                "Upload successful: {} ({} bytes)",
                uploaded.disk_file_name,
                group_thousands(uploaded.size_bytes)
            ));
            Ok(uploaded)
        }
        Err(e) => {
            reporter.failure(&format!("Upload failed: {e}"));
            Err(failed(Stage::Upload))
        }
    }
}

/// Validate, upload, import and wait. When the import job itself fails the
/// uploaded file is deleted from the appliance again.
pub fn import_configuration(
    client: &FdmClient,
    reporter: &dyn Reporter,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome, WorkflowFailed> {
    let summary = validate(reporter, path)?;
    let uploaded = upload(client, reporter, path)?;

    let request = ImportJobRequest {
        auto_deploy: options.auto_deploy,
        allow_pending_change: options.allow_pending_change,
        preserve_config_file: options.preserve_config_file,
        ..ImportJobRequest::new(uploaded.disk_file_name.clone())
    };
    reporter.info("Starting configuration import...");
    reporter.detail(&format!("Auto-deploy: {}", request.auto_deploy));
    reporter.detail(&format!("Allow pending changes: {}", request.allow_pending_change));

    let job_id = match client.start_import(&request) {
        Ok(id) => {
            reporter.success(&format!("Import job created: {id}"));
            id
        }
        Err(e) => {
            reporter.failure(&format!("Import job creation failed: {e}"));
            return Err(failed(Stage::SubmitJob));
        }
    };

    match jobs::wait_for_import(client, reporter, &job_id, options.poll) {
        Ok(status) => Ok(ImportOutcome {
            summary,
            disk_file_name: uploaded.disk_file_name,
            status,
        }),
        Err(_) => {
            reporter.failure("Configuration import failed");
            delete_config_file(client, reporter, &uploaded.disk_file_name);
            Err(failed(Stage::WaitForJob))
        }
    }
}

/// Export the full configuration and download the resulting file.
pub fn export_configuration(
    client: &FdmClient,
    reporter: &dyn Reporter,
    options: &ExportOptions,
) -> Result<ExportOutcome, WorkflowFailed> {
    reporter.info("Starting full configuration export...");
    let request = ExportJobRequest::full(options.disk_file_name.clone());
    let job_id = match client.start_export(&request) {
        Ok(id) => {
            reporter.success(&format!("Export job created: {id}"));
            id
        }
        Err(e) => {
            reporter.failure(&format!("Export job creation failed: {e}"));
            return Err(failed(Stage::SubmitJob));
        }
    };

    let filename = jobs::wait_for_export(client, reporter, &job_id, options.poll)
        .map_err(|_| failed(Stage::WaitForJob))?;

    reporter.info(&format!("Downloading {filename}..."));
    match client.download_config_file(&filename, &options.output_dir) {
        Ok(downloaded) => {
            reporter.success(&format!("Downloaded: {}", downloaded.path.display()));
            reporter.info(&format!(
                "File size: {} bytes",
                group_thousands(downloaded.bytes_written)
            ));
            Ok(ExportOutcome {
                disk_file_name: filename,
                file: downloaded,
            })
        }
        Err(e) => {
            reporter.failure(&format!("Download failed: {e}"));
            Err(failed(Stage::Download))
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Level, MemoryReporter};
    use tempfile::tempdir;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn validate_reports_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"[{"type":"metadata","hardwareModel":"Firepower 2110","softwareVersion":"7.0"},{},{}]"#,
        )
        .unwrap();
        let reporter = MemoryReporter::new();

        let summary = validate(&reporter, &path).unwrap();
        assert_eq!(summary.object_count, 3);
        assert!(reporter.contains(Level::Detail, "Hardware Model: Firepower 2110"));
        assert!(reporter.contains(Level::Detail, "Objects: 3 total"));
    }

    #[test]
    fn validate_failure_names_the_stage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "[]").unwrap();
        let reporter = MemoryReporter::new();

        let err = validate(&reporter, &path).unwrap_err();
        assert_eq!(err.stage, Stage::Validate);
        assert!(reporter.contains(Level::Failure, "non-empty JSON array"));
    }
}
