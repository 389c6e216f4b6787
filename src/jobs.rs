// Polling of asynchronous appliance jobs.
//
// A submitted job moves through `QUEUED -> PENDING -> RUNNING` and ends in
// `SUCCESS`, `FAILED` or `ERROR`. The poller reads the status endpoint on a
// fixed interval until one of those terminal states shows up or the
// client-side deadline passes. A 404 on the status endpoint is an
// inconclusive reading, never a failure.
//
// Export jobs have a second, separate detection path: some appliances drop
// the job record before the status endpoint reports `SUCCESS`, so when no
// status is available the poller diffs the artifact list against a snapshot
// taken before polling started.

use crate::error::Result;
use crate::models::{ConfigFile, ExportJobStatus, ImportJobStatus, JobStatus};
use crate::report::Reporter;
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Status and listing calls the poller needs. `FdmClient` implements this;
/// tests substitute scripted fakes.
///
/// Every call must give up once `deadline` has passed, so a slow appliance
/// cannot stretch polling past its timeout.
pub trait JobApi {
    /// `Ok(None)` when the appliance has no record of the job (404).
    fn import_status(&self, job_id: &str, deadline: Instant) -> Result<Option<ImportJobStatus>>;

    /// `Ok(None)` when the appliance has no record of the job (404).
    fn export_status(&self, job_id: &str, deadline: Instant) -> Result<Option<ExportJobStatus>>;

    fn config_files(&self, deadline: Instant) -> Result<Vec<ConfigFile>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn import_defaults() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(600))
    }

    pub fn export_defaults() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(300))
    }
}

/// Why a job did not end in `SUCCESS`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    #[error("job ended with {status}: {message}")]
    Failed {
        status: JobStatus,
        message: String,
        details: Vec<String>,
    },

    #[error("gave up after {} seconds", .0.as_secs())]
    TimedOut(Duration),

    #[error("job succeeded but reported no file name")]
    MissingFileName,
}

impl JobFailure {
    pub fn is_pending_deployment(&self) -> bool {
        match self {
            JobFailure::Failed { message, .. } => indicates_pending_deployment(message),
            _ => false,
        }
    }
}

/// Whether a job failure message says the appliance has undeployed changes
/// blocking the import. The appliance exposes no structured code for this.
pub fn indicates_pending_deployment(message: &str) -> bool {
    message.contains("objects to be deployed") || message.to_lowercase().contains("pending")
}

/// Fixed-interval loop shared by both pollers. `check` returns `Some` to stop
/// and is handed the deadline its requests must respect.
fn poll_until<T>(
    settings: PollSettings,
    deadline: Instant,
    mut check: impl FnMut(Instant) -> Option<std::result::Result<T, JobFailure>>,
) -> std::result::Result<T, JobFailure> {
    let mut attempt = 0u32;
    while Instant::now() < deadline {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        debug!(attempt, ?remaining, "Polling job status");
        if let Some(outcome) = check(deadline) {
            return outcome;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(settings.interval.min(remaining));
    }
    Err(JobFailure::TimedOut(settings.timeout))
}

/// Poll an import job until it finishes. Failures are reported before
/// returning; the pending-deployment case gets remediation steps.
pub fn wait_for_import<A: JobApi + ?Sized>(
    api: &A,
    reporter: &dyn Reporter,
    job_id: &str,
    settings: PollSettings,
) -> std::result::Result<ImportJobStatus, JobFailure> {
    let deadline = Instant::now() + settings.timeout;
    let outcome = poll_until(settings, deadline, |deadline| {
        let status = match api.import_status(job_id, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reporter.warning("Job status not available");
                return None;
            }
            Err(e) => {
                warn!(job_id, error = %e, "Import status check failed");
                reporter.failure(&format!("Failed to check import status: {e}"));
                return None;
            }
        };

        match status.status {
            JobStatus::Success => Some(Ok(status)),
            s if s.is_failure() => Some(Err(JobFailure::Failed {
                status: s,
                message: status.message().to_string(),
                details: status.details(),
            })),
            s if s.is_in_progress() => {
                reporter.progress(&format!("Import in progress... ({s})"));
                None
            }
            s => {
                reporter.info(&format!("Import status: {s} - {}", status.message()));
                None
            }
        }
    });

    match &outcome {
        Ok(_) => reporter.success("Import completed successfully!"),
        Err(failure) => report_import_failure(reporter, failure),
    }
    outcome
}

fn report_import_failure(reporter: &dyn Reporter, failure: &JobFailure) {
    match failure {
        JobFailure::Failed {
            message, details, ..
        } => {
            reporter.failure(&format!("Import failed: {message}"));
            if failure.is_pending_deployment() {
                reporter.warning("RESOLUTION: There are pending deployments on the FDM device.");
                reporter.info("Please deploy or discard pending changes before importing:");
                reporter.detail("1. Log into FDM web interface");
                reporter.detail("2. Go to Deploy > Deployment");
                reporter.detail("3. Either 'Deploy' or 'Discard' pending changes");
                reporter.detail("4. Try running the import again");
            }
            if !details.is_empty() {
                reporter.info("Error details:");
                for detail in details {
                    reporter.detail(detail);
                }
            }
        }
        JobFailure::TimedOut(timeout) => {
            reporter.failure(&format!("Import timeout after {} seconds", timeout.as_secs()))
        }
        JobFailure::MissingFileName => reporter.failure(&failure.to_string()),
    }
}

/// Poll an export job until it finishes and return the name of the file it
/// produced on the appliance.
pub fn wait_for_export<A: JobApi + ?Sized>(
    api: &A,
    reporter: &dyn Reporter,
    job_id: &str,
    settings: PollSettings,
) -> std::result::Result<String, JobFailure> {
    let deadline = Instant::now() + settings.timeout;
    let snapshot = match api.config_files(deadline) {
        Ok(files) => Some(file_names(&files)),
        Err(e) => {
            warn!(error = %e, "Could not snapshot configuration files; new-file detection disabled");
            None
        }
    };

    let outcome = poll_until(settings, deadline, |deadline| {
        let status = match api.export_status(job_id, deadline) {
            Ok(status) => status,
            Err(e) => {
                warn!(job_id, error = %e, "Export status check failed");
                reporter.failure(&format!("Failed to check export status: {e}"));
                None
            }
        };

        match status {
            Some(status) => match status.status {
                JobStatus::Success => Some(
                    status
                        .disk_file_name
                        .filter(|name| !name.is_empty())
                        .ok_or(JobFailure::MissingFileName),
                ),
                s if s.is_failure() => Some(Err(JobFailure::Failed {
                    status: s,
                    message: status.message().to_string(),
                    details: Vec::new(),
                })),
                s => {
                    if s.is_in_progress() {
                        reporter.progress(&format!("Export in progress... ({s})"));
                    }
                    None
                }
            },
            None => snapshot
                .as_ref()
                .and_then(|before| detect_new_file(api, before, deadline))
                .map(|name| {
                    reporter.success(&format!("Found new export file: {name}"));
                    Ok(name)
                }),
        }
    });

    match &outcome {
        Ok(name) => reporter.success(&format!("Export completed: {name}")),
        Err(JobFailure::TimedOut(timeout)) => {
            reporter.failure(&format!("Export timeout after {} seconds", timeout.as_secs()))
        }
        Err(JobFailure::Failed { message, .. }) => {
            reporter.failure(&format!("Export failed: {message}"))
        }
        Err(failure @ JobFailure::MissingFileName) => reporter.failure(&failure.to_string()),
    }
    outcome
}

fn file_names(files: &[ConfigFile]) -> HashSet<String> {
    files.iter().map(|f| f.disk_file_name.clone()).collect()
}

/// Newest file name (last in listing order) not present in `before`.
fn detect_new_file<A: JobApi + ?Sized>(
    api: &A,
    before: &HashSet<String>,
    deadline: Instant,
) -> Option<String> {
    let current = match api.config_files(deadline) {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "Listing configuration files failed");
            return None;
        }
    };
    current
        .into_iter()
        .map(|f| f.disk_file_name)
        .filter(|name| !before.contains(name))
        .last()
}
