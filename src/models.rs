// Wire types exchanged with the FDM REST API. Field names follow the
// appliance's camelCase JSON; only the fields this tool reads are modelled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Password-grant request sent to `fdm/token`.
#[derive(Serialize, Debug)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
}

/// A configuration file resident on the appliance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub disk_file_name: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub date_modified: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ConfigFileList {
    #[serde(default)]
    pub items: Vec<ConfigFile>,
}

/// Response of `action/uploadconfigfile`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub disk_file_name: String,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Payload of `action/configimport`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobRequest {
    pub disk_file_name: String,
    pub preserve_config_file: bool,
    pub auto_deploy: bool,
    pub allow_pending_change: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ImportJobRequest {
    pub fn new(disk_file_name: impl Into<String>) -> Self {
        Self {
            disk_file_name: disk_file_name.into(),
            preserve_config_file: true,
            auto_deploy: false,
            allow_pending_change: false,
            kind: "scheduleconfigimport",
        }
    }
}

/// Payload of `action/configexport`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobRequest {
    pub config_export_type: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub do_not_encrypt: bool,
    pub deployed_objects_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_file_name: Option<String>,
}

impl ExportJobRequest {
    pub fn full(disk_file_name: Option<String>) -> Self {
        Self {
            config_export_type: "FULL_EXPORT",
            kind: "scheduleconfigexport",
            do_not_encrypt: true,
            deployed_objects_only: false,
            disk_file_name: disk_file_name.filter(|name| !name.is_empty()),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportJobCreated {
    pub job_history_uuid: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ExportJobCreated {
    pub id: Option<String>,
}

/// Lifecycle of an appliance job. Any value the appliance reports that is
/// not listed here is read as `Unknown`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Pending,
    Running,
    Success,
    Failed,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_in_progress(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Pending | JobStatus::Running)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Error => "ERROR",
            JobStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Response of `jobs/configimportstatus/{id}`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobStatus {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Detail entries; the appliance sends strings or objects here.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub auto_deploy: Option<bool>,
}

impl ImportJobStatus {
    pub fn message(&self) -> &str {
        self.status_message.as_deref().unwrap_or_default()
    }

    /// Detail messages rendered as plain text.
    pub fn details(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| match m {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Response of `jobs/configexportstatus/{id}`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobStatus {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub disk_file_name: Option<String>,
}

impl ExportJobStatus {
    pub fn message(&self) -> &str {
        self.status_message.as_deref().unwrap_or_default()
    }
}
