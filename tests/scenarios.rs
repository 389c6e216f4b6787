// End-to-end import and export runs against a mock appliance.

mod common;

use common::{api_path, fast_poll, sample_config, Appliance};
use fdm_config::models::JobStatus;
use fdm_config::report::{Level, MemoryReporter};
use fdm_config::ui;
use fdm_config::workflow::{self, ExportOptions, ImportOptions, Stage};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn mount_upload(appliance: &Appliance, disk_file_name: &str) {
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/uploadconfigfile")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "diskFileName": disk_file_name,
                "sizeBytes": 4096
            }))),
    );
}

fn mount_import_job(appliance: &Appliance, disk_file_name: &str) {
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/configimport")))
            .and(body_partial_json(json!({
                "diskFileName": disk_file_name,
                "autoDeploy": false,
                "allowPendingChange": false,
                "preserveConfigFile": true,
                "type": "scheduleconfigimport"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobHistoryUuid": "imp-42",
                "type": "configimportjobstatus"
            })))
            .expect(1),
    );
}

fn import_options() -> ImportOptions {
    ImportOptions {
        poll: fast_poll(),
        ..ImportOptions::default()
    }
}

#[test]
fn import_succeeds_and_keeps_uploaded_file() {
    let appliance = Appliance::start();
    let client = appliance.client();
    mount_upload(&appliance, "site-a.zip");
    mount_import_job(&appliance, "site-a.zip");
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configimportstatus/imp-42")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
            .up_to_n_times(2)
            .with_priority(1),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configimportstatus/imp-42")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "statusMessage": "Import done",
                "messages": [],
                "autoDeploy": false
            }))),
    );
    appliance.mount(
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0),
    );

    let dir = tempdir().unwrap();
    let source = dir.path().join("site-a.json");
    std::fs::write(&source, sample_config(3)).unwrap();
    let reporter = MemoryReporter::new();

    let outcome =
        workflow::import_configuration(&client, &reporter, &source, &import_options()).unwrap();
    assert_eq!(outcome.summary.object_count, 3);
    assert_eq!(outcome.disk_file_name, "site-a.zip");
    assert_eq!(outcome.status.status, JobStatus::Success);
    assert_eq!(appliance.requests_to("jobs/configimportstatus/imp-42").len(), 3);
    assert!(reporter.contains(Level::Detail, "Objects: 3 total"));
    assert!(reporter.contains(Level::Success, "Import job created: imp-42"));
    assert!(reporter.contains(Level::Success, "Import completed successfully!"));
    appliance.verify();
}

#[test]
fn import_blocked_by_pending_changes_cleans_up() {
    let appliance = Appliance::start();
    let client = appliance.client();
    mount_upload(&appliance, "site-b.zip");
    mount_import_job(&appliance, "site-b.zip");
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configimportstatus/imp-42")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "statusMessage": "Cannot import while there are changes pending deployment",
                "messages": ["Deploy or discard pending changes first"]
            }))),
    );
    appliance.mount(
        Mock::given(method("DELETE"))
            .and(path(api_path("action/configfiles/site-b.zip")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1),
    );

    let dir = tempdir().unwrap();
    let source = dir.path().join("site-b.json");
    std::fs::write(&source, sample_config(2)).unwrap();
    let reporter = MemoryReporter::new();

    let err = workflow::import_configuration(&client, &reporter, &source, &import_options())
        .unwrap_err();
    assert_eq!(err.stage, Stage::WaitForJob);
    assert!(reporter.contains(Level::Warning, "pending deployments"));
    assert!(reporter.contains(Level::Detail, "Either 'Deploy' or 'Discard' pending changes"));
    assert!(reporter.contains(Level::Detail, "Deploy or discard pending changes first"));
    assert!(reporter.contains(Level::Success, "Deleted file: site-b.zip"));
    assert_eq!(ui::exit_status(&reporter, Err(err.into())), 1);
    appliance.verify();
}

#[test]
fn invalid_file_stops_before_any_upload() {
    let appliance = Appliance::start();
    let client = appliance.client();
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/uploadconfigfile")))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    );

    let dir = tempdir().unwrap();
    let source = dir.path().join("broken.json");
    std::fs::write(&source, r#"[{"type": "networkobject"}]"#).unwrap();
    let reporter = MemoryReporter::new();

    let err = workflow::import_configuration(&client, &reporter, &source, &import_options())
        .unwrap_err();
    assert_eq!(err.stage, Stage::Validate);
    assert!(reporter.contains(Level::Failure, "first object must be metadata"));
    appliance.verify();
}

#[test]
fn export_detects_new_file_when_job_record_disappears() {
    let appliance = Appliance::start();
    let client = appliance.client();
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/configexport")))
            .and(body_partial_json(json!({
                "configExportType": "FULL_EXPORT",
                "type": "scheduleconfigexport",
                "doNotEncrypt": true,
                "deployedObjectsOnly": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "exp-7"}))),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configexportstatus/exp-7")))
            .respond_with(ResponseTemplate::new(404)),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/configfiles")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"diskFileName": "old.zip", "sizeBytes": 10}]
            })))
            .up_to_n_times(2)
            .with_priority(1),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/configfiles")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"diskFileName": "old.zip", "sizeBytes": 10},
                    {"diskFileName": "Exported-at-2026-10-19.zip", "sizeBytes": 5000}
                ]
            }))),
    );
    let payload = vec![7u8; 5000];
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/downloadconfigfile/Exported-at-2026-10-19.zip")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone())),
    );

    let dir = tempdir().unwrap();
    let options = ExportOptions {
        disk_file_name: None,
        output_dir: dir.path().to_path_buf(),
        poll: fast_poll(),
    };
    let reporter = MemoryReporter::new();

    let outcome = workflow::export_configuration(&client, &reporter, &options).unwrap();
    assert_eq!(outcome.disk_file_name, "Exported-at-2026-10-19.zip");
    assert_eq!(outcome.file.path, dir.path().join("Exported-at-2026-10-19.zip"));
    assert_eq!(outcome.file.bytes_written, payload.len() as u64);
    assert_eq!(
        std::fs::metadata(&outcome.file.path).unwrap().len(),
        outcome.file.bytes_written
    );
    assert!(reporter.contains(Level::Success, "Found new export file"));
    assert!(reporter.contains(Level::Info, "File size: 5,000 bytes"));
    assert!(appliance.requests_to("jobs/configexportstatus/exp-7").len() >= 2);
}

#[test]
fn export_uses_custom_name_and_status_file_name() {
    let appliance = Appliance::start();
    let client = appliance.client();
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/configfiles")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []}))),
    );
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/configexport")))
            .and(body_partial_json(json!({"diskFileName": "nightly"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "exp-8"})))
            .expect(1),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configexportstatus/exp-8")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "diskFileName": "nightly.zip"
            }))),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/downloadconfigfile/nightly.zip")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zipbytes".to_vec())),
    );

    let dir = tempdir().unwrap();
    let options = ExportOptions {
        disk_file_name: Some("nightly".into()),
        output_dir: dir.path().to_path_buf(),
        poll: fast_poll(),
    };
    let reporter = MemoryReporter::new();

    let outcome = workflow::export_configuration(&client, &reporter, &options).unwrap();
    assert_eq!(outcome.file.path, dir.path().join("nightly.zip"));
    assert_eq!(outcome.file.bytes_written, 8);
    appliance.verify();
}

#[test]
fn export_job_failure_stops_before_download() {
    let appliance = Appliance::start();
    let client = appliance.client();
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("action/configfiles")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []}))),
    );
    appliance.mount(
        Mock::given(method("POST"))
            .and(path(api_path("action/configexport")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "exp-9"}))),
    );
    appliance.mount(
        Mock::given(method("GET"))
            .and(path(api_path("jobs/configexportstatus/exp-9")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ERROR",
                "statusMessage": "disk full"
            }))),
    );

    let dir = tempdir().unwrap();
    let options = ExportOptions {
        disk_file_name: None,
        output_dir: dir.path().to_path_buf(),
        poll: fast_poll(),
    };
    let reporter = MemoryReporter::new();

    let err = workflow::export_configuration(&client, &reporter, &options).unwrap_err();
    assert_eq!(err.stage, Stage::WaitForJob);
    assert!(reporter.contains(Level::Failure, "Export failed: disk full"));
    assert!(appliance
        .requests()
        .iter()
        .all(|r| !r.url.path().contains("downloadconfigfile")));
}
