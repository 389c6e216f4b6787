// Library root
// -----------
// Backup and restore of Cisco FDM configurations over the REST API. The two
// binaries (`fdm-import`, `fdm-export`) are thin wrappers around `ui`.
//
// Module responsibilities:
// - `api`: session, authentication and every REST call (request wrapper,
//   artifact transfer, job submission and status).
// - `archive`: ZIP wrapping/extraction and configuration validation.
// - `jobs`: polling of asynchronous import/export jobs.
// - `workflow`: the import and export sequences, free of prompting.
// - `report`: the status-event interface the above narrate through.
// - `ui`: interactive prompts and exit-code policy.
// - `config`, `logging`, `error`, `models`: supporting pieces.
pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod report;
pub mod ui;
pub mod workflow;

pub use api::{FdmClient, FdmSession};
pub use config::Settings;
pub use error::{Error, Result};
pub use report::{ConsoleReporter, Level, MemoryReporter, Reporter};
