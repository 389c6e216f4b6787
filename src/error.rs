// Error types shared by the library modules. The binaries wrap these in
// `anyhow` at the top level; everything below them propagates `Error`.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection, TLS or body decoding failure inside reqwest.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The appliance answered with a non-2xx status.
    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("invalid ZIP file {}: {source}", .path.display())]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {} contains no files", .0.display())]
    EmptyArchive(PathBuf),

    #[error("invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration must be a non-empty JSON array")]
    NotAnArray,

    #[error("first object must be metadata")]
    MissingMetadata,

    #[error("unexpected response from appliance: {0}")]
    UnexpectedResponse(String),

    #[error("failed to load settings: {0}")]
    Settings(#[from] Box<figment::Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by the error, if the appliance produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// A 404 from a job status endpoint means the job record is gone or not
    /// visible yet, which callers treat as an inconclusive reading.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
