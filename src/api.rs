// API client module: a small blocking HTTP client that talks to the FDM
// REST API under `https://<host>/api/fdm/latest/`.
//
// `FdmSession` is the unauthenticated handle; a successful `authenticate`
// turns it into an `FdmClient` that carries the bearer token. Every call on
// the client goes through `request`, which applies the token and the default
// timeout and turns non-2xx answers into `Error::Status`.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::jobs::JobApi;
use crate::models::{
    ConfigFile, ConfigFileList, ExportJobCreated, ExportJobRequest, ExportJobStatus,
    ImportJobCreated, ImportJobRequest, ImportJobStatus, TokenRequest, TokenResponse, UploadedFile,
};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Path prefix of every REST endpoint on the appliance.
pub const API_PREFIX: &str = "/api/fdm/latest";

/// Chunk size used when streaming downloads to disk.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Floor for a timeout derived from a polling deadline.
const MIN_REQUEST_BUDGET: Duration = Duration::from_millis(1);

/// Unauthenticated connection to one appliance.
#[derive(Clone, Debug)]
pub struct FdmSession {
    http: Client,
    base_url: String,
    request_timeout: Duration,
    transfer_timeout: Duration,
}

/// Authenticated client; every request carries the bearer token.
#[derive(Clone)]
pub struct FdmClient {
    session: FdmSession,
    auth: HeaderValue,
}

impl std::fmt::Debug for FdmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdmClient")
            .field("session", &self.session)
            .field("auth", &"<redacted>")
            .finish()
    }
}

/// Turn user input into a base URL. A bare host implies HTTPS.
pub fn base_url_for(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl FdmSession {
    pub fn new(host: &str, settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(FdmSession {
            http,
            base_url: base_url_for(host),
            request_timeout: settings.request_timeout(),
            transfer_timeout: settings.transfer_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, endpoint.trim_start_matches('/'))
    }

    /// Exchange credentials for a bearer token (password grant). The session
    /// itself stays unauthenticated, so a failed attempt can be retried.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<FdmClient> {
        let url = self.url("fdm/token");
        debug!(%url, username, "Requesting access token");
        let res = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&TokenRequest {
                grant_type: "password",
                username,
                password,
            })
            .send()?;
        let token: TokenResponse = check_status(res)?.json()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|_| Error::UnexpectedResponse("access token is not a valid header value".into()))?;
        Ok(FdmClient {
            session: self.clone(),
            auth,
        })
    }
}

/// Map a non-2xx response to `Error::Status`, keeping the body for the message.
fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    debug!(%status, %body, "Request rejected");
    Err(Error::Status { status, body })
}

/// The appliance-assigned name as a path that stays inside the download
/// directory. Anything but a single plain file name is refused.
fn local_file_name(filename: &str) -> Result<&Path> {
    let path = Path::new(filename);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !filename.contains(['/', '\\']) => Ok(path),
        _ => Err(Error::UnexpectedResponse(format!(
            "refusing to save file with unsafe name {filename:?}"
        ))),
    }
}

/// Result of a finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes_written: u64,
}

impl FdmClient {
    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// Issue `method` against `endpoint` (relative to the API prefix) with the
    /// bearer header and default timeout applied. `customize` may add a body
    /// or override the timeout.
    pub fn request<F>(&self, method: Method, endpoint: &str, customize: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.session.url(endpoint);
        debug!(%method, %url, "Sending request");
        let builder = self
            .session
            .http
            .request(method, &url)
            .header(AUTHORIZATION, self.auth.clone())
            .timeout(self.session.request_timeout);
        check_status(customize(builder).send()?)
    }

    /// Configuration files currently stored on the appliance.
    pub fn list_config_files(&self) -> Result<Vec<ConfigFile>> {
        self.list_config_files_within(self.session.request_timeout)
    }

    fn list_config_files_within(&self, timeout: Duration) -> Result<Vec<ConfigFile>> {
        let list: ConfigFileList = self
            .request(Method::GET, "action/configfiles", |r| r.timeout(timeout))?
            .json()?;
        Ok(list.items)
    }

    /// Default request timeout, shortened so the request ends by `deadline`.
    fn budget(&self, deadline: Instant) -> Duration {
        deadline
            .saturating_duration_since(Instant::now())
            .min(self.session.request_timeout)
            .max(MIN_REQUEST_BUDGET)
    }

    pub fn delete_config_file(&self, filename: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("action/configfiles/{filename}"), |r| r)?;
        Ok(())
    }

    /// Upload a ZIP container as multipart field `fileToUpload`. Callers
    /// prepare non-ZIP inputs with `archive::UploadFile` first.
    pub fn upload_config_file(&self, zip_path: &Path, file_name: &str) -> Result<UploadedFile> {
        let file = File::open(zip_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(zip_path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let part = multipart::Part::reader(file)
            .file_name(file_name.to_string())
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part("fileToUpload", part);
        let timeout = self.session.transfer_timeout;
        let res = self.request(Method::POST, "action/uploadconfigfile", |r| {
            r.multipart(form).timeout(timeout)
        })?;
        Ok(res.json()?)
    }

    /// Stream `filename` from the appliance into `output_dir`, keeping the
    /// server-assigned name verbatim. Names that would land outside
    /// `output_dir` are rejected before anything is requested.
    pub fn download_config_file(&self, filename: &str, output_dir: &Path) -> Result<DownloadedFile> {
        let local_name = local_file_name(filename)?;
        let timeout = self.session.transfer_timeout;
        let mut res = self.request(
            Method::GET,
            &format!("action/downloadconfigfile/{filename}"),
            |r| r.timeout(timeout),
        )?;

        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(local_name);
        let mut out = File::create(&path)?;
        let mut buf = [0u8; DOWNLOAD_CHUNK_SIZE];
        let mut bytes_written = 0u64;
        loop {
            let n = res.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            bytes_written += n as u64;
        }
        out.flush()?;
        debug!(path = %path.display(), bytes_written, "Download finished");
        Ok(DownloadedFile {
            path,
            bytes_written,
        })
    }

    /// Submit an import job; returns its `jobHistoryUuid`.
    pub fn start_import(&self, request: &ImportJobRequest) -> Result<String> {
        let created: ImportJobCreated = self
            .request(Method::POST, "action/configimport", |r| r.json(request))?
            .json()?;
        created
            .job_history_uuid
            .ok_or_else(|| Error::UnexpectedResponse("import job has no jobHistoryUuid".into()))
    }

    /// Submit an export job; returns its `id`.
    pub fn start_export(&self, request: &ExportJobRequest) -> Result<String> {
        let created: ExportJobCreated = self
            .request(Method::POST, "action/configexport", |r| r.json(request))?
            .json()?;
        created
            .id
            .ok_or_else(|| Error::UnexpectedResponse("export job has no id".into()))
    }

    fn job_status<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Option<T>> {
        match self.request(Method::GET, endpoint, |r| r.timeout(timeout)) {
            Ok(res) => Ok(Some(res.json()?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl JobApi for FdmClient {
    fn import_status(&self, job_id: &str, deadline: Instant) -> Result<Option<ImportJobStatus>> {
        self.job_status(&format!("jobs/configimportstatus/{job_id}"), self.budget(deadline))
    }

    fn export_status(&self, job_id: &str, deadline: Instant) -> Result<Option<ExportJobStatus>> {
        self.job_status(&format!("jobs/configexportstatus/{job_id}"), self.budget(deadline))
    }

    fn config_files(&self, deadline: Instant) -> Result<Vec<ConfigFile>> {
        self.list_config_files_within(self.budget(deadline))
    }
}
