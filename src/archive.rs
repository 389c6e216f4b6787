// Local handling of configuration files: wrapping plain payloads into the ZIP
// container the appliance expects, pulling the payload back out of a ZIP, and
// checking the payload's shape before anything is sent over the network.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry name used when a plain configuration file is wrapped for upload.
pub const STANDARD_ENTRY_NAME: &str = "full_config.txt";

/// Whether `path` already carries the `.zip` extension (case-insensitive).
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// File ready to be sent to `action/uploadconfigfile`. A wrapped file lives
/// in its own temporary directory, removed when this value is dropped.
#[derive(Debug)]
pub enum UploadFile {
    Original(PathBuf),
    Wrapped { path: PathBuf, _dir: TempDir },
}

impl UploadFile {
    /// Use `.zip` files as-is and wrap anything else into `<stem>.zip`.
    pub fn prepare(source: &Path) -> Result<Self> {
        if !source.is_file() {
            return Err(Error::FileNotFound(source.to_path_buf()));
        }
        if is_zip(source) {
            return Ok(UploadFile::Original(source.to_path_buf()));
        }

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("config");
        let dir = tempfile::Builder::new().prefix("fdm-upload-").tempdir()?;
        let path = dir.path().join(format!("{stem}.zip"));
        wrap_in_zip(source, &path)?;
        Ok(UploadFile::Wrapped { path, _dir: dir })
    }

    pub fn path(&self) -> &Path {
        match self {
            UploadFile::Original(path) => path,
            UploadFile::Wrapped { path, .. } => path,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, UploadFile::Wrapped { .. })
    }

    /// File name sent in the multipart part.
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.zip".to_string())
    }
}

/// Write `source` into a new deflate-compressed ZIP at `dest` as the single
/// entry [`STANDARD_ENTRY_NAME`].
pub fn wrap_in_zip(source: &Path, dest: &Path) -> Result<()> {
    debug!(source = %source.display(), dest = %dest.display(), "Wrapping configuration in ZIP");
    let mut input = File::open(source)?;
    let mut writer = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(STANDARD_ENTRY_NAME, options)
        .map_err(|source| Error::InvalidArchive {
            path: dest.to_path_buf(),
            source,
        })?;
    std::io::copy(&mut input, &mut writer)?;
    let mut file = writer.finish().map_err(|source| Error::InvalidArchive {
        path: dest.to_path_buf(),
        source,
    })?;
    file.flush()?;
    Ok(())
}

/// Payload pulled out of a configuration ZIP.
#[derive(Debug, Clone)]
pub struct ExtractedPayload {
    pub entries: Vec<String>,
    pub entry_name: String,
    pub contents: Vec<u8>,
}

/// Read the configuration payload from a ZIP container. The payload is the
/// first entry that looks like JSON (`*.json`, `config`, or no extension),
/// falling back to the first file entry.
pub fn extract_payload(zip_path: &Path) -> Result<ExtractedPayload> {
    if !zip_path.is_file() {
        return Err(Error::FileNotFound(zip_path.to_path_buf()));
    }
    let invalid = |source| Error::InvalidArchive {
        path: zip_path.to_path_buf(),
        source,
    };
    let mut archive = ZipArchive::new(File::open(zip_path)?).map_err(invalid)?;
    let entries = file_entries(&mut archive).map_err(invalid)?;

    let entry_name = entries
        .iter()
        .find(|name| looks_like_payload(name))
        .or_else(|| entries.first())
        .cloned()
        .ok_or_else(|| Error::EmptyArchive(zip_path.to_path_buf()))?;
    debug!(archive = %zip_path.display(), entry = %entry_name, "Extracting configuration payload");

    let mut contents = Vec::new();
    archive
        .by_name(&entry_name)
        .map_err(invalid)?
        .read_to_end(&mut contents)?;

    Ok(ExtractedPayload {
        entries,
        entry_name,
        contents,
    })
}

fn file_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> zip::result::ZipResult<Vec<String>> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

fn looks_like_payload(name: &str) -> bool {
    name.ends_with(".json") || name == "config" || !name.contains('.')
}

/// What a valid configuration payload says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    pub hardware_model: Option<String>,
    pub software_version: Option<String>,
    pub object_count: usize,
}

/// Check a payload: a non-empty JSON array whose first element is the
/// `type: "metadata"` object.
pub fn validate_payload(bytes: &[u8]) -> Result<ConfigSummary> {
    let value: Value = serde_json::from_slice(bytes)?;
    let objects = match value {
        Value::Array(objects) if !objects.is_empty() => objects,
        _ => return Err(Error::NotAnArray),
    };

    let metadata = &objects[0];
    if metadata.get("type").and_then(Value::as_str) != Some("metadata") {
        return Err(Error::MissingMetadata);
    }
    let text = |key: &str| metadata.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(ConfigSummary {
        hardware_model: text("hardwareModel"),
        software_version: text("softwareVersion"),
        object_count: objects.len(),
    })
}

/// Validate a configuration file on disk, reading through a ZIP container
/// when the file is one. Nothing is extracted to disk.
pub fn validate_config_file(path: &Path) -> Result<ConfigSummary> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    if is_zip(path) {
        let payload = extract_payload(path)?;
        validate_payload(&payload.contents)
    } else {
        validate_payload(&std::fs::read(path)?)
    }
}
