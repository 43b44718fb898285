//! services/api/src/adapters/file_store.rs
//!
//! A `TimetableStore` backed by two JSON files in a data directory:
//! `timetable.json` holding `{"batches": {CODE: {Monday: [...], ...}}}` and
//! `admin.json` holding the admin credentials.
//!
//! Every write serializes the complete new document, writes it to a sibling
//! `.tmp` file and renames it over the target, so a reader sees either the old
//! file or the new one. Writers to the same file are serialized by a mutex.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use timetable_core::domain::{AdminCredentials, BatchCode, TimetableDocument, WeekSchedule};
use timetable_core::ports::{PortError, PortResult, TimetableStore};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const TIMETABLE_FILE: &str = "timetable.json";
pub const CREDENTIALS_FILE: &str = "admin.json";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Debug)]
pub struct FileStore {
    timetable_path: PathBuf,
    credentials_path: PathBuf,
    timetable_writer: Mutex<()>,
    credentials_writer: Mutex<()>,
}

impl FileStore {
    /// Opens a store rooted at `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: impl AsRef<Path>) -> PortResult<Self> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| io_error(data_dir, e))?;

        Ok(Self {
            timetable_path: data_dir.join(TIMETABLE_FILE),
            credentials_path: data_dir.join(CREDENTIALS_FILE),
            timetable_writer: Mutex::new(()),
            credentials_writer: Mutex::new(()),
        })
    }

    pub fn timetable_path(&self) -> &Path {
        &self.timetable_path
    }

    async fn read_timetable(&self) -> PortResult<TimetableFile> {
        match read_json::<TimetableFile>(&self.timetable_path).await? {
            Some(file) => Ok(file),
            None => Ok(TimetableFile::default()),
        }
    }

    async fn read_credentials(&self) -> PortResult<Option<CredentialsRecord>> {
        read_json(&self.credentials_path).await
    }
}

//=========================================================================================
// On-disk Record Structs
//=========================================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct TimetableFile {
    #[serde(default)]
    batches: BTreeMap<String, WeekSchedule>,
}

impl TimetableFile {
    fn from_domain(documents: Vec<TimetableDocument>) -> Self {
        Self {
            batches: documents
                .into_iter()
                .map(|doc| (doc.batch.into(), doc.schedule))
                .collect(),
        }
    }

    // Keys that are not valid batch codes can only come from hand edits; skip them.
    fn to_domain(self) -> Vec<TimetableDocument> {
        self.batches
            .into_iter()
            .filter_map(|(key, schedule)| match BatchCode::parse(&key) {
                Ok(batch) => Some(TimetableDocument { batch, schedule }),
                Err(_) => {
                    warn!(batch = %key, "Skipping stored batch with an invalid code");
                    None
                }
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct CredentialsRecord {
    username: String,
    password: String,
    token: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> AdminCredentials {
        AdminCredentials {
            username: self.username,
            password: self.password,
            token: self.token,
        }
    }

    fn from_domain(credentials: &AdminCredentials) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            token: credentials.token.clone(),
        }
    }
}

//=========================================================================================
// File Helpers
//=========================================================================================

fn io_error(path: &Path, err: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), err))
}

/// Reads and parses `path`. A missing file is `Ok(None)`.
async fn read_json<T>(path: &Path) -> PortResult<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PortError::Unexpected(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// Serializes `value` in full and swaps it into place with a rename.
/// The temp file is flushed to disk before the rename, so the target never
/// points at unsynced data. Callers must hold the writer lock for `path`.
async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PortResult<()> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|e| PortError::Unexpected(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    if let Err(e) = write_synced(&tmp_path, &bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(io_error(&tmp_path, e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(io_error(path, e));
    }

    sync_parent_dir(path).await;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote data file");
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

// Makes the rename itself durable. Not every platform can open a directory,
// so failure only costs durability and is logged.
async fn sync_parent_dir(path: &Path) {
    let Some(dir) = path.parent() else { return };
    let synced = match tokio::fs::File::open(dir).await {
        Ok(handle) => handle.sync_all().await,
        Err(e) => Err(e),
    };
    if let Err(e) = synced {
        debug!(dir = %dir.display(), error = %e, "Could not sync data directory");
    }
}

//=========================================================================================
// `TimetableStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TimetableStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn list_all(&self) -> PortResult<Vec<TimetableDocument>> {
        Ok(self.read_timetable().await?.to_domain())
    }

    async fn get_by_batch(&self, code: &BatchCode) -> PortResult<TimetableDocument> {
        let mut file = self.read_timetable().await?;
        file.batches
            .remove(code.as_str())
            .map(|schedule| TimetableDocument {
                batch: code.clone(),
                schedule,
            })
            .ok_or_else(|| PortError::NotFound(format!("Batch {} not found", code)))
    }

    async fn replace_all(&self, documents: Vec<TimetableDocument>) -> PortResult<()> {
        let file = TimetableFile::from_domain(documents);
        let _writer = self.timetable_writer.lock().await;
        write_json_atomic(&self.timetable_path, &file).await
    }

    async fn raw_snapshot(&self) -> PortResult<serde_json::Value> {
        match read_json::<serde_json::Value>(&self.timetable_path).await? {
            Some(raw) => Ok(raw),
            None => Ok(serde_json::json!({ "batches": {} })),
        }
    }

    async fn get_credentials(&self) -> PortResult<AdminCredentials> {
        self.read_credentials()
            .await?
            .map(CredentialsRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("admin credentials".to_string()))
    }

    async fn update_credentials(&self, expected_old: &str, new_password: &str) -> PortResult<()> {
        let _writer = self.credentials_writer.lock().await;
        let mut record = self
            .read_credentials()
            .await?
            .ok_or_else(|| PortError::NotFound("admin credentials".to_string()))?;
        if record.password != expected_old {
            return Err(PortError::Conflict("admin password changed concurrently".to_string()));
        }
        record.password = new_password.to_string();
        write_json_atomic(&self.credentials_path, &record).await
    }

    async fn seed_credentials(&self, defaults: &AdminCredentials) -> PortResult<()> {
        let _writer = self.credentials_writer.lock().await;
        if self.read_credentials().await?.is_some() {
            return Ok(());
        }
        write_json_atomic(&self.credentials_path, &CredentialsRecord::from_domain(defaults)).await
    }
}
