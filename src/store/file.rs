use crate::error::{Error, Result};
use crate::store::record::{ServiceId, ServiceRecord};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name of the record file inside the data directory
const RECORD_FILE: &str = "record.json";
/// File name of the sibling lock file
const LOCK_FILE: &str = "record.lock";

/// Durable, serialized store of service records.
///
/// The store keeps the full ordered sequence of records in a single JSON
/// file. Two layers of locking serialize access: a process-local mutex for
/// tasks inside this supervisor, and an exclusive advisory lock on a sibling
/// lock file for anything else holding the same data directory. Both are
/// held across the whole read-transform-write cycle of a mutation.
///
/// Writes never touch the record file in place. The new content goes to a
/// temporary file, is synced, and is renamed over the old file, so readers
/// observe either the previous sequence or the new one, never a mix.
pub struct RecordStore {
    /// Path of the record file
    path: PathBuf,
    /// Path of the lock file
    lock_path: PathBuf,
    /// Serializes access within this process
    guard: Mutex<()>,
}

impl RecordStore {
    /// Creates a store rooted at the given data directory.
    ///
    /// Nothing is touched on disk until the first load or mutation.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            path: data_dir.join(RECORD_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            guard: Mutex::new(()),
        }
    }

    /// Path of the backing record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current record sequence.
    ///
    /// A missing or empty record file yields an empty sequence. A non-empty
    /// file that fails to parse yields [`Error::StoreCorrupt`]; the store
    /// never discards data it cannot read.
    pub fn load(&self) -> Result<Vec<ServiceRecord>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Store("Record store mutex poisoned".to_string()))?;
        let _lock = self.lock_file(FlockArg::LockShared)?;

        self.read_records()
    }

    /// Loads the record for one service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] if no record carries the id.
    pub fn find(&self, id: ServiceId) -> Result<ServiceRecord> {
        self.load()?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::ServiceNotFound(id.to_string()))
    }

    /// Applies a mutation to the record sequence under the store's locks.
    ///
    /// This is the only write path. The locks are held for the full cycle:
    /// the current sequence is read, `mutate` transforms it, and the result
    /// is written back atomically. If `mutate` fails, nothing is written and
    /// the file keeps its prior content.
    ///
    /// # Errors
    ///
    /// Returns whatever error `mutate` produced, or [`Error::Store`] /
    /// [`Error::StoreCorrupt`] if the file itself cannot be read or written.
    pub fn with_records<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<ServiceRecord>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Store("Record store mutex poisoned".to_string()))?;
        let _lock = self.lock_file(FlockArg::LockExclusive)?;

        let mut records = self.read_records()?;
        let value = mutate(&mut records)?;
        self.write_records(&records)?;

        tracing::debug!(count = records.len(), "Record store updated");
        Ok(value)
    }

    /// Opens the lock file and takes an advisory lock on it.
    fn lock_file(&self, arg: FlockArg) -> Result<Flock<File>> {
        // The data directory may not exist yet on first use
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| {
                Error::Store(format!(
                    "Failed to open lock file {}: {}",
                    self.lock_path.display(),
                    e
                ))
            })?;

        Flock::lock(file, arg)
            .map_err(|(_, errno)| Error::Store(format!("Failed to lock record store: {}", errno)))
    }

    fn read_records(&self) -> Result<Vec<ServiceRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Store(format!(
                    "Failed to read record file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Record file does not parse");
            Error::StoreCorrupt(format!(
                "Record file {} does not parse: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_records(&self, records: &[ServiceRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| Error::Store(format!("Failed to serialize records: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = File::create(&tmp_path).map_err(|e| {
            Error::Store(format!("Failed to create {}: {}", tmp_path.display(), e))
        })?;
        tmp.write_all(&json)
            .map_err(|e| Error::Store(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        tmp.sync_all()
            .map_err(|e| Error::Store(format!("Failed to sync {}: {}", tmp_path.display(), e)))?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            Error::Store(format!(
                "Failed to move {} into place: {}",
                tmp_path.display(),
                e
            ))
        })
    }
}
