//! Artifact registry module for Jar Warden.
//!
//! This module owns the on-disk layout beneath the data directory: one
//! subdirectory per service, named by the service id, holding the versioned
//! artifact files and the per-service log. Artifact bytes always land under
//! a fresh timestamp-based name; an existing file is never overwritten, so
//! every deployed version stays on disk until its service is deleted.
use crate::error::{Error, Result};
use crate::store::ServiceId;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Timestamp layout for versioned artifact names, minute granularity
const VERSION_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// Checks that a caller-supplied file name stays inside a service directory.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the name is empty, contains a path
/// separator, or contains a `..` component.
pub fn validate_member_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("File name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidInput(format!(
            "File name '{}' must not contain path components",
            name
        )));
    }

    Ok(())
}

/// Checks that uploaded bytes look like a deployable archive.
///
/// The name must end in `.jar` and the content must begin with the two-byte
/// ZIP signature. This catches truncated uploads and mislabeled files, not
/// malicious archives.
///
/// # Errors
///
/// Returns [`Error::InvalidArtifact`] if either check fails.
pub fn validate_artifact(file_name: &str, bytes: &[u8]) -> Result<()> {
    if !file_name.to_ascii_lowercase().ends_with(".jar") {
        return Err(Error::InvalidArtifact(format!(
            "'{}' is not a .jar file",
            file_name
        )));
    }
    if !bytes.starts_with(b"PK") {
        return Err(Error::InvalidArtifact(format!(
            "'{}' does not start with the ZIP signature",
            file_name
        )));
    }

    Ok(())
}

/// Manages per-service directories and their artifact files.
pub struct ArtifactRegistry {
    /// Root directory holding one subdirectory per service
    data_dir: PathBuf,
}

impl ArtifactRegistry {
    /// Creates a registry rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory of a service, named by its id.
    pub fn service_dir(&self, id: ServiceId) -> PathBuf {
        self.data_dir.join(id.to_string())
    }

    /// Creates a fresh service identity and its directory.
    pub fn provision(&self) -> Result<ServiceId> {
        let id = ServiceId::new();
        let dir = self.service_dir(id);

        fs::create_dir_all(&self.data_dir).map_err(|e| {
            Error::Io(format!(
                "Failed to create data directory {}: {}",
                self.data_dir.display(),
                e
            ))
        })?;
        // A collision on a fresh random id means something else already
        // claimed the directory; surface it rather than reusing it
        fs::create_dir(&dir).map_err(|e| {
            Error::Io(format!(
                "Failed to create service directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        tracing::debug!(service_id = %id, dir = %dir.display(), "Provisioned service directory");
        Ok(id)
    }

    /// Writes artifact bytes under a fresh versioned name and returns that
    /// name.
    ///
    /// Names are minute-granularity timestamps like `2024-05-21-16-00.jar`.
    /// A same-minute redeploy gets a monotonic suffix (`-2`, `-3`, ...)
    /// instead of overwriting the earlier version.
    pub fn store_artifact(&self, id: ServiceId, bytes: &[u8]) -> Result<String> {
        let dir = self.service_dir(id);
        if !dir.is_dir() {
            return Err(Error::ServiceNotFound(id.to_string()));
        }

        let stamp = Utc::now().format(VERSION_FORMAT).to_string();
        let mut name = format!("{}.jar", stamp);
        let mut attempt = 1u32;

        loop {
            let path = dir.join(&name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(bytes).map_err(|e| {
                        Error::Io(format!("Failed to write artifact {}: {}", path.display(), e))
                    })?;
                    file.sync_all().map_err(|e| {
                        Error::Io(format!("Failed to sync artifact {}: {}", path.display(), e))
                    })?;

                    tracing::debug!(service_id = %id, artifact = %name, "Stored artifact");
                    return Ok(name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    name = format!("{}-{}.jar", stamp, attempt);
                }
                Err(e) => {
                    return Err(Error::Io(format!(
                        "Failed to create artifact {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    }

    /// Removes a service's directory tree, artifacts and log included.
    pub fn remove(&self, id: ServiceId) -> Result<()> {
        let dir = self.service_dir(id);
        if !dir.is_dir() {
            return Err(Error::ServiceNotFound(id.to_string()));
        }

        fs::remove_dir_all(&dir).map_err(|e| {
            Error::Io(format!(
                "Failed to remove service directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        tracing::debug!(service_id = %id, "Removed service directory");
        Ok(())
    }

    /// Lists the file names in a service's directory, sorted.
    pub fn list_files(&self, id: ServiceId) -> Result<Vec<String>> {
        let dir = self.service_dir(id);
        let entries = fs::read_dir(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ServiceNotFound(id.to_string())
            } else {
                Error::Io(format!("Failed to list {}: {}", dir.display(), e))
            }
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| Error::Io(format!("Failed to list {}: {}", dir.display(), e)))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(names)
    }

    /// Reads one file from a service's directory.
    pub fn read_member(&self, id: ServiceId, name: &str) -> Result<Vec<u8>> {
        validate_member_name(name)?;

        let path = self.service_dir(id).join(name);
        fs::read(&path).map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Writes one file into a service's directory under the given name.
    ///
    /// Unlike artifacts, plain member files may be overwritten; this is how
    /// config files next to the artifact get updated.
    pub fn write_member(&self, id: ServiceId, name: &str, bytes: &[u8]) -> Result<()> {
        validate_member_name(name)?;

        let dir = self.service_dir(id);
        if !dir.is_dir() {
            return Err(Error::ServiceNotFound(id.to_string()));
        }

        let path = dir.join(name);
        fs::write(&path, bytes)
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::debug!(service_id = %id, file = %name, "Wrote member file");
        Ok(())
    }
}
