// src/process/launcher.rs
use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::store::ServiceRecord;
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

/// Spawns service processes detached from the supervisor.
///
/// The invocation is `<runtime> -jar <artifactPath> <prefix> <suffix>`, run
/// with the service's directory as working directory and both output streams
/// appended to the per-service log file. The child is placed in its own
/// session, and its handle is dropped right after the spawn: from that point
/// the OS owns the process, and the supervisor only re-discovers it through
/// the process matcher.
pub struct ProcessLauncher {
    /// Runtime binary used for every launch
    java_bin: String,
    /// Log file name inside each service directory
    log_file_name: String,
}

impl ProcessLauncher {
    /// Creates a launcher from the supervisor configuration.
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            java_bin: config.java_bin.clone(),
            log_file_name: config.log_file_name.clone(),
        }
    }

    /// Launches the service described by `record` inside `service_dir`.
    ///
    /// Returns the pid observed at spawn time. The pid is informational:
    /// later status and stop decisions re-resolve the process from a fresh
    /// snapshot instead of trusting it. Launch does not wait for the service
    /// to become healthy; a process that starts and immediately exits still
    /// counts as a successful launch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the service directory or artifact is
    /// missing, the log file cannot be opened, or the OS refuses to spawn.
    pub fn launch(&self, record: &ServiceRecord, service_dir: &Path) -> Result<u32> {
        if !service_dir.is_dir() {
            return Err(Error::Launch(format!(
                "Service directory {} does not exist",
                service_dir.display()
            )));
        }

        let artifact = service_dir.join(&record.artifact_path);
        if !artifact.is_file() {
            return Err(Error::Launch(format!(
                "Artifact {} does not exist",
                artifact.display()
            )));
        }

        let log_path = service_dir.join(&self.log_file_name);
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| {
                Error::Launch(format!(
                    "Failed to open log file {}: {}",
                    log_path.display(),
                    e
                ))
            })?;
        let log_err = log.try_clone().map_err(|e| {
            Error::Launch(format!("Failed to duplicate log file handle: {}", e))
        })?;

        let mut command = Command::new(&self.java_bin);
        command
            .arg("-jar")
            .arg(&record.artifact_path)
            .args(&record.launch_args.prefix)
            .args(&record.launch_args.suffix)
            .current_dir(service_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        // Give the child its own session so it survives the supervisor
        unsafe {
            command.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }

        let child = command.spawn().map_err(|e| {
            Error::Launch(format!(
                "Failed to spawn {} for {}: {}",
                self.java_bin, record.artifact_path, e
            ))
        })?;

        let pid = child.id();
        // Dropping the handle without waiting leaves the process running;
        // the OS owns it from here
        drop(child);

        tracing::info!(
            service_id = %record.id,
            pid,
            artifact = %record.artifact_path,
            "Launched service"
        );
        Ok(pid)
    }
}
