/*!
 # Jar Warden

 A Rust library for supervising locally deployed Java archive services.

 ## Overview

 Jar Warden provides functionality to:
 - Register a deployable jar artifact and provision its on-disk home
 - Launch a service as a detached background process the OS owns
 - Report live running/stopped status from a process table snapshot
 - Stop a service with an escalating graceful-then-forceful protocol
 - Deploy new artifact versions while retaining the superseded one
 - Keep all service records in a durable, atomically-written store

 ## Basic Usage

 ```no_run
 use jar_warden::{JarSupervisor, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a supervisor from a config file
     let supervisor = JarSupervisor::from_config_file("config.json")?;

     // Register a service from uploaded bytes
     let jar = std::fs::read("orders.jar").expect("read artifact");
     let record = supervisor.register("orders", "orders.jar", &jar).await?;

     // Launch it detached
     supervisor.start(record.id).await?;

     // One process table snapshot covers every service
     for status in supervisor.status().await? {
         println!("{} running={}", status.name, status.running);
     }

     // Graceful signal, bounded polling, forced kill if needed
     supervisor.stop(record.id).await?;
     supervisor.delete(record.id).await?;

     Ok(())
 }
 ```

 ## Features

 - **Durable Records**: Locked read-modify-write cycles and atomic file
   replacement keep the record store consistent under concurrent callers
 - **Detached Processes**: Services outlive the supervisor; liveness is
   re-derived from the process table, never cached
 - **Escalating Stop**: Configurable polling budget between the graceful
   and forceful signals
 - **Error Handling**: Comprehensive error handling
 - **Async Support**: Full async/await support

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod artifact;
pub mod config;
pub mod error;
pub mod process;
pub mod store;

pub use config::SupervisorConfig;
pub use error::{Error, Result};
pub use process::{StopOutcome, SystemProcessTable};
pub use store::{LaunchArgs, ServiceId, ServiceRecord, ServiceStatus};

use artifact::ArtifactRegistry;
use chrono::Utc;
use process::{ProcessLauncher, ProcessTable, ProcessTerminator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::RecordStore;

/// Supervise locally deployed jar services
///
/// This struct is the main entry point: it owns the record store, the
/// artifact layout, and the process integration, and exposes the full
/// register/start/stop/status/deploy/delete contract.
/// All public methods are instrumented with `tracing` spans.
pub struct JarSupervisor {
    /// Configuration
    config: SupervisorConfig,
    /// Durable service records
    store: RecordStore,
    /// On-disk artifact layout
    registry: ArtifactRegistry,
    /// Detached process spawner
    launcher: ProcessLauncher,
    /// Escalating stop protocol
    terminator: Arc<ProcessTerminator>,
    /// Process table snapshot source
    table: Arc<dyn ProcessTable + Send + Sync>,
}

impl JarSupervisor {
    /// Create a new supervisor from a configuration file path
    ///
    /// The configuration is validated before the supervisor is built.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = SupervisorConfig::from_file(path)?;
        config::validate_config(&config)?;
        Ok(Self::new(config))
    }

    /// Create a new supervisor from a configuration string
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = SupervisorConfig::parse_from_str(config)?;
        config::validate_config(&config)?;
        Ok(Self::new(config))
    }

    /// Create a new supervisor from a configuration
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub fn new(config: SupervisorConfig) -> Self {
        tracing::info!("Creating new JarSupervisor");
        let table: Arc<dyn ProcessTable + Send + Sync> = Arc::new(SystemProcessTable::new());
        Self {
            store: RecordStore::new(config.data_dir.clone()),
            registry: ArtifactRegistry::new(config.data_dir.clone()),
            launcher: ProcessLauncher::new(&config),
            terminator: Arc::new(ProcessTerminator::new(Arc::clone(&table), &config)),
            table,
            config,
        }
    }

    /// The configuration this supervisor was built from.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Directory holding a service's artifacts and log file.
    pub fn service_dir(&self, id: ServiceId) -> PathBuf {
        self.registry.service_dir(id)
    }

    /// Register a new service from uploaded artifact bytes
    ///
    /// Provisions a fresh identity and directory, stores the artifact under
    /// a versioned name, and appends the record, all before returning. The
    /// service is not started; that is a separate [`start`](Self::start)
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty name and
    /// [`Error::InvalidArtifact`] if the bytes do not look like a jar.
    /// If appending the record fails, the provisioned directory is removed
    /// again; a record and its directory only ever appear together.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, bytes), fields(name = %name, file_name = %file_name, size = bytes.len()))]
    pub async fn register(&self, name: &str, file_name: &str, bytes: &[u8]) -> Result<ServiceRecord> {
        tracing::info!("Registering service");
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Service name is empty".to_string()));
        }
        artifact::validate_artifact(file_name, bytes)?;

        let id = self.registry.provision()?;
        let artifact_path = match self.registry.store_artifact(id, bytes) {
            Ok(path) => path,
            Err(e) => {
                let _ = self.registry.remove(id);
                return Err(e);
            }
        };

        let record = ServiceRecord {
            id,
            name: name.trim().to_string(),
            artifact_path,
            launch_args: LaunchArgs::default(),
            created_at: Utc::now(),
            last_deployed_at: None,
            previous_artifact_path: None,
        };

        let stored = record.clone();
        if let Err(e) = self.store.with_records(|records| {
            records.push(record);
            Ok(())
        }) {
            tracing::error!(error = %e, "Failed to append record, rolling back directory");
            let _ = self.registry.remove(id);
            return Err(e);
        }

        tracing::info!(service_id = %stored.id, artifact = %stored.artifact_path, "Service registered");
        Ok(stored)
    }

    /// Start a registered service as a detached process
    ///
    /// Returns the pid observed at spawn time. The pid is informational
    /// only: status and stop re-resolve the process from a fresh snapshot.
    /// The record is not mutated; liveness is derived, not stored.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id))]
    pub async fn start(&self, id: ServiceId) -> Result<u32> {
        tracing::info!("Starting service");
        let record = self.store.find(id)?;
        let dir = self.registry.service_dir(id);

        let pid = self.launcher.launch(&record, &dir).map_err(|e| {
            tracing::error!(error = %e, "Failed to launch service");
            e
        })?;

        tracing::info!(pid, "Service started");
        Ok(pid)
    }

    /// Stop a service's process with the escalating protocol
    ///
    /// Idempotent: a service with no matching live process is a successful
    /// no-op. The protocol runs in its own task, so a caller that abandons
    /// the returned future cannot cancel an escalation midway; retrying the
    /// stop is always safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unresponsive`] if the process survives both
    /// signals, and [`Error::ProcessQuery`] if the process table cannot be
    /// read.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id))]
    pub async fn stop(&self, id: ServiceId) -> Result<StopOutcome> {
        tracing::info!("Stopping service");
        let record = self.store.find(id)?;

        let terminator = Arc::clone(&self.terminator);
        let task = tokio::spawn(async move { terminator.stop(&record).await });

        let outcome = task
            .await
            .map_err(|e| Error::Unresponsive(format!("Stop task failed: {}", e)))??;

        tracing::info!(outcome = ?outcome, "Stop finished");
        Ok(outcome)
    }

    /// Status of every registered service
    ///
    /// Takes one process table snapshot and derives each service's liveness
    /// from it, so the whole result set describes the same instant.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self) -> Result<Vec<ServiceStatus>> {
        tracing::debug!("Deriving status for all services");
        let records = self.store.load()?;
        let snapshot = self.table.snapshot()?;

        let statuses = records
            .iter()
            .map(|record| ServiceStatus::from_record(record, snapshot.is_running(record)))
            .collect();
        Ok(statuses)
    }

    /// Status of one service
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id))]
    pub async fn status_of(&self, id: ServiceId) -> Result<ServiceStatus> {
        tracing::debug!("Deriving status for service");
        let record = self.store.find(id)?;
        let snapshot = self.table.snapshot()?;

        Ok(ServiceStatus::from_record(&record, snapshot.is_running(&record)))
    }

    /// Deploy a new artifact version for an existing service
    ///
    /// Stores the new artifact next to the old one, then flips the record's
    /// active artifact, remembers the superseded one, and stamps the deploy
    /// time, all in one store mutation. Deploying while the old version is
    /// still running is allowed: the live process keeps running the
    /// superseded artifact, and because status matches the record's current
    /// artifact, the service reports `running=false` until the next start.
    /// [`stop`](Self::stop) and [`delete`](Self::delete) still recognize
    /// the superseded instance, so it never becomes unreachable. Cutover
    /// timing stays with the operator.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, bytes), fields(service_id = %id, file_name = %file_name, size = bytes.len()))]
    pub async fn deploy(&self, id: ServiceId, file_name: &str, bytes: &[u8]) -> Result<ServiceRecord> {
        tracing::info!("Deploying new artifact version");
        artifact::validate_artifact(file_name, bytes)?;

        // Reject unknown ids before any bytes land on disk
        self.store.find(id)?;
        let artifact_path = self.registry.store_artifact(id, bytes)?;

        let updated = self.store.with_records(|records| {
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or_else(|| Error::ServiceNotFound(id.to_string()))?;

            record.previous_artifact_path = Some(std::mem::replace(
                &mut record.artifact_path,
                artifact_path.clone(),
            ));
            record.last_deployed_at = Some(Utc::now());
            Ok(record.clone())
        })?;

        tracing::info!(artifact = %updated.artifact_path, "Deploy recorded");
        Ok(updated)
    }

    /// Replace a service's launch arguments
    ///
    /// Takes effect on the next [`start`](Self::start); a process already
    /// running keeps the arguments it was launched with.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, prefix, suffix), fields(service_id = %id))]
    pub async fn set_launch_args(
        &self,
        id: ServiceId,
        prefix: Vec<String>,
        suffix: Vec<String>,
    ) -> Result<ServiceRecord> {
        tracing::info!("Updating launch arguments");
        for arg in prefix.iter().chain(suffix.iter()) {
            if arg.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "Launch arguments must not be empty strings".to_string(),
                ));
            }
        }

        let updated = self.store.with_records(|records| {
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or_else(|| Error::ServiceNotFound(id.to_string()))?;

            record.launch_args = LaunchArgs { prefix, suffix };
            Ok(record.clone())
        })?;

        tracing::info!("Launch arguments updated");
        Ok(updated)
    }

    /// Delete a service, its record, and its directory
    ///
    /// Refused with [`Error::InUse`] while a process matches the active or
    /// the superseded artifact; the caller stops the service first. The
    /// directory is removed inside the record mutation, so the record and
    /// its directory go together.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id))]
    pub async fn delete(&self, id: ServiceId) -> Result<()> {
        tracing::info!("Deleting service");
        let record = self.store.find(id)?;

        let snapshot = self.table.snapshot()?;
        let superseded_running = record
            .previous_artifact_file_name()
            .and_then(|name| snapshot.find_pid_by_name(name))
            .is_some();
        if snapshot.is_running(&record) || superseded_running {
            tracing::warn!("Refusing to delete a running service");
            return Err(Error::InUse(id.to_string()));
        }

        self.store.with_records(|records| {
            let index = records
                .iter()
                .position(|record| record.id == id)
                .ok_or_else(|| Error::ServiceNotFound(id.to_string()))?;

            match self.registry.remove(id) {
                Ok(()) => {}
                // Directory already gone; still drop the record
                Err(Error::ServiceNotFound(_)) => {}
                Err(e) => return Err(e),
            }
            records.remove(index);
            Ok(())
        })?;

        tracing::info!("Service deleted");
        Ok(())
    }

    /// File names in a service's directory
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id))]
    pub async fn list_files(&self, id: ServiceId) -> Result<Vec<String>> {
        self.store.find(id)?;
        self.registry.list_files(id)
    }

    /// Read one file from a service's directory
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(service_id = %id, file_name = %file_name))]
    pub async fn download_file(&self, id: ServiceId, file_name: &str) -> Result<Vec<u8>> {
        self.store.find(id)?;
        self.registry.read_member(id, file_name)
    }

    /// Write one file into a service's directory
    ///
    /// A `.jar` upload is stored as a new artifact version under the
    /// versioned naming and does not change which artifact the record
    /// points at; activating it is what [`deploy`](Self::deploy) is for.
    /// Any other file is written under its own (validated) name and may
    /// overwrite an existing file. Returns the stored file name.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, bytes), fields(service_id = %id, file_name = %file_name, size = bytes.len()))]
    pub async fn upload_file(&self, id: ServiceId, file_name: &str, bytes: &[u8]) -> Result<String> {
        tracing::info!("Uploading file into service directory");
        artifact::validate_member_name(file_name)?;
        self.store.find(id)?;

        if file_name.to_ascii_lowercase().ends_with(".jar") {
            artifact::validate_artifact(file_name, bytes)?;
            return self.registry.store_artifact(id, bytes);
        }

        self.registry.write_member(id, file_name, bytes)?;
        Ok(file_name.to_string())
    }
}
