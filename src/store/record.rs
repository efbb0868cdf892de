use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a supervised service
///
/// Assigned once at registration and never reused. The identifier doubles
/// as the name of the service's directory under the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(Uuid);

impl ServiceId {
    // Private constructor, only usable within our crate
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

// Implement Display trait
impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ServiceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("Invalid service id '{}': {}", s, e)))
    }
}

/// Launch arguments for a service, as an ordered pair of blocks.
///
/// The prefix block is placed directly after the artifact path on the
/// command line and the suffix block after the prefix block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    /// Arguments placed before the suffix block
    #[serde(default)]
    pub prefix: Vec<String>,
    /// Arguments placed last on the command line
    #[serde(default)]
    pub suffix: Vec<String>,
}

/// Durable record of one registered service.
///
/// Records are persisted as an ordered sequence in a single JSON file and
/// survive supervisor restarts. Liveness is absent here: whether the service
/// is running is derived from the process table at query time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Service ID, also the name of the service's directory
    pub id: ServiceId,
    /// Human-readable label, caller-supplied, not required to be unique
    pub name: String,
    /// Path of the active artifact, relative to the service's directory
    #[serde(rename = "artifactPath")]
    pub artifact_path: String,
    /// Extra arguments inserted into the launch command
    #[serde(rename = "launchArgs", default)]
    pub launch_args: LaunchArgs,
    /// Registration time
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Most recent successful artifact replacement, if any
    #[serde(rename = "lastDeployedAt")]
    pub last_deployed_at: Option<DateTime<Utc>>,
    /// Artifact superseded by the most recent deployment, kept for rollback
    #[serde(rename = "previousArtifactPath")]
    pub previous_artifact_path: Option<String>,
}

impl ServiceRecord {
    /// File name of the active artifact, without any directory components.
    ///
    /// This is the substring the process matcher looks for in command lines.
    pub fn artifact_file_name(&self) -> &str {
        match self.artifact_path.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.artifact_path,
        }
    }

    /// File name of the superseded artifact, if a deployment replaced one.
    ///
    /// A process launched before the latest deployment still carries this
    /// name on its command line, so stop and delete fall back to it.
    pub fn previous_artifact_file_name(&self) -> Option<&str> {
        let path = self.previous_artifact_path.as_deref()?;
        match path.rsplit_once('/') {
            Some((_, name)) => Some(name),
            None => Some(path),
        }
    }
}

/// Live status of a service, derived from a record and a process table
/// snapshot at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Service ID
    pub id: ServiceId,
    /// Human-readable label
    pub name: String,
    /// Whether a process matching the active artifact was found
    pub running: bool,
    /// File name of the active artifact
    #[serde(rename = "artifactVersion")]
    pub artifact_version: String,
    /// Registration time
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Most recent successful artifact replacement, if any
    #[serde(rename = "lastDeployedAt")]
    pub last_deployed_at: Option<DateTime<Utc>>,
}

impl ServiceStatus {
    pub(crate) fn from_record(record: &ServiceRecord, running: bool) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            running,
            artifact_version: record.artifact_file_name().to_string(),
            created_at: record.created_at,
            last_deployed_at: record.last_deployed_at,
        }
    }
}
