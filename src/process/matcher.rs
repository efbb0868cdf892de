use crate::error::{Error, Result};
use crate::store::ServiceRecord;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// One entry in a process table snapshot.
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    /// OS process id
    pub pid: u32,
    /// Full command line, arguments joined with spaces
    pub command_line: String,
}

/// Point-in-time view of the live process table.
///
/// A snapshot is taken once and matched against any number of records, so a
/// batch status query sees every service through the same instant. Matching
/// tests whether an entry's command line contains the record's artifact file
/// name as a substring. This is an approximate identity: two services
/// sharing an artifact file name, or an unrelated process whose arguments
/// happen to contain it, are indistinguishable false positives. That is an
/// accepted limitation of matching detached processes the supervisor holds
/// no handle to.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    entries: Vec<ProcessEntry>,
}

impl ProcessSnapshot {
    pub(crate) fn new(entries: Vec<ProcessEntry>) -> Self {
        Self { entries }
    }

    /// Entries captured in this snapshot.
    pub fn entries(&self) -> &[ProcessEntry] {
        &self.entries
    }

    /// Pid of the first process matching the record's artifact, if any.
    pub fn find_pid(&self, record: &ServiceRecord) -> Option<u32> {
        self.find_pid_by_name(record.artifact_file_name())
    }

    /// Pid of the first process whose command line contains `file_name`.
    pub fn find_pid_by_name(&self, file_name: &str) -> Option<u32> {
        // An empty needle would match every entry
        if file_name.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.command_line.contains(file_name))
            .map(|entry| entry.pid)
    }

    /// Whether any process in the snapshot matches the record's artifact.
    pub fn is_running(&self, record: &ServiceRecord) -> bool {
        self.find_pid(record).is_some()
    }
}

/// Source of process table snapshots.
///
/// The live implementation is [`SystemProcessTable`]; tests substitute a
/// canned table.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTable {
    /// Takes one snapshot of every live process and its command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessQuery`] if the table cannot be read. A failed
    /// query is never reported as "nothing running".
    fn snapshot(&self) -> Result<ProcessSnapshot>;
}

/// Live process table backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    /// Creates a live process table source.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<ProcessSnapshot> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
        );

        let entries: Vec<ProcessEntry> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                command_line: process
                    .cmd()
                    .iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect();

        // A live host always contains at least the calling process, so an
        // empty result is a failed read, not an idle machine
        if entries.is_empty() {
            return Err(Error::ProcessQuery(
                "Process table snapshot came back empty".to_string(),
            ));
        }

        tracing::trace!(count = entries.len(), "Took process table snapshot");
        Ok(ProcessSnapshot::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LaunchArgs, ServiceId, ServiceRecord};
    use chrono::Utc;

    fn record_with_artifact(artifact: &str) -> ServiceRecord {
        ServiceRecord {
            id: ServiceId::new(),
            name: "test".to_string(),
            artifact_path: artifact.to_string(),
            launch_args: LaunchArgs::default(),
            created_at: Utc::now(),
            last_deployed_at: None,
            previous_artifact_path: None,
        }
    }

    #[test]
    fn test_snapshot_matches_by_substring() {
        let snapshot = ProcessSnapshot::new(vec![
            ProcessEntry {
                pid: 100,
                command_line: "java -jar 2024-05-21-16-00.jar --server.port=8080".to_string(),
            },
            ProcessEntry {
                pid: 101,
                command_line: "nginx: worker process".to_string(),
            },
        ]);

        let record = record_with_artifact("2024-05-21-16-00.jar");
        assert_eq!(snapshot.find_pid(&record), Some(100));
        assert!(snapshot.is_running(&record));

        let other = record_with_artifact("2024-06-01-09-00.jar");
        assert_eq!(snapshot.find_pid(&other), None);
        assert!(!snapshot.is_running(&other));
    }

    #[test]
    fn test_empty_artifact_name_never_matches() {
        let snapshot = ProcessSnapshot::new(vec![ProcessEntry {
            pid: 100,
            command_line: "java -jar app.jar".to_string(),
        }]);

        let record = record_with_artifact("");
        assert_eq!(snapshot.find_pid(&record), None);
    }

    #[test]
    fn test_substring_collision_is_a_false_positive() {
        // Two services with the same artifact file name are indistinguishable
        let snapshot = ProcessSnapshot::new(vec![ProcessEntry {
            pid: 42,
            command_line: "java -jar app.jar".to_string(),
        }]);

        let first = record_with_artifact("app.jar");
        let second = record_with_artifact("app.jar");
        assert_eq!(snapshot.find_pid(&first), snapshot.find_pid(&second));
    }

    #[test]
    fn test_system_snapshot_contains_this_process() {
        let table = SystemProcessTable::new();

        let snapshot = table.snapshot().unwrap();

        let own_pid = std::process::id();
        assert!(
            snapshot.entries().iter().any(|entry| entry.pid == own_pid),
            "snapshot should list the test process itself"
        );
    }
}
