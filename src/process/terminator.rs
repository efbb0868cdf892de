use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::process::matcher::ProcessTable;
use crate::store::ServiceRecord;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use std::sync::Arc;
use std::time::Duration;

/// How a stop request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No live process matched the service; nothing was signalled
    NotRunning,
    /// The process exited within the graceful polling budget
    Terminated,
    /// The process exited only after the forceful signal
    Killed,
}

/// Applies the escalating termination protocol to a service's process.
///
/// The pid is resolved from a fresh process table snapshot at stop time,
/// never from launch-time state. A graceful signal is sent first, liveness
/// is polled at a fixed interval, and only when the polling budget runs out
/// does the forceful signal follow. A service with no matching process is a
/// successful no-op, so retrying a stop is always safe.
pub struct ProcessTerminator {
    /// Snapshot source used to resolve the service's pid
    table: Arc<dyn ProcessTable + Send + Sync>,
    /// Liveness polls after the graceful signal
    poll_attempts: u32,
    /// Pause between liveness polls
    poll_interval: Duration,
}

impl ProcessTerminator {
    /// Creates a terminator polling at the configured interval and budget.
    pub fn new(table: Arc<dyn ProcessTable + Send + Sync>, config: &SupervisorConfig) -> Self {
        Self {
            table,
            poll_attempts: config.stop_poll_attempts,
            poll_interval: config.stop_poll_interval(),
        }
    }

    /// Stops the process currently matching `record`, if any.
    ///
    /// When no process matches the active artifact but one matches the
    /// superseded artifact, that process is stopped instead. An instance
    /// launched before the latest deployment still carries the old artifact
    /// name on its command line, and stopping it is exactly what a caller
    /// winding down the service wants.
    ///
    /// The match inherits the snapshot's approximate identity, so in a
    /// substring collision the signal can land on the matching process of
    /// another service. See [`crate::process::ProcessSnapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessQuery`] if the snapshot fails, and
    /// [`Error::Unresponsive`] if the process survives the full protocol.
    pub async fn stop(&self, record: &ServiceRecord) -> Result<StopOutcome> {
        let snapshot = self.table.snapshot()?;
        let pid = match snapshot.find_pid(record) {
            Some(pid) => pid,
            None => {
                let superseded = record
                    .previous_artifact_file_name()
                    .and_then(|name| snapshot.find_pid_by_name(name));
                match superseded {
                    Some(pid) => {
                        tracing::debug!(
                            service_id = %record.id,
                            pid,
                            "Matched a process still on the superseded artifact"
                        );
                        pid
                    }
                    None => {
                        tracing::debug!(
                            service_id = %record.id,
                            "No live process matched, stop is a no-op"
                        );
                        return Ok(StopOutcome::NotRunning);
                    }
                }
            }
        };

        self.terminate(record, pid).await
    }

    async fn terminate(&self, record: &ServiceRecord, pid: u32) -> Result<StopOutcome> {
        let target = Pid::from_raw(pid as i32);

        tracing::info!(service_id = %record.id, pid, "Sending graceful stop signal");
        match signal::kill(target, Signal::SIGTERM) {
            Ok(()) => {}
            // Gone between the snapshot and the signal
            Err(Errno::ESRCH) => return Ok(StopOutcome::Terminated),
            Err(e) => {
                tracing::warn!(service_id = %record.id, pid, error = %e, "Graceful signal failed");
            }
        }

        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;
            if !is_alive(target) {
                tracing::info!(
                    service_id = %record.id,
                    pid,
                    attempt,
                    "Service stopped after graceful signal"
                );
                return Ok(StopOutcome::Terminated);
            }
            tracing::debug!(service_id = %record.id, pid, attempt, "Service still alive");
        }

        tracing::warn!(service_id = %record.id, pid, "Graceful stop exhausted, sending kill signal");
        match signal::kill(target, Signal::SIGKILL) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Ok(StopOutcome::Terminated),
            Err(e) => {
                return Err(Error::Unresponsive(format!(
                    "Failed to send kill signal to pid {}: {}",
                    pid, e
                )));
            }
        }

        tokio::time::sleep(self.poll_interval).await;
        if is_alive(target) {
            return Err(Error::Unresponsive(format!(
                "Process {} for service {} survived the kill signal",
                pid, record.id
            )));
        }

        tracing::info!(service_id = %record.id, pid, "Service stopped after kill signal");
        Ok(StopOutcome::Killed)
    }
}

/// Probes whether a pid is still running.
///
/// A dead child of this process lingers as a zombie until reaped, and a
/// plain signal-0 probe reads zombies as alive, so any zombie of our own
/// making is reaped first. EPERM on the probe still proves the pid exists.
fn is_alive(pid: Pid) -> bool {
    let _ = waitpid(pid, Some(WaitPidFlag::WNOHANG));
    match signal::kill(pid, None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => true,
    }
}
