/// Process integration module for Jar Warden.
///
/// This module is the supervisor's only contact with live OS processes.
/// It launches services detached, matches them back against the process
/// table by their artifact name, and walks the escalating termination
/// protocol when a service must stop. The supervisor never keeps a process
/// handle; whether a service runs is re-derived from a fresh process table
/// snapshot on every query.
///
/// # Components
///
/// * `launcher` - Spawns services detached with output routed to their log
/// * `matcher` - Snapshots the process table and matches services by artifact name
/// * `terminator` - Escalating graceful-then-forceful stop protocol
mod launcher;
mod matcher;
mod terminator;

pub use launcher::ProcessLauncher;
pub use matcher::{ProcessEntry, ProcessSnapshot, ProcessTable, SystemProcessTable};
pub use terminator::{ProcessTerminator, StopOutcome};
