/// Error handling module for Jar Warden.
///
/// This module defines the error types used throughout the library.
/// It provides a comprehensive set of errors that can occur when
/// supervising jar services, along with helpful context for debugging.
///
/// # Example
///
/// ```
/// use jar_warden::{JarSupervisor, error::{Error, Result}};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::ServiceNotFound(id)) => println!("Service '{}' not found in the record store", id),
///         Err(Error::Launch(msg)) => println!("Launch failed: {}", msg),
///         Err(Error::Unresponsive(msg)) => println!("Process refused to die: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the jar-warden library.
///
/// This enum represents all possible error types that can be returned from
/// operations in the Jar Warden library. Each variant includes context
/// information to help diagnose and handle the error appropriately.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON is malformed
    /// - Required fields are missing
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration is valid JSON but contains invalid values.
    ///
    /// This error occurs when:
    /// - The data directory is empty or not a directory
    /// - The runtime binary name is empty
    /// - Stop polling is tuned to zero attempts
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Caller-supplied input was rejected before any state changed.
    ///
    /// This error occurs when:
    /// - A service name is empty
    /// - A file name contains a path separator or `..`
    /// - An argument list contains an empty string
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded bytes were rejected as an artifact.
    ///
    /// This error occurs when:
    /// - The file name does not end in `.jar`
    /// - The content does not start with the ZIP magic bytes
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Requested service was not found in the record store.
    ///
    /// This error occurs when:
    /// - A service ID is passed that no record carries
    /// - The record was deleted by another caller first
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// The record store could not be read or written.
    ///
    /// This error occurs when:
    /// - The store lock file cannot be acquired
    /// - The temporary record file cannot be written or synced
    /// - The atomic rename over the record file fails
    #[error("Record store error: {0}")]
    Store(String),

    /// The record file exists but does not deserialize.
    ///
    /// This error occurs when:
    /// - The record file was hand-edited into invalid JSON
    /// - The record file was truncated by an outside writer
    ///
    /// The store never resets a corrupt file; it must be repaired by hand.
    #[error("Record store is corrupt: {0}")]
    StoreCorrupt(String),

    /// The service process could not be spawned.
    ///
    /// This error occurs when:
    /// - The runtime binary is missing or not executable
    /// - The service directory or artifact is gone
    /// - The per-service log file cannot be opened
    #[error("Launch failed: {0}")]
    Launch(String),

    /// The process table snapshot could not be taken.
    ///
    /// This error occurs when:
    /// - The system process table cannot be enumerated
    /// - The snapshot comes back empty, which a live host never produces
    ///
    /// A failed snapshot is reported instead of being read as "stopped".
    #[error("Process query failed: {0}")]
    ProcessQuery(String),

    /// The process survived the full termination protocol.
    ///
    /// This error occurs when:
    /// - The process ignores the graceful signal through every poll
    /// - The process is still alive after the kill signal
    #[error("Process unresponsive: {0}")]
    Unresponsive(String),

    /// The service is busy and the operation would destroy live state.
    ///
    /// This error occurs when:
    /// - Deleting a service whose process is currently running
    /// - Deleting a service whose superseded artifact still has a live process
    #[error("Service in use: {0}")]
    InUse(String),

    /// Filesystem error outside the record store.
    ///
    /// This error occurs when:
    /// - A service directory cannot be created or removed
    /// - An artifact or member file cannot be read or written
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for jar-warden operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module. Use this throughout the library and in client code to handle
/// errors in a consistent way.
pub type Result<T> = std::result::Result<T, Error>;
