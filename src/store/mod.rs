/// Record store module for Jar Warden.
///
/// This module owns the durable state of the supervisor: one JSON file
/// holding the ordered sequence of every registered service's record.
/// All mutations funnel through a single locked read-transform-write
/// entry point, so concurrent callers can never drop each other's updates
/// and a crash mid-write can never leave a half-written file behind.
///
/// # Components
///
/// * `record` - The persisted `ServiceRecord` model and its derived status view
/// * `file` - The locked, atomically-written JSON file store
///
/// # Examples
///
/// Appending and reading back a record:
///
/// ```no_run
/// use jar_warden::store::RecordStore;
///
/// let store = RecordStore::new("/var/lib/jar-warden");
/// let records = store.load().unwrap();
/// println!("{} services registered", records.len());
/// ```
mod file;
mod record;

pub use file::RecordStore;
pub use record::{LaunchArgs, ServiceId, ServiceRecord, ServiceStatus};
