use jar_warden::error::{Error, Result};
use jar_warden::process::ProcessTable;
use jar_warden::{JarSupervisor, ServiceId, StopOutcome, SupervisorConfig, SystemProcessTable};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Minimal bytes that pass the archive acceptance check
const JAR_BYTES: &[u8] = b"PK\x03\x04 test archive";

/// Liveness tests share one host process table, and registrations landing in
/// the same minute produce identical artifact file names across data
/// directories, so these tests run serialized.
fn process_table_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stand-in runtime. Launched as `<script> -jar <artifact> ...`, so the
/// artifact file name shows up in a real process's command line, and the
/// process stays alive long enough for the tests to observe it.
fn write_fake_runtime(dir: &Path) -> PathBuf {
    let path = dir.join("fake-java");
    std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_supervisor(root: &Path) -> JarSupervisor {
    let runtime = write_fake_runtime(root);
    let mut config = SupervisorConfig::new(root.join("data"));
    config.java_bin = runtime.to_string_lossy().into_owned();
    config.stop_poll_interval_ms = 100;
    JarSupervisor::new(config)
}

/// The process table needs a moment to reflect a spawn or an exit.
async fn wait_for_liveness(supervisor: &JarSupervisor, id: ServiceId, expected: bool) -> bool {
    for _ in 0..50 {
        if let Ok(status) = supervisor.status_of(id).await {
            if status.running == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_service_lifecycle() -> Result<()> {
    let _serial = process_table_lock();
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    // Register a service from uploaded bytes
    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;
    assert_eq!(record.name, "orders");
    assert!(record.artifact_path.ends_with(".jar"));
    assert!(record.last_deployed_at.is_none());
    assert!(supervisor.service_dir(record.id).is_dir());

    // Nothing is running before the first start
    let status = supervisor.status_of(record.id).await?;
    assert!(!status.running);

    // Start it detached and wait for the table to show it
    let pid = supervisor.start(record.id).await?;
    assert!(pid > 0);
    assert!(wait_for_liveness(&supervisor, record.id, true).await);
    assert!(supervisor.service_dir(record.id).join("service.log").is_file());

    // The stand-in runtime exits on the graceful signal
    let outcome = supervisor.stop(record.id).await?;
    assert_eq!(outcome, StopOutcome::Terminated);
    assert!(wait_for_liveness(&supervisor, record.id, false).await);

    // Delete removes the record and the directory together
    supervisor.delete(record.id).await?;
    assert!(!supervisor.service_dir(record.id).exists());
    let statuses = supervisor.status().await?;
    assert!(statuses.iter().all(|status| status.id != record.id));

    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent() -> Result<()> {
    let _serial = process_table_lock();
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;

    // Stopping a service that was never started is a successful no-op,
    // and so is stopping it again
    let outcome = supervisor.stop(record.id).await?;
    assert_eq!(outcome, StopOutcome::NotRunning);
    let outcome = supervisor.stop(record.id).await?;
    assert_eq!(outcome, StopOutcome::NotRunning);

    Ok(())
}

#[tokio::test]
async fn test_delete_is_refused_while_running() -> Result<()> {
    let _serial = process_table_lock();
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;
    supervisor.start(record.id).await?;
    assert!(wait_for_liveness(&supervisor, record.id, true).await);

    // Deleting a running service must fail and leave everything in place
    let err = supervisor.delete(record.id).await.unwrap_err();
    assert!(matches!(err, Error::InUse(_)));
    assert!(supervisor.service_dir(record.id).is_dir());
    assert!(supervisor.status_of(record.id).await.is_ok());

    // After a stop the same delete goes through
    supervisor.stop(record.id).await?;
    assert!(wait_for_liveness(&supervisor, record.id, false).await);
    supervisor.delete(record.id).await?;
    assert!(!supervisor.service_dir(record.id).exists());

    Ok(())
}

#[tokio::test]
async fn test_deploy_records_version_history() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders-1.0.jar", JAR_BYTES).await?;
    let first_version = record.artifact_path.clone();

    // Deploy flips the active artifact and remembers the superseded one
    let updated = supervisor.deploy(record.id, "orders-1.1.jar", JAR_BYTES).await?;
    assert_ne!(updated.artifact_path, first_version);
    assert_eq!(updated.previous_artifact_path.as_deref(), Some(first_version.as_str()));
    assert!(updated.last_deployed_at.is_some());

    // A same-minute redeploy gets a fresh name instead of overwriting
    let third = supervisor.deploy(record.id, "orders-1.2.jar", JAR_BYTES).await?;
    assert_ne!(third.artifact_path, updated.artifact_path);

    // Every version stays on disk
    let files = supervisor.list_files(record.id).await?;
    assert!(files.contains(&first_version));
    assert!(files.contains(&updated.artifact_path));
    assert!(files.contains(&third.artifact_path));

    // Status reports the active version
    let status = supervisor.status_of(record.id).await?;
    assert_eq!(status.artifact_version, third.artifact_path);
    assert!(status.last_deployed_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_deploy_while_running_keeps_instance_reachable() -> Result<()> {
    let _serial = process_table_lock();
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;
    supervisor.start(record.id).await?;
    assert!(wait_for_liveness(&supervisor, record.id, true).await);

    // Deploy while the old version is still running
    let updated = supervisor.deploy(record.id, "orders.jar", JAR_BYTES).await?;

    // Status tracks the new current artifact, which no process runs yet
    let status = supervisor.status_of(record.id).await?;
    assert!(!status.running);
    assert_eq!(status.artifact_version, updated.artifact_path);

    // The superseded instance still counts as in use
    let err = supervisor.delete(record.id).await.unwrap_err();
    assert!(matches!(err, Error::InUse(_)));

    // And stop still reaches it through the superseded artifact name
    let outcome = supervisor.stop(record.id).await?;
    assert_eq!(outcome, StopOutcome::Terminated);
    supervisor.delete(record.id).await?;

    Ok(())
}

#[tokio::test]
async fn test_set_launch_args_applies_on_next_start() -> Result<()> {
    let _serial = process_table_lock();
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;

    // Empty strings are rejected outright
    let err = supervisor
        .set_launch_args(record.id, vec!["".to_string()], vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let updated = supervisor
        .set_launch_args(
            record.id,
            vec!["-Xmx256m".to_string()],
            vec!["--server.port=0".to_string()],
        )
        .await?;
    assert_eq!(updated.launch_args.prefix, vec!["-Xmx256m"]);
    assert_eq!(updated.launch_args.suffix, vec!["--server.port=0"]);

    // The next start carries the arguments on the command line
    supervisor.start(record.id).await?;
    assert!(wait_for_liveness(&supervisor, record.id, true).await);

    let status = supervisor.status_of(record.id).await?;
    let snapshot = SystemProcessTable::new().snapshot()?;
    let entry = snapshot
        .entries()
        .iter()
        .find(|entry| entry.command_line.contains(&status.artifact_version))
        .expect("launched process should be in the table");
    assert!(entry.command_line.contains("-Xmx256m"));
    assert!(entry.command_line.contains("--server.port=0"));

    supervisor.stop(record.id).await?;
    Ok(())
}

#[tokio::test]
async fn test_register_rejects_bad_input() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    // Blank name
    let err = supervisor.register("   ", "app.jar", JAR_BYTES).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // Wrong extension
    let err = supervisor.register("orders", "app.war", JAR_BYTES).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArtifact(_)));

    // Not an archive
    let err = supervisor.register("orders", "app.jar", b"plain text").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArtifact(_)));

    // Nothing was provisioned by the failed attempts
    assert!(supervisor.status().await?.is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_registrations_all_survive() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = std::sync::Arc::new(test_supervisor(root.path()));

    // Race a handful of registrations through the store's mutate path
    let mut handles = Vec::new();
    for n in 0..6 {
        let supervisor = std::sync::Arc::clone(&supervisor);
        handles.push(tokio::spawn(async move {
            supervisor
                .register(&format!("service-{}", n), "app.jar", JAR_BYTES)
                .await
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let record = handle.await.expect("registration task panicked")?;
        ids.insert(record.id);
    }
    assert_eq!(ids.len(), 6);

    // Every record made it into the store
    let statuses = supervisor.status().await?;
    assert_eq!(statuses.len(), 6);

    Ok(())
}

#[tokio::test]
async fn test_operations_on_unknown_service() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let ghost: ServiceId = Uuid::new_v4().to_string().parse()?;

    assert!(matches!(supervisor.start(ghost).await, Err(Error::ServiceNotFound(_))));
    assert!(matches!(supervisor.stop(ghost).await, Err(Error::ServiceNotFound(_))));
    assert!(matches!(supervisor.status_of(ghost).await, Err(Error::ServiceNotFound(_))));
    assert!(matches!(
        supervisor.deploy(ghost, "app.jar", JAR_BYTES).await,
        Err(Error::ServiceNotFound(_))
    ));
    assert!(matches!(supervisor.delete(ghost).await, Err(Error::ServiceNotFound(_))));
    assert!(matches!(supervisor.list_files(ghost).await, Err(Error::ServiceNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_file_access_inside_service_directory() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;

    // Plain files keep their caller-supplied name and may be overwritten
    let name = supervisor
        .upload_file(record.id, "application.properties", b"server.port=8080")
        .await?;
    assert_eq!(name, "application.properties");
    supervisor
        .upload_file(record.id, "application.properties", b"server.port=9090")
        .await?;
    let bytes = supervisor.download_file(record.id, "application.properties").await?;
    assert_eq!(bytes, b"server.port=9090");

    // A jar upload lands under the versioned naming without touching the
    // record; activating it is deploy's job
    let stored = supervisor.upload_file(record.id, "hotfix.jar", JAR_BYTES).await?;
    assert_ne!(stored, "hotfix.jar");
    assert!(stored.ends_with(".jar"));
    let status = supervisor.status_of(record.id).await?;
    assert_eq!(status.artifact_version, record.artifact_path);

    // Traversal is rejected in both directions
    let err = supervisor
        .upload_file(record.id, "../escape.txt", b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    let err = supervisor
        .download_file(record.id, "../../etc/passwd")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // The listing shows every file that landed in the directory
    let files = supervisor.list_files(record.id).await?;
    assert!(files.contains(&record.artifact_path));
    assert!(files.contains(&"application.properties".to_string()));
    assert!(files.contains(&stored));

    Ok(())
}

#[tokio::test]
async fn test_start_with_bogus_runtime_fails() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let mut config = SupervisorConfig::new(root.path().join("data"));
    config.java_bin = "/nonexistent/definitely-not-java".to_string();
    let supervisor = JarSupervisor::new(config);

    let record = supervisor.register("orders", "orders.jar", JAR_BYTES).await?;
    let result = supervisor.start(record.id).await;

    assert!(matches!(result, Err(Error::Launch(_))));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_record_file_blocks_operations() -> Result<()> {
    let root = tempfile::tempdir().unwrap();
    let supervisor = test_supervisor(root.path());

    supervisor.register("orders", "orders.jar", JAR_BYTES).await?;

    // Scribble over the record file behind the supervisor's back
    let record_file = supervisor.config().data_dir.join("record.json");
    let garbage = "{ scrambled";
    std::fs::write(&record_file, garbage).unwrap();

    // Reads and writes both surface the corruption instead of resetting
    assert!(matches!(supervisor.status().await, Err(Error::StoreCorrupt(_))));
    let result = supervisor.register("billing", "billing.jar", JAR_BYTES).await;
    assert!(matches!(result, Err(Error::StoreCorrupt(_))));

    let content = std::fs::read_to_string(&record_file).unwrap();
    assert_eq!(content, garbage);

    Ok(())
}
