use jar_warden::error::Result;
use jar_warden::{JarSupervisor, SupervisorConfig};
use std::os::unix::fs::PermissionsExt;
use tracing_subscriber::{EnvFilter, fmt}; // Import tracing subscriber components

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    // This configures how logs are collected and formatted.
    // `with_env_filter` reads the RUST_LOG environment variable to set the log level.
    // `with_target(true)` includes the module path in the log output.
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true) // Show module targets
        .init();

    tracing::info!("Starting supervise example");

    // Everything lives in a throwaway directory; a real deployment points
    // dataDir at something like /var/lib/jar-warden instead.
    let root = tempfile::tempdir().expect("create sandbox dir");

    // Stand-in runtime so the walkthrough runs on hosts without a JDK. It
    // is invoked exactly like `java`, so the artifact name shows up in the
    // process's command line, and it idles until stopped.
    let runtime = root.path().join("fake-java");
    std::fs::write(&runtime, "#!/bin/sh\nsleep 600\n").expect("write stand-in runtime");
    let mut perms = std::fs::metadata(&runtime).expect("stat runtime").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&runtime, perms).expect("chmod runtime");

    let mut config = SupervisorConfig::new(root.path().join("data"));
    config.java_bin = runtime.to_string_lossy().into_owned();
    config.stop_poll_interval_ms = 200;
    let supervisor = JarSupervisor::new(config);

    // Register a service from artifact bytes
    println!("Registering the orders service...");
    let jar = b"PK\x03\x04 demo archive".to_vec();
    let record = supervisor.register("orders", "orders.jar", &jar).await?;
    println!("- id: {}", record.id);
    println!("- artifact: {}", record.artifact_path);

    // Launch it as a detached process
    println!("\nStarting it...");
    let pid = supervisor.start(record.id).await?;
    println!("- spawned pid {} (informational; status re-resolves the process)", pid);
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    // One process table snapshot covers every service
    println!("\n=== Status ===");
    for status in supervisor.status().await? {
        println!(
            "- {} [{}] running={} version={}",
            status.name, status.id, status.running, status.artifact_version
        );
    }

    // Deploy a new version; the superseded artifact stays on disk
    println!("\nDeploying a new version...");
    let updated = supervisor.deploy(record.id, "orders.jar", &jar).await?;
    println!("- active artifact is now {}", updated.artifact_path);
    if let Some(previous) = &updated.previous_artifact_path {
        println!("- superseded {} is kept for rollback", previous);
    }

    println!("\nService directory contents:");
    for file in supervisor.list_files(record.id).await? {
        println!("- {}", file);
    }

    // Wind the service down: the stop protocol still finds the instance
    // launched before the deploy
    println!("\nStopping and deleting...");
    let outcome = supervisor.stop(record.id).await?;
    println!("- stop outcome: {:?}", outcome);
    if let Err(e) = supervisor.delete(record.id).await {
        println!("Warning: failed to delete the service: {}", e);
    }

    tracing::info!("supervise example finished");
    Ok(())
}
