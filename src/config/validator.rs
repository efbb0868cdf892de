use crate::config::SupervisorConfig;
use crate::error::{Error, Result};

/// Validates the paths in a supervisor configuration
pub fn validate_paths(config: &SupervisorConfig) -> Result<()> {
    // Check the data directory is set
    if config.data_dir.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("Data directory is empty".to_string()));
    }

    // The log file name is joined under each service directory, so it must
    // stay a plain file name
    if config.log_file_name.is_empty() {
        return Err(Error::ConfigInvalid("Log file name is empty".to_string()));
    }
    if config.log_file_name.contains('/') || config.log_file_name.contains("..") {
        return Err(Error::ConfigInvalid(format!(
            "Log file name '{}' must not contain path components",
            config.log_file_name
        )));
    }

    Ok(())
}

/// Validates the runtime and stop-protocol settings
pub fn validate_runtime(config: &SupervisorConfig) -> Result<()> {
    // Check the runtime binary is not empty
    // We could also check the binary exists on the system, but an absolute
    // check would reject configs written on one host for another
    if config.java_bin.is_empty() {
        return Err(Error::ConfigInvalid("Runtime binary is empty".to_string()));
    }

    // Zero attempts would skip straight past the graceful signal
    if config.stop_poll_attempts == 0 {
        return Err(Error::ConfigInvalid(
            "Stop poll attempts must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &SupervisorConfig) -> Result<()> {
    validate_paths(config)?;
    validate_runtime(config)?;

    Ok(())
}
