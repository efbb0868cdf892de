use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the Jar Warden supervisor.
///
/// This structure defines where service state lives on disk, which runtime
/// binary launches artifacts, and how patient the stop protocol is before
/// escalating from a graceful signal to a forced kill.
///
/// # JSON Schema
///
/// The configuration follows this JSON schema:
///
/// ```json
/// {
///   "dataDir": "/var/lib/jar-warden",
///   "javaBin": "java",
///   "stopPollAttempts": 5,
///   "stopPollIntervalMs": 1000,
///   "logFileName": "service.log"
/// }
/// ```
///
/// Only `dataDir` is required; every other field falls back to the default
/// shown above.
///
/// # Examples
///
/// Loading a configuration from a file:
///
/// ```no_run
/// use jar_warden::config::SupervisorConfig;
///
/// let config = SupervisorConfig::from_file("config.json").unwrap();
/// ```
///
/// Creating a configuration with defaults:
///
/// ```
/// use jar_warden::config::SupervisorConfig;
///
/// let config = SupervisorConfig::new("/var/lib/jar-warden");
/// assert_eq!(config.java_bin, "java");
/// assert_eq!(config.stop_poll_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Root directory holding one subdirectory per supervised service,
    /// plus the shared record file.
    #[serde(rename = "dataDir")]
    pub data_dir: PathBuf,

    /// Runtime binary used to launch artifacts.
    /// This can be an absolute path or a command available in the PATH.
    #[serde(rename = "javaBin", default = "default_java_bin")]
    pub java_bin: String,

    /// How many liveness polls to run after the graceful stop signal
    /// before escalating to a forced kill.
    #[serde(rename = "stopPollAttempts", default = "default_stop_poll_attempts")]
    pub stop_poll_attempts: u32,

    /// Pause between liveness polls, in milliseconds.
    #[serde(rename = "stopPollIntervalMs", default = "default_stop_poll_interval_ms")]
    pub stop_poll_interval_ms: u64,

    /// File name inside each service directory that receives the
    /// process's stdout and stderr.
    #[serde(rename = "logFileName", default = "default_log_file_name")]
    pub log_file_name: String,
}

fn default_java_bin() -> String {
    "java".to_string()
}

fn default_stop_poll_attempts() -> u32 {
    5
}

fn default_stop_poll_interval_ms() -> u64 {
    1000
}

fn default_log_file_name() -> String {
    "service.log".to_string()
}

impl SupervisorConfig {
    /// Creates a configuration for the given data directory with every
    /// other field at its default.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            java_bin: default_java_bin(),
            stop_poll_attempts: default_stop_poll_attempts(),
            stop_poll_interval_ms: default_stop_poll_interval_ms(),
            log_file_name: default_log_file_name(),
        }
    }

    /// Loads a configuration from a file path.
    ///
    /// This method reads the file at the specified path and parses its contents
    /// as a JSON configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the configuration file
    ///
    /// # Returns
    ///
    /// A `Result<SupervisorConfig>` that contains the parsed configuration or an error
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Arguments
    ///
    /// * `content` - A string containing JSON configuration
    ///
    /// # Returns
    ///
    /// A `Result<SupervisorConfig>` that contains the parsed configuration or an error
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The string is not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Pause between liveness polls as a [`Duration`].
    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config_str = r#"{
            "dataDir": "/var/lib/jar-warden"
        }"#;

        let config = SupervisorConfig::parse_from_str(config_str).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/jar-warden"));
        assert_eq!(config.java_bin, "java");
        assert_eq!(config.stop_poll_attempts, 5);
        assert_eq!(config.stop_poll_interval_ms, 1000);
        assert_eq!(config.log_file_name, "service.log");
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"{
            "dataDir": "/srv/services",
            "javaBin": "/opt/jdk/bin/java",
            "stopPollAttempts": 10,
            "stopPollIntervalMs": 250,
            "logFileName": "out.log"
        }"#;

        let config = SupervisorConfig::parse_from_str(config_str).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/services"));
        assert_eq!(config.java_bin, "/opt/jdk/bin/java");
        assert_eq!(config.stop_poll_attempts, 10);
        assert_eq!(config.stop_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.log_file_name, "out.log");
    }

    #[test]
    fn test_parse_rejects_missing_data_dir() {
        let config_str = r#"{ "javaBin": "java" }"#;

        let result = SupervisorConfig::parse_from_str(config_str);

        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }
}
