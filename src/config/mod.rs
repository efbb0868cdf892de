//! Configuration module for Jar Warden.
//!
//! This module handles parsing, validation, and access to configuration
//! settings for the supervisor. It supports loading configurations from
//! files or strings in JSON format.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use jar_warden::config::SupervisorConfig;
//!
//! let config = SupervisorConfig::from_file("config.json").unwrap();
//! println!("Supervising services under {}", config.data_dir.display());
//! ```
//!
//! Creating a configuration programmatically:
//! ```
//! use jar_warden::{JarSupervisor, config::SupervisorConfig};
//!
//! let config = SupervisorConfig::new("/var/lib/jar-warden");
//! let supervisor = JarSupervisor::new(config);
//! ```
mod parser;
pub mod validator;

pub use parser::SupervisorConfig;
pub use validator::validate_config;
