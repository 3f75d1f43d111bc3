//! Configuration module for Shortreap
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file means "all defaults".
//!
//! # Example
//!
//! ```no_run
//! use shortreap::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shortreap.toml")).unwrap();
//! println!("Running {} workers", config.worker.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, ServiceOverride, TrackerConfig, WorkerConfig, CLIENT_VERSION,
    DEFAULT_TRACKER_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
