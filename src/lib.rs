//! Shortreap: a distributed archival crawler for URL shorteners
//!
//! This crate enumerates shortcodes for a URL-shortening service, resolves each code
//! to its destination (or learns that it is gone or blocked), and reports the results
//! to a coordinating tracker for permanent storage.
//!
//! The moving parts are:
//! - [`generator`]: deterministic shortcode sequences reproducible from a task
//! - [`service`]: one adapter per shortener, classifying responses into [`FetchOutcome`]s
//! - [`reaper`]: the engine that runs one task with rate limiting and backoff
//! - [`tracker`]: the client that leases tasks and submits result streams

pub mod config;
pub mod generator;
pub mod reaper;
pub mod service;
pub mod task;
pub mod tester;
pub mod tracker;
pub mod worker;

use thiserror::Error;

/// Main error type for Shortreap operations
#[derive(Debug, Error)]
pub enum ShortreapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while building a code generator from task options
///
/// These are raised before any network activity takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Code length {length} exceeds digest size of {digest_size} bytes")]
    LengthExceedsDigest { length: usize, digest_size: usize },

    #[error("Code length must be at least 1")]
    ZeroLength,

    #[error("Charset must not be empty")]
    EmptyCharset,

    #[error("Character {character:?} in code {code:?} is not part of the charset")]
    ForeignCharacter { code: String, character: char },

    #[error("Unknown generator type: {0}")]
    UnknownType(String),

    #[error("Invalid options for {kind} generator: {message}")]
    InvalidOptions { kind: String, message: String },
}

/// Failures of a service adapter
///
/// Inside the reaper every one of these ends up as a
/// [`FetchOutcome::TransientError`]; they never abort a run.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Invalid base URL for {service}: {message}")]
    InvalidBaseUrl { service: String, message: String },
}

/// Tracker communication errors
///
/// These are not handled by the library; the worker loop decides whether to sleep
/// and retry or to give up.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("HTTP error talking to tracker: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracker refused the request (403 Forbidden): {reason}")]
    Forbidden { reason: String },

    #[error("Unexpected status {status} from tracker for {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Malformed task from tracker: {0}")]
    MalformedTask(#[from] serde_json::Error),

    #[error("Invalid tracker URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to read result stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Shortreap operations
pub type Result<T> = std::result::Result<T, ShortreapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for service adapter internals
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

// Re-export commonly used types
pub use config::Config;
pub use generator::{Generator, GeneratorOptions};
pub use reaper::{ReapOutput, Reaper, RunStats};
pub use service::{create_service, FetchOutcome, RateLimit, Service, ServiceKind};
pub use task::{Task, TaskId};
pub use tracker::{Submission, TrackerClient};
