use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Tracker used when neither the config file nor the command line names one
pub const DEFAULT_TRACKER_URL: &str = "http://tracker.tinyarchive.org/v1/";

/// Protocol version reported to the tracker on every request
///
/// The tracker refuses clients whose version it does not accept, so this tracks the
/// tracker protocol rather than the package version.
pub const CLIENT_VERSION: &str = "2.0";

/// Main configuration structure for Shortreap
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Per-service overrides, keyed by service name
    #[serde(default)]
    pub services: HashMap<String, ServiceOverride>,
}

impl Config {
    /// Returns the override block for a service, if the config has one
    pub fn service_override(&self, name: &str) -> Option<&ServiceOverride> {
        self.services.get(name)
    }
}

/// Tracker connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Base URL of the tracker API
    #[serde(default = "default_tracker_url")]
    pub url: String,

    /// Username credited with submitted results
    #[serde(default)]
    pub username: Option<String>,

    /// Client version sent with every request
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: default_tracker_url(),
            username: None,
            version: default_version(),
        }
    }
}

/// Worker loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Seconds to sleep when the tracker has no work
    #[serde(rename = "idle-sleep", default = "default_idle_sleep")]
    pub idle_sleep: u64,

    /// Seconds to sleep after failing to talk to the tracker
    #[serde(rename = "error-sleep", default = "default_error_sleep")]
    pub error_sleep: u64,

    /// Directory for temporary result streams (system default when unset)
    #[serde(rename = "temp-dir", default)]
    pub temp_dir: Option<PathBuf>,
}

impl WorkerConfig {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_secs(self.idle_sleep)
    }

    pub fn error_sleep(&self) -> Duration {
        Duration::from_secs(self.error_sleep)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            idle_sleep: default_idle_sleep(),
            error_sleep: default_error_sleep(),
            temp_dir: None,
        }
    }
}

/// HTTP client settings shared by the tracker client and all service adapters
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// User-Agent header value
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Overrides for a single service adapter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceOverride {
    /// Replacement for the service's base URL (mirrors, test servers)
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Requests allowed per rate limit window
    #[serde(rename = "requests-per-window", default)]
    pub requests_per_window: Option<u32>,

    /// Length of the rate limit window in seconds
    #[serde(rename = "window-seconds", default)]
    pub window_seconds: Option<u64>,
}

fn default_tracker_url() -> String {
    DEFAULT_TRACKER_URL.to_string()
}

fn default_version() -> String {
    CLIENT_VERSION.to_string()
}

fn default_threads() -> u32 {
    1
}

fn default_idle_sleep() -> u64 {
    300
}

fn default_error_sleep() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("shortreap/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}
