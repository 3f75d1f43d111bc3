//! URL shortener adapters
//!
//! Every shortener speaks plain HTTP but encodes its answers differently: status codes,
//! custom headers, warning pages and notice pages all carry meaning. An adapter hides
//! those quirks behind the [`Service`] trait and reports one [`FetchOutcome`] per code.
//!
//! Adapters are looked up by name through [`create_service`], which is the only place
//! that knows the full set of supported services.

mod bitly;
mod isgd;
pub mod markup;
mod tinyurl;
mod transport;

pub use bitly::Bitly;
pub use isgd::Isgd;
pub use tinyurl::Tinyurl;
pub use transport::{build_http_client, HttpResponse, HttpTransport};

use crate::config::{HttpConfig, ServiceOverride};
use crate::ServiceError;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Result of looking up one shortcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The code maps to this URL (raw bytes as sent by the service)
    Resolved(Vec<u8>),

    /// No mapping exists for the code
    Absent,

    /// The mapping existed but was removed or blocked by the service
    CodeBlocked,

    /// The service is throttling or blocking this worker
    ServiceBlocked,

    /// Network fault or an unrecognized response shape
    TransientError(String),
}

impl FetchOutcome {
    /// Convenience constructor for [`FetchOutcome::Resolved`]
    pub fn resolved(url: impl Into<Vec<u8>>) -> Self {
        Self::Resolved(url.into())
    }
}

impl From<ServiceError> for FetchOutcome {
    fn from(error: ServiceError) -> Self {
        Self::TransientError(error.to_string())
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(url) => write!(f, "resolved to {}", String::from_utf8_lossy(url)),
            Self::Absent => f.write_str("absent"),
            Self::CodeBlocked => f.write_str("code blocked"),
            Self::ServiceBlocked => f.write_str("service blocked"),
            Self::TransientError(message) => write!(f, "transient error ({})", message),
        }
    }
}

/// Fixed-window request allowance for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests_per_window: u32,
    pub window: Duration,
}

impl RateLimit {
    /// Applied when a service declares no limit of its own
    pub const DEFAULT: RateLimit = RateLimit {
        requests_per_window: 5,
        window: Duration::from_secs(5),
    };

    pub fn new(requests_per_window: u32, window_seconds: u64) -> Self {
        Self {
            requests_per_window,
            window: Duration::from_secs(window_seconds),
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests per {} seconds",
            self.requests_per_window,
            self.window.as_secs()
        )
    }
}

/// A URL shortener client
///
/// Implementations hold connection state, so `fetch` takes `&mut self`. One instance
/// serves one reaper at a time.
#[async_trait]
pub trait Service: Send {
    /// Registry name of this service
    fn name(&self) -> &'static str;

    /// Every character that may appear in a code, in the service's order
    fn charset(&self) -> &'static str;

    /// The service's request allowance, or `None` to use [`RateLimit::DEFAULT`]
    fn rate_limit(&self) -> Option<RateLimit> {
        None
    }

    /// Looks up one code
    async fn fetch(&mut self, code: &str) -> FetchOutcome;
}

/// The closed set of supported shorteners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Isgd,
    Vgd,
    Bitly,
    Tinyurl,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [Self::Isgd, Self::Vgd, Self::Bitly, Self::Tinyurl];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Isgd => "isgd",
            Self::Vgd => "vgd",
            Self::Bitly => "bitly",
            Self::Tinyurl => "tinyurl",
        }
    }

    /// Production endpoint of the service
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Isgd => "http://is.gd",
            Self::Vgd => "http://v.gd",
            Self::Bitly => "http://bit.ly",
            Self::Tinyurl => "http://tinyurl.com",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceKind {
    type Err = ServiceError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ServiceError::UnknownService(name.to_string()))
    }
}

/// Builds the adapter registered under `name`
///
/// # Arguments
///
/// * `name` - Service name as sent by the tracker (`isgd`, `vgd`, `bitly`, `tinyurl`)
/// * `http` - HTTP client settings
/// * `overrides` - Optional base URL and rate limit replacements
///
/// # Errors
///
/// * `ServiceError::UnknownService` - no adapter is registered under `name`
/// * `ServiceError::InvalidBaseUrl` - the override base URL is unusable
pub fn create_service(
    name: &str,
    http: &HttpConfig,
    overrides: Option<&ServiceOverride>,
) -> Result<Box<dyn Service>, ServiceError> {
    let kind: ServiceKind = name.parse()?;
    let base_url = overrides
        .and_then(|o| o.base_url.as_deref())
        .unwrap_or(kind.default_base_url());
    let transport = HttpTransport::new(kind.name(), base_url, http)?;

    let mut service: Box<dyn Service> = match kind {
        ServiceKind::Isgd => Box::new(Isgd::isgd(transport)),
        ServiceKind::Vgd => Box::new(Isgd::vgd(transport)),
        ServiceKind::Bitly => Box::new(Bitly::new(transport)),
        ServiceKind::Tinyurl => Box::new(Tinyurl::new(transport)),
    };

    let limit = overrides.and_then(|o| match (o.requests_per_window, o.window_seconds) {
        (Some(requests), Some(window)) => Some(RateLimit::new(requests, window)),
        _ => None,
    });
    if let Some(limit) = limit {
        service = Box::new(RateLimited {
            inner: service,
            limit,
        });
    }

    Ok(service)
}

/// Replaces a service's declared rate limit with a configured one
struct RateLimited {
    inner: Box<dyn Service>,
    limit: RateLimit,
}

#[async_trait]
impl Service for RateLimited {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn charset(&self) -> &'static str {
        self.inner.charset()
    }

    fn rate_limit(&self) -> Option<RateLimit> {
        Some(self.limit)
    }

    async fn fetch(&mut self, code: &str) -> FetchOutcome {
        self.inner.fetch(code).await
    }
}
