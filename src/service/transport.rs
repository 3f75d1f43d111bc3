//! HTTP transport shared by the service adapters
//!
//! Adapters talk to exactly one host. The transport holds a pooled `reqwest` client
//! pointed at that host's base URL, never follows redirects (the redirect *is* the
//! answer), and can drop its connection pool on demand.

use crate::config::HttpConfig;
use crate::{ServiceError, ServiceResult};
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect::Policy, Client, Method, StatusCode};
use std::borrow::Cow;
use url::Url;

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Raw bytes of a header, if present
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers.get(name).map(|value| value.as_bytes())
    }

    /// Raw bytes of the Location header, if present
    pub fn location(&self) -> Option<&[u8]> {
        self.headers.get(LOCATION).map(|value| value.as_bytes())
    }

    /// The Location header, or a fetch error naming the status that lacked it
    pub fn require_location(&self) -> ServiceResult<&[u8]> {
        self.location().ok_or_else(|| {
            ServiceError::Fetch(format!(
                "No Location header on {} response",
                self.status.as_u16()
            ))
        })
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Builds an HTTP client with the crate's standard settings
///
/// # Arguments
///
/// * `config` - Timeouts and user agent
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use shortreap::config::HttpConfig;
/// use shortreap::service::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::none()) // Redirects are the payload, never follow them
        .gzip(true)
        .brotli(true)
        .build()
}

/// Connection to a single shortener host
pub struct HttpTransport {
    base: Url,
    config: HttpConfig,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for `base_url`
    ///
    /// # Errors
    ///
    /// * `ServiceError::InvalidBaseUrl` - the base URL does not parse or is not http(s)
    /// * `ServiceError::Transport` - the HTTP client could not be built
    pub fn new(service: &str, base_url: &str, config: &HttpConfig) -> ServiceResult<Self> {
        let base = Url::parse(base_url).map_err(|e| ServiceError::InvalidBaseUrl {
            service: service.to_string(),
            message: e.to_string(),
        })?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ServiceError::InvalidBaseUrl {
                service: service.to_string(),
                message: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        Ok(Self {
            client: build_http_client(config)?,
            config: config.clone(),
            base,
        })
    }

    /// The base URL every request path is appended to
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Sends a HEAD request for `path` (which starts with `/`)
    pub async fn head(&self, path: &str) -> ServiceResult<HttpResponse> {
        self.request(Method::HEAD, path).await
    }

    /// Sends a GET request for `path` (which starts with `/`)
    pub async fn get(&self, path: &str) -> ServiceResult<HttpResponse> {
        self.request(Method::GET, path).await
    }

    /// Drops all pooled connections by replacing the client
    pub fn reconnect(&mut self) -> ServiceResult<()> {
        tracing::debug!("Reconnecting to {}", self.base);
        self.client = build_http_client(&self.config)?;
        Ok(())
    }

    async fn request(&self, method: Method, path: &str) -> ServiceResult<HttpResponse> {
        let url = self.url_for(path);
        tracing::trace!("{} {}", method, url);

        let response = self.client.request(method, url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", prefix, path));
        url
    }
}
