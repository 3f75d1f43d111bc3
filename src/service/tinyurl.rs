//! tinyurl.com
//!
//! TinyURL overloads its status codes:
//! - 301 normally carries a Location. Without one, the `X-tiny` header marks a code
//!   that was removed.
//! - 302 sends blocked codes to a notice page and throttled clients elsewhere.
//! - 200 and even 404 may serve a "Redirecting..." page for legacy codes, so both are
//!   followed by a GET before deciding.
//! - 500 shows up for single codes on a poisoned keep-alive connection and clears up
//!   after reconnecting.

use super::markup::{body_text, first_link, meta_refresh_target, page_title};
use super::{FetchOutcome, HttpResponse, HttpTransport, Service, ServiceKind};
use crate::{ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::StatusCode;

const CHARSET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

/// Custom header set on 301 responses for removed codes
const ERROR_HEADER: &str = "x-tiny";

/// Path fragment of the notice page blocked codes redirect to
const BLOCKED_PAGE: &[u8] = b"blocked.php";

const REDIRECTING_TITLE: &str = "Redirecting...";
const SELF_REDIRECT_MARKER: &str = "Error: TinyURL redirects to a TinyURL.";

/// Adapter for tinyurl.com
pub struct Tinyurl {
    transport: HttpTransport,
}

impl Tinyurl {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    async fn try_fetch(&mut self, code: &str) -> ServiceResult<FetchOutcome> {
        let path = format!("/{}", code);
        let response = self.transport.head(&path).await?;

        match response.status {
            StatusCode::MOVED_PERMANENTLY => classify_moved(&response),
            StatusCode::FOUND => {
                let blocked = response
                    .location()
                    .is_some_and(|l| l.windows(BLOCKED_PAGE.len()).any(|w| w == BLOCKED_PAGE));
                if blocked {
                    Ok(FetchOutcome::CodeBlocked)
                } else {
                    Ok(FetchOutcome::ServiceBlocked)
                }
            }
            StatusCode::OK | StatusCode::NOT_FOUND => {
                self.fetch_page(code, &path, response.status).await
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                self.transport.reconnect()?;
                Err(ServiceError::Fetch(format!(
                    "Server error for code {}, reconnected",
                    code
                )))
            }
            other => Err(ServiceError::Fetch(format!(
                "Expected 200/301/302/404, but received {} for code {}",
                other.as_u16(),
                code
            ))),
        }
    }

    /// Follows up a 200 or 404 HEAD with a GET and parses the page
    async fn fetch_page(
        &self,
        code: &str,
        path: &str,
        head_status: StatusCode,
    ) -> ServiceResult<FetchOutcome> {
        let response = self.transport.get(path).await?;
        if response.status != head_status {
            return Err(ServiceError::Fetch(format!(
                "Status changed from {} to {} for code {}",
                head_status.as_u16(),
                response.status.as_u16(),
                code
            )));
        }

        if let Some(url) = parse_redirect_page(&response.text()) {
            return Ok(FetchOutcome::resolved(url));
        }

        if head_status == StatusCode::NOT_FOUND {
            Ok(FetchOutcome::Absent)
        } else {
            Err(ServiceError::Fetch(format!(
                "Could not parse URL for code {}",
                code
            )))
        }
    }
}

fn classify_moved(response: &HttpResponse) -> ServiceResult<FetchOutcome> {
    if let Some(location) = response.location() {
        return Ok(FetchOutcome::resolved(location));
    }
    if response.header(ERROR_HEADER).is_some() {
        return Ok(FetchOutcome::CodeBlocked);
    }
    Err(ServiceError::Fetch(
        "301 without Location or X-tiny header".to_string(),
    ))
}

/// Extracts the destination from one of TinyURL's HTML redirect pages
fn parse_redirect_page(html: &str) -> Option<String> {
    if page_title(html).as_deref() == Some(REDIRECTING_TITLE) {
        return meta_refresh_target(html).or_else(|| body_text(html));
    }

    if html.contains(SELF_REDIRECT_MARKER) {
        return first_link(html, "p.intro a[href]").map(|url| url.trim_end_matches('\n').to_string());
    }

    None
}

#[async_trait]
impl Service for Tinyurl {
    fn name(&self) -> &'static str {
        ServiceKind::Tinyurl.name()
    }

    fn charset(&self) -> &'static str {
        CHARSET
    }

    async fn fetch(&mut self, code: &str) -> FetchOutcome {
        self.try_fetch(code).await.unwrap_or_else(FetchOutcome::from)
    }
}
