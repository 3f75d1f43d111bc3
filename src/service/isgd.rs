//! is.gd and its sibling v.gd
//!
//! | HEAD status | Meaning |
//! |-------------|---------|
//! | 301 | Redirect, Location is the destination |
//! | 404 | Code not in use |
//! | 502 | Code disabled by the operators |
//! | 200 | A notice page; a follow-up GET decides |
//!
//! The notice page is either a rate limit notice or the "URL disabled" page, which
//! still spells out the original destination (HTML-escaped) after a fixed sentence.

use super::markup::{page_title, text_between, unescape};
use super::{FetchOutcome, HttpTransport, RateLimit, Service, ServiceKind};
use crate::{ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::StatusCode;

const CHARSET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";

/// Text right before the destination on the "URL disabled" page
const DESTINATION_PREFIX: &str = "since it may damage your PC): -";
const DESTINATION_SUFFIX: &str = "</p>";

/// Marker of the page served when the worker exceeds the allowance
const RATE_LIMIT_MARKER: &str = "Rate limit exceeded";

/// Adapter for is.gd-style shorteners
pub struct Isgd {
    kind: ServiceKind,
    disabled_title: &'static str,
    transport: HttpTransport,
}

impl Isgd {
    pub fn isgd(transport: HttpTransport) -> Self {
        Self {
            kind: ServiceKind::Isgd,
            disabled_title: "is.gd - URL disabled",
            transport,
        }
    }

    pub fn vgd(transport: HttpTransport) -> Self {
        Self {
            kind: ServiceKind::Vgd,
            disabled_title: "v.gd - URL disabled",
            transport,
        }
    }

    async fn try_fetch(&mut self, code: &str) -> ServiceResult<FetchOutcome> {
        let path = format!("/{}", code);
        let response = self.transport.head(&path).await?;

        match response.status {
            StatusCode::MOVED_PERMANENTLY => {
                Ok(FetchOutcome::resolved(response.require_location()?))
            }
            StatusCode::NOT_FOUND => Ok(FetchOutcome::Absent),
            StatusCode::BAD_GATEWAY => Ok(FetchOutcome::CodeBlocked),
            StatusCode::OK => self.fetch_notice_page(&path).await,
            other => Err(ServiceError::Fetch(format!(
                "Expected 200/301/404/502, but received {}",
                other.as_u16()
            ))),
        }
    }

    /// Fetches and classifies the page behind a 200 response
    async fn fetch_notice_page(&self, path: &str) -> ServiceResult<FetchOutcome> {
        let response = self.transport.get(path).await?;
        if response.status != StatusCode::OK {
            return Err(ServiceError::Fetch(format!(
                "Status suddenly changed from 200 to {}",
                response.status.as_u16()
            )));
        }

        let html = response.text();
        if html.contains(RATE_LIMIT_MARKER) {
            return Ok(FetchOutcome::ServiceBlocked);
        }

        if page_title(&html).as_deref() == Some(self.disabled_title) {
            if let Some(raw) = text_between(&html, DESTINATION_PREFIX, DESTINATION_SUFFIX) {
                let url = unescape(raw.trim());
                if !url.is_empty() {
                    return Ok(FetchOutcome::resolved(url));
                }
            }
        }

        Err(ServiceError::Fetch("Could not parse URL from HTML".to_string()))
    }
}

#[async_trait]
impl Service for Isgd {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn charset(&self) -> &'static str {
        CHARSET
    }

    fn rate_limit(&self) -> Option<RateLimit> {
        Some(RateLimit::new(60, 60))
    }

    async fn fetch(&mut self, code: &str) -> FetchOutcome {
        self.try_fetch(code).await.unwrap_or_else(FetchOutcome::from)
    }
}
