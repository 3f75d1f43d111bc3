//! bit.ly
//!
//! A 301 carries the destination directly. A 302 points at bit.ly's own interstitial
//! warning page, which names the real destination in its `url` query parameter and the
//! code it was generated for in `hash`. The two must agree; otherwise the response
//! belongs to some other request and is a protocol violation.

use super::{FetchOutcome, HttpTransport, Service, ServiceKind};
use crate::{ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::StatusCode;

const CHARSET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

const WARNING_PATH: &str = "/a/warning";

/// Adapter for bit.ly
pub struct Bitly {
    transport: HttpTransport,
}

impl Bitly {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    async fn try_fetch(&mut self, code: &str) -> ServiceResult<FetchOutcome> {
        let response = self.transport.head(&format!("/{}", code)).await?;

        match response.status {
            StatusCode::MOVED_PERMANENTLY => {
                Ok(FetchOutcome::resolved(response.require_location()?))
            }
            StatusCode::FOUND => self.unwrap_warning(code, response.require_location()?),
            StatusCode::FORBIDDEN => Ok(FetchOutcome::ServiceBlocked),
            StatusCode::NOT_FOUND => Ok(FetchOutcome::Absent),
            other => Err(ServiceError::Fetch(format!(
                "Expected 301/302/403/404, but received {}",
                other.as_u16()
            ))),
        }
    }

    /// Extracts the destination from a warning page redirect
    fn unwrap_warning(&self, code: &str, location: &[u8]) -> ServiceResult<FetchOutcome> {
        let location = std::str::from_utf8(location)
            .map_err(|_| ServiceError::Fetch("302 Found with non-UTF-8 Location".to_string()))?;

        let base = self.transport.base();
        let target = base
            .join(location)
            .map_err(|e| ServiceError::Fetch(format!("302 Found with bad Location: {}", e)))?;

        if target.host_str() != base.host_str() || target.path() != WARNING_PATH {
            return Err(ServiceError::Fetch(format!(
                "302 Found but unknown redirect URL {}",
                target
            )));
        }

        let query = |key: &str| {
            target
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        if query("hash").as_deref() != Some(code) {
            return Err(ServiceError::Fetch(format!(
                "Code mismatch on 302 Found for {}",
                code
            )));
        }

        let url = query("url").ok_or_else(|| ServiceError::Fetch("No URL given".to_string()))?;
        Ok(FetchOutcome::resolved(url.trim()))
    }
}

#[async_trait]
impl Service for Bitly {
    fn name(&self) -> &'static str {
        ServiceKind::Bitly.name()
    }

    fn charset(&self) -> &'static str {
        CHARSET
    }

    async fn fetch(&mut self, code: &str) -> FetchOutcome {
        self.try_fetch(code).await.unwrap_or_else(FetchOutcome::from)
    }
}
