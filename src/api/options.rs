//! Configurable knobs for the API client along with validation helpers so
//! callers can reason about timeouts, in-flight bounds, and pagination.

use anyhow::{bail, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;
const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Upper bound on simultaneously in-flight requests through this client.
    pub max_concurrent_requests: usize,
    /// Items requested per page when listing connections.
    pub page_size: usize,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ApiClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("base_url must start with http:// or https://");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be greater than 0");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!("page_size must be between 1 and {MAX_PAGE_SIZE}");
        }
        Ok(())
    }
}
