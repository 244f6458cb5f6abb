//! REST client for the remote user-graph API. Houses the `GithubClient`, the
//! typed error taxonomy, and the `UserGraphClient` trait consumed by the
//! executor and tests.

use crate::api::auth::build_auth_headers;
use crate::api::metrics::{ApiMetrics, ApiMetricsSnapshot};
use crate::api::options::ApiClientOptions;
use crate::engine::snapshot::Login;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Closed error taxonomy produced at this boundary. Retry orchestration is
/// the executor's responsibility; the client only classifies.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid or expired credential. Fatal for the whole run.
    Auth,
    /// Throttled; carries the server-provided wait hint when present.
    RateLimited { retry_after: Option<Duration> },
    /// Transient transport failure (connect, timeout, 5xx).
    Network { message: String },
    /// The target account no longer exists. Benign skip.
    NotFound { login: String },
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Network { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Auth => write!(f, "credential rejected by the platform"),
            ApiError::RateLimited { retry_after } => match retry_after {
                Some(wait) => write!(f, "rate limited; retry after {}s", wait.as_secs()),
                None => write!(f, "rate limited"),
            },
            ApiError::Network { message } => write!(f, "transport failure: {message}"),
            ApiError::NotFound { login } => write!(f, "account {login} does not exist"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Capability-bounded seam over the four graph operations plus the
/// second-degree listing used by promotion discovery.
pub trait UserGraphClient: Send + Sync {
    fn list_followers(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>>;
    fn list_following(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>>;
    fn follow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>>;
    fn unfollow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>>;
    fn followers_of<'a>(
        &'a self,
        login: &'a Login,
        max_pages: usize,
    ) -> BoxFuture<'a, Result<Vec<Login>>>;
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    base_url: Arc<String>,
    username: Arc<String>,
    client: Client,
    page_size: usize,
    limiter: Arc<Semaphore>,
    metrics: Arc<ApiMetrics>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    login: String,
}

impl UserGraphClient for GithubClient {
    fn list_followers(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>> {
        Box::pin(self.list_connection("followers"))
    }

    fn list_following(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>> {
        Box::pin(self.list_connection("following"))
    }

    fn follow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.follow(login))
    }

    fn unfollow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.unfollow(login))
    }

    fn followers_of<'a>(
        &'a self,
        login: &'a Login,
        max_pages: usize,
    ) -> BoxFuture<'a, Result<Vec<Login>>> {
        Box::pin(self.followers_of(login, max_pages))
    }
}

impl GithubClient {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_options(username, token, ApiClientOptions::default())
    }

    pub fn with_options(
        username: impl Into<String>,
        token: impl Into<String>,
        options: ApiClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let headers = build_auth_headers(&token.into())?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.request_timeout)
            .build()
            .map_err(|err| anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self {
            base_url: Arc::new(options.base_url.trim().trim_end_matches('/').to_owned()),
            username: Arc::new(username.into()),
            client,
            page_size: options.page_size,
            limiter: Arc::new(Semaphore::new(options.max_concurrent_requests)),
            metrics: Arc::new(ApiMetrics::default()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn metrics(&self) -> ApiMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fetches the authenticated user's follower or following list, paging
    /// until a short page and deduplicating case-insensitively.
    async fn list_connection(&self, direction: &'static str) -> Result<BTreeSet<Login>> {
        let mut results = BTreeSet::new();
        let mut page = 1usize;

        loop {
            let records = self.fetch_page(&self.username, direction, page).await?;
            let count = records.len();
            for record in records {
                results.insert(Login::new(record.login));
            }
            if count < self.page_size {
                break;
            }
            page += 1;
        }

        tracing::debug!(direction, count = results.len(), "fetched connection list");
        Ok(results)
    }

    /// Samples up to `max_pages` follower pages of another account, in page
    /// order, stopping early on a short page.
    async fn followers_of(&self, login: &Login, max_pages: usize) -> Result<Vec<Login>> {
        let mut found = Vec::new();

        for page in 1..=max_pages.max(1) {
            let records = self.fetch_page(login.as_str(), "followers", page).await?;
            let count = records.len();
            found.extend(records.into_iter().map(|record| Login::new(record.login)));
            if count < self.page_size {
                break;
            }
        }

        tracing::debug!(
            login = login.as_str(),
            count = found.len(),
            "sampled second-degree followers"
        );
        Ok(found)
    }

    async fn fetch_page(
        &self,
        login: &str,
        direction: &'static str,
        page: usize,
    ) -> Result<Vec<AccountRecord>> {
        let url = format!("{}/users/{}/{}", self.base_url, login, direction);
        let query = [
            ("per_page", self.page_size.to_string()),
            ("page", page.to_string()),
        ];

        let response = self
            .send(Method::GET, url, Some(&query), None)
            .await
            .with_context(|| format!("failed to list {direction} page {page} for {login}"))?;

        response
            .json()
            .await
            .map_err(|err| {
                anyhow!(ApiError::Network {
                    message: format!("invalid {direction} payload: {err}"),
                })
            })
    }

    /// Follows the target account. Repeating a follow on an already-followed
    /// user is a benign no-op on the wire and reported as success.
    pub async fn follow(&self, login: &Login) -> Result<()> {
        let url = format!("{}/user/following/{}", self.base_url, login.as_str());
        self.send(Method::PUT, url, None, Some(login))
            .await
            .with_context(|| format!("failed to follow {login}"))?;
        tracing::debug!(login = login.as_str(), "follow request accepted");
        Ok(())
    }

    /// Unfollows the target account; symmetric to [`GithubClient::follow`].
    pub async fn unfollow(&self, login: &Login) -> Result<()> {
        let url = format!("{}/user/following/{}", self.base_url, login.as_str());
        self.send(Method::DELETE, url, None, Some(login))
            .await
            .with_context(|| format!("failed to unfollow {login}"))?;
        tracing::debug!(login = login.as_str(), "unfollow request accepted");
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        query: Option<&[(&str, String)]>,
        target: Option<&Login>,
    ) -> Result<Response> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| anyhow!("request limiter closed"))?;

        let mut request = self.client.request(method, &url);
        if let Some(query) = query {
            request = request.query(query);
        }

        let started = Instant::now();
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                self.metrics.record_success(started.elapsed());
                Ok(response)
            }
            Ok(response) => {
                let status = response.status();
                let err = classify_status(status, response.headers(), target);
                if matches!(err, ApiError::RateLimited { .. }) {
                    self.metrics.record_rate_limit(started.elapsed());
                } else {
                    self.metrics.record_failure(started.elapsed());
                }
                Err(err.into())
            }
            Err(err) => {
                self.metrics.record_failure(started.elapsed());
                Err(ApiError::Network {
                    message: err.to_string(),
                }
                .into())
            }
        }
    }
}

/// Maps a non-success status to the error taxonomy. The platform reports
/// primary rate limiting as 403 with a drained quota header, so 403 is only
/// an auth failure when the quota is not exhausted.
fn classify_status(status: StatusCode, headers: &HeaderMap, target: Option<&Login>) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Auth,
        StatusCode::FORBIDDEN => {
            if rate_limit_remaining(headers) == Some(0) || headers.contains_key("retry-after") {
                ApiError::RateLimited {
                    retry_after: retry_after_hint(headers),
                }
            } else {
                ApiError::Auth
            }
        }
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after: retry_after_hint(headers),
        },
        StatusCode::NOT_FOUND => ApiError::NotFound {
            login: target
                .map(|login| login.as_str().to_owned())
                .unwrap_or_else(|| "<unknown>".to_owned()),
        },
        status => ApiError::Network {
            message: format!("server returned {status}"),
        },
    }
}

/// Reads the server wait hint: `Retry-After` in seconds when present,
/// otherwise the time until the rate-limit window resets.
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    if let Some(seconds) = header_u64(headers, "retry-after") {
        return Some(Duration::from_secs(seconds));
    }

    let reset_epoch = header_u64(headers, "x-ratelimit-reset")?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Some(Duration::from_secs(reset_epoch.saturating_sub(now)))
}

fn rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, "x-ratelimit-remaining")
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = classify_status(StatusCode::UNAUTHORIZED, &HeaderMap::new(), None);
        assert!(matches!(err, ApiError::Auth));
    }

    #[test]
    fn forbidden_with_drained_quota_is_rate_limited() {
        let err = classify_status(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "0"), ("retry-after", "30")]),
            None,
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert!(err.is_retryable());
    }

    #[test]
    fn forbidden_without_quota_headers_is_auth() {
        let err = classify_status(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "42")]),
            None,
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn too_many_requests_carries_the_hint() {
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            &headers(&[("retry-after", "7")]),
            None,
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn not_found_names_the_target() {
        let login = Login::new("ghost");
        let err = classify_status(StatusCode::NOT_FOUND, &HeaderMap::new(), Some(&login));
        match err {
            ApiError::NotFound { login } => assert_eq!(login, "ghost"),
            other => panic!("expected NotFound, got {other}"),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        let err = classify_status(StatusCode::BAD_GATEWAY, &HeaderMap::new(), None);
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn reset_epoch_in_the_past_yields_zero_wait() {
        let hint = retry_after_hint(&headers(&[("x-ratelimit-reset", "1000")]));
        assert_eq!(hint, Some(Duration::ZERO));
    }
}
