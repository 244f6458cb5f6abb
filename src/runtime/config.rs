use crate::engine::plan::ReconcilePolicy;
use crate::engine::snapshot::{BanLists, Login};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DAYS_PERIOD: u32 = 3;
const DEFAULT_COUNT_USERS: usize = 500;
const DEFAULT_DISCOVERY_SEEDS: usize = 5;
const DEFAULT_DISCOVERY_PAGES: usize = 2;
const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;
const DEFAULT_REQUEST_DELAY_MS: u64 = 1_500;
const DEFAULT_BATCH_SIZE: usize = 5;
const DEFAULT_STORE_PATH: &str = "promoted_users.txt";

/// Immutable configuration for one reconciliation run.
///
/// All instances must be constructed via [`RunConfig::builder`] or
/// [`RunConfig::new`] so invariants are validated before any consumer
/// observes the values. Nothing here is mutated after load.
#[derive(Debug, Clone)]
pub struct RunConfig {
    username: String,
    token: String,
    promotion_enabled: bool,
    days_period: u32,
    count_users: usize,
    discovery_seeds: usize,
    discovery_pages: usize,
    retry_on_error: bool,
    max_attempts: usize,
    max_concurrent_requests: usize,
    request_delay: Duration,
    batch_size: usize,
    unfollow_non_reciprocating: bool,
    ban_lists: BanLists,
    store_path: PathBuf,
}

pub struct RunConfigParams {
    pub username: String,
    pub token: String,
    pub promotion_enabled: bool,
    pub days_period: u32,
    pub count_users: usize,
    pub discovery_seeds: usize,
    pub discovery_pages: usize,
    pub retry_on_error: bool,
    pub max_attempts: usize,
    pub max_concurrent_requests: usize,
    pub request_delay: Duration,
    pub batch_size: usize,
    pub unfollow_non_reciprocating: bool,
    pub ban_lists: BanLists,
    pub store_path: PathBuf,
}

impl RunConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`RunConfig::builder`] for ergonomics when many values use
    /// defaults. Callers that already have concrete parameters can use this
    /// method to enforce validation without going through the builder.
    pub fn new(params: RunConfigParams) -> Result<Self> {
        let RunConfigParams {
            username,
            token,
            promotion_enabled,
            days_period,
            count_users,
            discovery_seeds,
            discovery_pages,
            retry_on_error,
            max_attempts,
            max_concurrent_requests,
            request_delay,
            batch_size,
            unfollow_non_reciprocating,
            ban_lists,
            store_path,
        } = params;

        let config = Self {
            username: username.trim().to_owned(),
            token: token.trim().to_owned(),
            promotion_enabled,
            days_period,
            count_users,
            discovery_seeds,
            discovery_pages,
            retry_on_error,
            max_attempts,
            max_concurrent_requests,
            request_delay,
            batch_size,
            unfollow_non_reciprocating,
            ban_lists,
            store_path,
        };

        config.validate()?;
        Ok(config)
    }

    /// Login of the account being reconciled.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Bearer credential with read/write user-graph scope.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn promotion_enabled(&self) -> bool {
        self.promotion_enabled
    }

    /// Grace period in days before an unreciprocated promotion is unfollowed.
    pub fn days_period(&self) -> u32 {
        self.days_period
    }

    /// Maximum number of simultaneously tracked promotions.
    pub fn count_users(&self) -> usize {
        self.count_users
    }

    /// How many followers to use as seeds for second-degree discovery.
    pub fn discovery_seeds(&self) -> usize {
        self.discovery_seeds
    }

    /// How many follower pages to sample per discovery seed.
    pub fn discovery_pages(&self) -> usize {
        self.discovery_pages
    }

    pub fn retry_on_error(&self) -> bool {
        self.retry_on_error
    }

    /// Attempt ceiling per action when retries are enabled.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Bound on in-flight requests within a batch.
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Pause between consecutive batches.
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether non-promoted accounts that do not follow back are unfollowed.
    pub fn unfollow_non_reciprocating(&self) -> bool {
        self.unfollow_non_reciprocating
    }

    pub fn ban_lists(&self) -> &BanLists {
        &self.ban_lists
    }

    /// Location of the persisted promotion ledger.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn viewer(&self) -> Login {
        Login::new(self.username.as_str())
    }

    /// The policy view consumed by the reconciliation engine.
    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            promotion_enabled: self.promotion_enabled,
            days_period: self.days_period,
            count_users: self.count_users,
            unfollow_non_reciprocating: self.unfollow_non_reciprocating,
        }
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("username cannot be empty");
        }

        if self.token.trim().is_empty() {
            bail!("token cannot be empty");
        }

        if self.days_period == 0 {
            bail!("days_period must be at least 1");
        }

        if self.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }

        if self.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be greater than 0");
        }

        if self.max_attempts == 0 {
            bail!("max_attempts must be greater than 0");
        }

        if self.discovery_seeds == 0 {
            bail!("discovery_seeds must be greater than 0");
        }

        if self.discovery_pages == 0 {
            bail!("discovery_pages must be greater than 0");
        }

        if self.store_path.as_os_str().is_empty() {
            bail!("store_path cannot be empty");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunConfigBuilder {
    username: Option<String>,
    token: Option<String>,
    promotion_enabled: Option<bool>,
    days_period: Option<u32>,
    count_users: Option<usize>,
    discovery_seeds: Option<usize>,
    discovery_pages: Option<usize>,
    retry_on_error: Option<bool>,
    max_attempts: Option<usize>,
    max_concurrent_requests: Option<usize>,
    request_delay: Option<Duration>,
    batch_size: Option<usize>,
    unfollow_non_reciprocating: Option<bool>,
    ban_lists: Option<BanLists>,
    store_path: Option<PathBuf>,
}

impl RunConfigBuilder {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn promotion_enabled(mut self, enabled: bool) -> Self {
        self.promotion_enabled = Some(enabled);
        self
    }

    pub fn days_period(mut self, days: u32) -> Self {
        self.days_period = Some(days);
        self
    }

    pub fn count_users(mut self, count: usize) -> Self {
        self.count_users = Some(count);
        self
    }

    pub fn discovery_seeds(mut self, seeds: usize) -> Self {
        self.discovery_seeds = Some(seeds);
        self
    }

    pub fn discovery_pages(mut self, pages: usize) -> Self {
        self.discovery_pages = Some(pages);
        self
    }

    pub fn retry_on_error(mut self, retry: bool) -> Self {
        self.retry_on_error = Some(retry);
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn max_concurrent_requests(mut self, concurrent: usize) -> Self {
        self.max_concurrent_requests = Some(concurrent);
        self
    }

    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn unfollow_non_reciprocating(mut self, unfollow: bool) -> Self {
        self.unfollow_non_reciprocating = Some(unfollow);
        self
    }

    pub fn ban_lists(mut self, ban_lists: BanLists) -> Self {
        self.ban_lists = Some(ban_lists);
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<RunConfig> {
        let params = RunConfigParams {
            username: self.username.context("username is required")?,
            token: self.token.context("token is required")?,
            promotion_enabled: self.promotion_enabled.unwrap_or(true),
            days_period: self.days_period.unwrap_or(DEFAULT_DAYS_PERIOD),
            count_users: self.count_users.unwrap_or(DEFAULT_COUNT_USERS),
            discovery_seeds: self.discovery_seeds.unwrap_or(DEFAULT_DISCOVERY_SEEDS),
            discovery_pages: self.discovery_pages.unwrap_or(DEFAULT_DISCOVERY_PAGES),
            retry_on_error: self.retry_on_error.unwrap_or(true),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            max_concurrent_requests: self
                .max_concurrent_requests
                .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS),
            request_delay: self
                .request_delay
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_REQUEST_DELAY_MS)),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            unfollow_non_reciprocating: self.unfollow_non_reciprocating.unwrap_or(true),
            ban_lists: self.ban_lists.unwrap_or_default(),
            store_path: self
                .store_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
        };

        RunConfig::new(params)
    }
}
