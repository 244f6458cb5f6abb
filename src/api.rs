//! REST client plumbing for the remote user-graph API: authentication,
//! pagination, error classification, metrics, and client options.

pub mod auth;
pub mod client;
pub mod metrics;
pub mod options;

pub use client::{ApiError, GithubClient, UserGraphClient};
pub use metrics::ApiMetricsSnapshot;
pub use options::ApiClientOptions;
