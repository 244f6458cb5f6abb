pub mod api;
pub mod engine;
pub mod executor;
pub mod promotion;
pub mod runtime;

pub use api::client::{ApiError, GithubClient, UserGraphClient};
pub use api::metrics::ApiMetricsSnapshot;
pub use api::options::ApiClientOptions;
pub use engine::action::{Action, ActionKind, ActionReason};
pub use engine::plan::{reconcile, ReconcileInputs, ReconcilePlan, ReconcilePolicy};
pub use engine::snapshot::{BanLists, GraphSnapshot, Login};
pub use executor::controller::ExecutionController;
pub use executor::outcome::{ActionOutcome, ExecutionReport, FailureKind};
pub use promotion::record::PromotedUser;
pub use promotion::store::{FilePromotionStore, PromotionStorage, PromotionStore};
pub use runtime::config::{RunConfig, RunConfigBuilder, RunConfigParams};
pub use runtime::report::{summarize, PromotionActivity, RunSummary};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
