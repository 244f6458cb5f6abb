use crate::api::client::{GithubClient, UserGraphClient};
use crate::engine::plan::{reconcile, ReconcileInputs};
use crate::engine::snapshot::{GraphSnapshot, Login};
use crate::executor::controller::ExecutionController;
use crate::executor::outcome::FailureKind;
use crate::promotion::store::{FilePromotionStore, PromotionStorage, PromotionStore};
use crate::runtime::config::RunConfig;
use crate::runtime::report::{summarize, PromotionActivity, RunSummary};
use crate::runtime::telemetry::{Telemetry, TelemetrySnapshot};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Coordinates one reconciliation pass: snapshot fetch, planning, execution,
/// and ledger persistence, with a root [`CancellationToken`] threaded through
/// the executor for graceful shutdowns.
pub struct Runner {
    config: RunConfig,
    client: Arc<dyn UserGraphClient>,
    storage: Arc<dyn PromotionStorage>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
}

impl Runner {
    /// Builds a runner with the default HTTP client and file-backed ledger.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(GithubClient::new(config.username(), config.token())?);
        let storage = Arc::new(FilePromotionStore::new(config.store_path()));
        Ok(Self::with_components(config, client, storage))
    }

    /// Wires explicit collaborators; the seam used by tests and alternative
    /// transports or ledger backends.
    pub fn with_components(
        config: RunConfig,
        client: Arc<dyn UserGraphClient>,
        storage: Arc<dyn PromotionStorage>,
    ) -> Self {
        Self {
            config,
            client,
            storage,
            telemetry: Arc::new(Telemetry::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns a clone of the root shutdown token so external callers can
    /// integrate with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    /// Performs a full reconciliation pass.
    ///
    /// The promotion ledger is saved even when a fatal error aborts
    /// execution, so mutations from settled actions always survive.
    pub async fn run(&self) -> Result<RunSummary> {
        let today = Local::now().date_naive();
        let snapshot = self.fetch_snapshot().await?;
        let mut store = self.storage.load().await?;

        let second_degree = self.discover_candidates(&snapshot, &store).await?;

        let viewer = self.config.viewer();
        let plan = reconcile(&ReconcileInputs {
            viewer: &viewer,
            snapshot: &snapshot,
            bans: self.config.ban_lists(),
            store: &store,
            second_degree: &second_degree,
            today,
            policy: self.config.reconcile_policy(),
        });
        tracing::info!(
            actions = plan.actions.len(),
            reciprocated = plan.reciprocated.len(),
            "reconciliation plan computed"
        );

        let controller = ExecutionController::new(
            self.client.clone(),
            &self.config,
            self.shutdown.clone(),
            self.telemetry.clone(),
        );
        let report = controller.execute(plan, &mut store, today).await;

        self.storage.save(&store).await?;

        let summary = summarize(
            &snapshot,
            &report.outcomes,
            self.promotion_activity(&store, today),
        );

        if let Some(fatal) = report.fatal {
            tracing::error!(error = %fatal, "run aborted; promotion ledger saved");
            return Err(fatal);
        }

        tracing::info!(
            follows = summary.follows_succeeded,
            unfollows = summary.unfollows_succeeded,
            failed = summary.follows_failed + summary.unfollows_failed,
            "reconciliation pass finished"
        );
        Ok(summary)
    }

    /// Read-only mode: fetches the snapshot and computes the summary without
    /// producing or executing any actions.
    pub async fn stats(&self) -> Result<RunSummary> {
        let today = Local::now().date_naive();
        let snapshot = self.fetch_snapshot().await?;
        let store = self.storage.load().await?;
        Ok(summarize(
            &snapshot,
            &[],
            self.promotion_activity(&store, today),
        ))
    }

    /// Runs a pass, cancelling remaining work if Ctrl-C (SIGINT) arrives.
    /// In-flight actions drain and the ledger is saved before returning.
    pub async fn run_until_ctrl_c(&self) -> Result<RunSummary> {
        let run = self.run();
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; cancelling remaining work");
                self.shutdown.cancel();
                run.await
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<GraphSnapshot> {
        let (followers, following) = tokio::try_join!(
            self.client.list_followers(),
            self.client.list_following()
        )?;
        let snapshot = GraphSnapshot::new(followers, following, self.config.ban_lists());
        tracing::info!(
            followers = snapshot.followers().len(),
            following = snapshot.following().len(),
            "fetched graph snapshot"
        );
        Ok(snapshot)
    }

    /// Samples second-degree followers for promotion discovery. Seeds are the
    /// lexicographically first followers so a given graph state always yields
    /// the same candidate pool. Per-seed failures are skipped; only an auth
    /// failure propagates.
    async fn discover_candidates(
        &self,
        snapshot: &GraphSnapshot,
        store: &PromotionStore,
    ) -> Result<Vec<Login>> {
        if !self.config.promotion_enabled() || store.len() >= self.config.count_users() {
            return Ok(Vec::new());
        }

        let mut pool = Vec::new();
        let seeds = snapshot
            .followers()
            .iter()
            .take(self.config.discovery_seeds());

        for seed in seeds {
            if self.shutdown.is_cancelled() {
                break;
            }
            match self
                .client
                .followers_of(seed, self.config.discovery_pages())
                .await
            {
                Ok(found) => pool.extend(found),
                Err(err) => {
                    if FailureKind::classify(&err) == FailureKind::Auth {
                        return Err(err);
                    }
                    tracing::warn!(
                        seed = seed.as_str(),
                        error = %err,
                        "skipping discovery seed"
                    );
                }
            }
        }

        tracing::debug!(candidates = pool.len(), "second-degree discovery finished");
        Ok(pool)
    }

    fn promotion_activity(
        &self,
        store: &PromotionStore,
        today: NaiveDate,
    ) -> Option<PromotionActivity> {
        self.config.promotion_enabled().then(|| {
            PromotionActivity::measure(store, today, self.config.days_period())
        })
    }
}
