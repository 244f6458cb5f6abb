//! Executes a reconciliation plan against the remote API under batching,
//! bounded concurrency, pacing, and retry policy. The controller is the only
//! writer of the promotion store during a run; mutations are applied as each
//! action's final outcome settles.

use crate::api::client::{ApiError, UserGraphClient};
use crate::engine::action::{Action, ActionKind, ActionReason};
use crate::engine::plan::ReconcilePlan;
use crate::executor::outcome::{ActionOutcome, ExecutionReport, FailureKind};
use crate::executor::retry::{
    next_backoff, sleep_with_cancellation, INITIAL_BACKOFF, MAX_BACKOFF,
};
use crate::promotion::record::PromotedUser;
use crate::promotion::store::PromotionStore;
use crate::runtime::config::RunConfig;
use crate::runtime::telemetry::Telemetry;
use anyhow::anyhow;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct ExecutionController {
    client: Arc<dyn UserGraphClient>,
    batch_size: usize,
    max_concurrent: usize,
    request_delay: Duration,
    retry_on_error: bool,
    max_attempts: usize,
    shutdown: CancellationToken,
    telemetry: Arc<Telemetry>,
}

impl ExecutionController {
    pub fn new(
        client: Arc<dyn UserGraphClient>,
        config: &RunConfig,
        shutdown: CancellationToken,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            client,
            batch_size: config.batch_size(),
            max_concurrent: config.max_concurrent_requests(),
            request_delay: config.request_delay(),
            retry_on_error: config.retry_on_error(),
            max_attempts: config.max_attempts(),
            shutdown,
            telemetry,
        }
    }

    /// Runs the plan to completion or fatal abort.
    ///
    /// Batches execute strictly sequentially with a pacing delay between
    /// them; within a batch at most `max_concurrent_requests` actions are in
    /// flight. A fatal auth failure cancels not-yet-started actions, lets
    /// in-flight ones drain, and is surfaced in the report after the store
    /// mutations of settled actions have been applied.
    pub async fn execute(
        &self,
        plan: ReconcilePlan,
        store: &mut PromotionStore,
        today: NaiveDate,
    ) -> ExecutionReport {
        let ReconcilePlan {
            actions,
            reciprocated,
        } = plan;

        for login in reciprocated {
            if store.remove(&login).is_some() {
                tracing::debug!(
                    login = login.as_str(),
                    "promotion reciprocated; dropped from ledger"
                );
            }
        }

        let mut report = ExecutionReport::new();
        if actions.is_empty() {
            return report;
        }

        let total_batches = actions.len().div_ceil(self.batch_size);
        for (index, batch) in actions.chunks(self.batch_size).enumerate() {
            if self.shutdown.is_cancelled() {
                tracing::warn!(
                    skipped = actions.len() - index * self.batch_size,
                    "execution cancelled; abandoning remaining actions"
                );
                break;
            }

            tracing::info!(
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "executing action batch"
            );

            let mut completions = stream::iter(
                batch
                    .iter()
                    .cloned()
                    .map(|action| self.run_action(action)),
            )
            .buffer_unordered(self.max_concurrent);

            while let Some(settled) = completions.next().await {
                let Some(outcome) = settled else {
                    continue;
                };
                self.apply_store_mutation(store, &outcome, today);
                if outcome.failure == Some(FailureKind::Auth) && report.fatal.is_none() {
                    report.fatal = Some(
                        anyhow!(ApiError::Auth)
                            .context(format!("fatal failure executing {}", outcome.action)),
                    );
                    self.shutdown.cancel();
                }
                self.telemetry.record_outcome(&outcome);
                report.outcomes.push(outcome);
            }
            drop(completions);

            let last_batch = index + 1 == total_batches;
            if !last_batch
                && !self.shutdown.is_cancelled()
                && !sleep_with_cancellation(self.request_delay, &self.shutdown).await
            {
                break;
            }
        }

        report
    }

    /// Attempts one action, retrying retryable failures per policy. Returns
    /// `None` when cancellation hit before the first attempt.
    async fn run_action(&self, action: Action) -> Option<ActionOutcome> {
        if self.shutdown.is_cancelled() {
            tracing::debug!(
                login = action.target.as_str(),
                "skipping action after cancellation"
            );
            return None;
        }

        let mut attempt = 0usize;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            attempt += 1;
            let result = match action.kind {
                ActionKind::Follow => self.client.follow(&action.target).await,
                ActionKind::Unfollow => self.client.unfollow(&action.target).await,
            };

            let err = match result {
                Ok(()) => {
                    tracing::debug!(
                        login = action.target.as_str(),
                        kind = %action.kind,
                        reason = action.reason.as_str(),
                        attempt,
                        "action succeeded"
                    );
                    return Some(ActionOutcome::succeeded(action, attempt));
                }
                Err(err) => err,
            };

            let failure = FailureKind::classify(&err);
            let will_retry = failure.is_retryable()
                && self.retry_on_error
                && attempt < self.max_attempts
                && !self.shutdown.is_cancelled();

            if !will_retry {
                match failure {
                    FailureKind::NotFound => tracing::info!(
                        login = action.target.as_str(),
                        "target no longer exists; skipping"
                    ),
                    FailureKind::Auth => tracing::error!(
                        login = action.target.as_str(),
                        error = %err,
                        "credential rejected"
                    ),
                    _ => tracing::warn!(
                        login = action.target.as_str(),
                        attempt,
                        error = %err,
                        "action failed"
                    ),
                }
                return Some(ActionOutcome::failed(action, failure, attempt));
            }

            let delay = err
                .downcast_ref::<ApiError>()
                .and_then(ApiError::retry_after)
                .unwrap_or(backoff);
            tracing::warn!(
                login = action.target.as_str(),
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "retryable failure; backing off"
            );
            self.telemetry.record_retry();

            if !sleep_with_cancellation(delay, &self.shutdown).await {
                return Some(ActionOutcome::failed(action, failure, attempt));
            }
            backoff = next_backoff(backoff, MAX_BACKOFF);
        }
    }

    fn apply_store_mutation(
        &self,
        store: &mut PromotionStore,
        outcome: &ActionOutcome,
        today: NaiveDate,
    ) {
        if !outcome.success {
            return;
        }

        match (outcome.action.kind, outcome.action.reason) {
            (ActionKind::Follow, ActionReason::PromotionNew) => {
                store.insert(PromotedUser::new(outcome.action.target.clone(), today));
            }
            (ActionKind::Unfollow, _) => {
                store.remove(&outcome.action.target);
            }
            _ => {}
        }
    }
}
