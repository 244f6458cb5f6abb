use crate::engine::action::ActionKind;
use crate::executor::outcome::ActionOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters accumulated over a run.
#[derive(Default, Debug)]
pub struct Telemetry {
    follows_succeeded: AtomicU64,
    follows_failed: AtomicU64,
    unfollows_succeeded: AtomicU64,
    unfollows_failed: AtomicU64,
    retries: AtomicU64,
}

impl Telemetry {
    pub(crate) fn record_outcome(&self, outcome: &ActionOutcome) {
        let counter = match (outcome.action.kind, outcome.success) {
            (ActionKind::Follow, true) => &self.follows_succeeded,
            (ActionKind::Follow, false) => &self.follows_failed,
            (ActionKind::Unfollow, true) => &self.unfollows_succeeded,
            (ActionKind::Unfollow, false) => &self.unfollows_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            follows_succeeded: self.follows_succeeded.load(Ordering::Relaxed),
            follows_failed: self.follows_failed.load(Ordering::Relaxed),
            unfollows_succeeded: self.unfollows_succeeded.load(Ordering::Relaxed),
            unfollows_failed: self.unfollows_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub follows_succeeded: u64,
    pub follows_failed: u64,
    pub unfollows_succeeded: u64,
    pub unfollows_failed: u64,
    pub retries: u64,
}
