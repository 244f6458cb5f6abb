use crate::api::client::ApiError;
use crate::engine::action::{Action, ActionKind};

/// Classification of a failed action, derived from [`ApiError`] at the
/// executor boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    RateLimited,
    Network,
    NotFound,
    Other,
}

impl FailureKind {
    pub(crate) fn classify(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Auth) => FailureKind::Auth,
            Some(ApiError::RateLimited { .. }) => FailureKind::RateLimited,
            Some(ApiError::Network { .. }) => FailureKind::Network,
            Some(ApiError::NotFound { .. }) => FailureKind::NotFound,
            None => FailureKind::Other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Network)
    }
}

/// Final result of one action, including how many attempts it took.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: Action,
    pub success: bool,
    pub failure: Option<FailureKind>,
    pub attempts: usize,
}

impl ActionOutcome {
    pub(crate) fn succeeded(action: Action, attempts: usize) -> Self {
        Self {
            action,
            success: true,
            failure: None,
            attempts,
        }
    }

    pub(crate) fn failed(action: Action, failure: FailureKind, attempts: usize) -> Self {
        Self {
            action,
            success: false,
            failure: Some(failure),
            attempts,
        }
    }
}

/// Everything the executor produced for one run. A populated `fatal` means
/// remaining batches were abandoned after the recorded outcomes settled.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<ActionOutcome>,
    pub fatal: Option<anyhow::Error>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempted(&self, kind: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.action.kind == kind)
            .count()
    }

    pub fn succeeded(&self, kind: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.action.kind == kind && outcome.success)
            .count()
    }

    pub fn failed(&self, kind: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.action.kind == kind && !outcome.success)
            .count()
    }
}
