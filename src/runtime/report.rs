//! Aggregates the pre-reconciliation snapshot and per-action outcomes into
//! the summary structure consumed by external reporting. No side effects.

use crate::engine::action::ActionKind;
use crate::engine::snapshot::GraphSnapshot;
use crate::executor::outcome::ActionOutcome;
use crate::promotion::store::PromotionStore;
use chrono::NaiveDate;
use serde::Serialize;

/// The sole externally visible result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub followers: usize,
    pub following: usize,
    pub mutual: usize,
    pub not_following_back: usize,
    pub not_followed_back: usize,
    pub follows_attempted: usize,
    pub follows_succeeded: usize,
    pub follows_failed: usize,
    pub unfollows_attempted: usize,
    pub unfollows_succeeded: usize,
    pub unfollows_failed: usize,
    pub promoted_active: usize,
    pub promoted_expired: usize,
}

/// Promotion ledger counts at reporting time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromotionActivity {
    pub active: usize,
    pub expired: usize,
}

impl PromotionActivity {
    pub fn measure(store: &PromotionStore, today: NaiveDate, days_period: u32) -> Self {
        let expired = store.eligible(today, days_period).len();
        Self {
            active: store.len() - expired,
            expired,
        }
    }
}

/// Builds the run summary from the pre-reconciliation snapshot (counts are
/// not re-fetched) and the outcomes the executor produced.
pub fn summarize(
    snapshot: &GraphSnapshot,
    outcomes: &[ActionOutcome],
    promotion: Option<PromotionActivity>,
) -> RunSummary {
    let followers = snapshot.followers();
    let following = snapshot.following();

    let count = |kind: ActionKind, success: Option<bool>| {
        outcomes
            .iter()
            .filter(|outcome| {
                outcome.action.kind == kind
                    && success.map_or(true, |wanted| outcome.success == wanted)
            })
            .count()
    };

    let promotion = promotion.unwrap_or_default();

    RunSummary {
        followers: followers.len(),
        following: following.len(),
        mutual: snapshot.mutual().len(),
        not_following_back: following.difference(followers).count(),
        not_followed_back: followers.difference(following).count(),
        follows_attempted: count(ActionKind::Follow, None),
        follows_succeeded: count(ActionKind::Follow, Some(true)),
        follows_failed: count(ActionKind::Follow, Some(false)),
        unfollows_attempted: count(ActionKind::Unfollow, None),
        unfollows_succeeded: count(ActionKind::Unfollow, Some(true)),
        unfollows_failed: count(ActionKind::Unfollow, Some(false)),
        promoted_active: promotion.active,
        promoted_expired: promotion.expired,
    }
}
