//! The reconciliation algorithm: a pure, deterministic function from current
//! graph state, ban lists, and the promotion ledger to an ordered action list.
//! No I/O happens here; candidate discovery is an input.

use crate::engine::action::{Action, ActionKind, ActionReason};
use crate::engine::snapshot::{BanLists, GraphSnapshot, Login};
use crate::promotion::store::PromotionStore;
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Policy knobs consulted during planning, derived from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilePolicy {
    pub promotion_enabled: bool,
    pub days_period: u32,
    pub count_users: usize,
    /// Whether non-promoted accounts that do not follow back are unfollow
    /// candidates.
    pub unfollow_non_reciprocating: bool,
}

pub struct ReconcileInputs<'a> {
    /// The account being reconciled; never a promotion candidate.
    pub viewer: &'a Login,
    pub snapshot: &'a GraphSnapshot,
    pub bans: &'a BanLists,
    pub store: &'a PromotionStore,
    /// Second-degree logins in discovery order. Duplicates are meaningful:
    /// occurrence frequency ranks promotion candidates.
    pub second_degree: &'a [Login],
    pub today: NaiveDate,
    pub policy: ReconcilePolicy,
}

/// Planner output, consumed exactly once by the execution controller.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    /// Unfollows first, then follows; deterministic order within each kind.
    pub actions: Vec<Action>,
    /// Promoted logins that reciprocated; dropped from the ledger without an
    /// API action.
    pub reciprocated: Vec<Login>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.reciprocated.is_empty()
    }
}

/// Computes the ordered action list for one reconciliation pass.
///
/// Unfollow actions are emitted before follow actions so any rate-sensitive
/// quota is freed first. Within each kind the order is: expired promotions,
/// then non-reciprocating accounts (both lexicographic); follow-backs
/// (lexicographic), then promotion candidates (frequency-ranked).
pub fn reconcile(inputs: &ReconcileInputs<'_>) -> ReconcilePlan {
    let snapshot = inputs.snapshot;
    let bans = inputs.bans;
    let store = inputs.store;
    let policy = inputs.policy;

    let followers = snapshot.followers();
    let following = snapshot.following();
    let mutual = snapshot.mutual();

    let reciprocated: Vec<Login> = store
        .iter()
        .map(|user| user.login())
        .filter(|login| mutual.contains(*login))
        .cloned()
        .collect();
    let reciprocated_set: BTreeSet<&Login> = reciprocated.iter().collect();

    let remaining: Vec<_> = store
        .iter()
        .filter(|user| !reciprocated_set.contains(user.login()))
        .collect();

    let mut actions = Vec::new();

    for user in &remaining {
        if user.is_eligible(inputs.today, policy.days_period)
            && !bans.never_unfollow.contains(user.login())
        {
            actions.push(Action::new(
                ActionKind::Unfollow,
                user.login().clone(),
                ActionReason::PromotionExpired,
            ));
        }
    }

    if policy.unfollow_non_reciprocating {
        for login in following.difference(followers) {
            if bans.never_unfollow.contains(login) || store.contains(login) {
                continue;
            }
            actions.push(Action::new(
                ActionKind::Unfollow,
                login.clone(),
                ActionReason::NonReciprocating,
            ));
        }
    }

    for login in followers.difference(following) {
        if bans.never_follow.contains(login) {
            continue;
        }
        actions.push(Action::new(
            ActionKind::Follow,
            login.clone(),
            ActionReason::Reciprocate,
        ));
    }

    if policy.promotion_enabled {
        let capacity = policy.count_users.saturating_sub(remaining.len());
        for login in rank_candidates(inputs, capacity) {
            actions.push(Action::new(
                ActionKind::Follow,
                login,
                ActionReason::PromotionNew,
            ));
        }
    }

    ReconcilePlan {
        actions,
        reciprocated,
    }
}

/// Ranks second-degree candidates by occurrence frequency (descending), then
/// lexicographic login order, and takes at most `capacity` of them.
fn rank_candidates(inputs: &ReconcileInputs<'_>, capacity: usize) -> Vec<Login> {
    if capacity == 0 || inputs.second_degree.is_empty() {
        return Vec::new();
    }

    let snapshot = inputs.snapshot;
    let bans = inputs.bans;

    let mut frequency: BTreeMap<&Login, usize> = BTreeMap::new();
    for login in inputs.second_degree {
        if login == inputs.viewer
            || snapshot.is_following(login)
            || snapshot.is_follower(login)
            || bans.never_follow.contains(login)
            || bans.ignore_completely.contains(login)
            || inputs.store.contains(login)
        {
            continue;
        }
        *frequency.entry(login).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&Login, usize)> = frequency.into_iter().collect();
    ranked.sort_by_key(|(login, count)| (Reverse(*count), (*login).clone()));
    ranked
        .into_iter()
        .take(capacity)
        .map(|(login, _)| login.clone())
        .collect()
}
