use crate::engine::snapshot::Login;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Follow,
    Unfollow,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Follow => f.write_str("follow"),
            ActionKind::Unfollow => f.write_str("unfollow"),
        }
    }
}

/// Why the planner decided an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionReason {
    /// Follow back an account that follows us.
    Reciprocate,
    /// Unfollow a promotion that ran out its grace period unreciprocated.
    PromotionExpired,
    /// Proactive follow of a second-degree candidate.
    PromotionNew,
    /// Unfollow a non-promoted account that does not follow back.
    NonReciprocating,
}

impl ActionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionReason::Reciprocate => "reciprocate",
            ActionReason::PromotionExpired => "promotion-expired",
            ActionReason::PromotionNew => "promotion-new",
            ActionReason::NonReciprocating => "non-reciprocating",
        }
    }
}

impl fmt::Display for ActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decided mutation, immutable once planned and consumed exactly
/// once by the execution controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub target: Login,
    pub reason: ActionReason,
}

impl Action {
    pub fn new(kind: ActionKind, target: impl Into<Login>, reason: ActionReason) -> Self {
        Self {
            kind,
            target: target.into(),
            reason,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.target, self.reason)
    }
}
