//! Account identities and the freshly fetched graph snapshot the planner
//! reconciles against.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Account identity on the remote platform.
///
/// The platform treats logins case-insensitively, so equality, ordering, and
/// hashing all compare the folded form. The original spelling is preserved for
/// display and request paths.
#[derive(Debug, Clone)]
pub struct Login {
    raw: String,
    folded: String,
}

impl Login {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = raw.to_ascii_lowercase();
        Self { raw, folded }
    }

    /// The login as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for Login {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Login {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Login {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for Login {}

impl PartialOrd for Login {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Login {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl Hash for Login {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

/// The three read-only exclusion lists consulted during a run.
#[derive(Debug, Clone, Default)]
pub struct BanLists {
    /// Never targeted by a follow action.
    pub never_follow: BTreeSet<Login>,
    /// Never targeted by an unfollow action.
    pub never_unfollow: BTreeSet<Login>,
    /// Excluded from both snapshot sides before any decision is made.
    pub ignore_completely: BTreeSet<Login>,
}

impl BanLists {
    pub fn new(
        never_follow: impl IntoIterator<Item = Login>,
        never_unfollow: impl IntoIterator<Item = Login>,
        ignore_completely: impl IntoIterator<Item = Login>,
    ) -> Self {
        Self {
            never_follow: never_follow.into_iter().collect(),
            never_unfollow: never_unfollow.into_iter().collect(),
            ignore_completely: ignore_completely.into_iter().collect(),
        }
    }
}

/// Follower and following sets fetched fresh at the start of a run, with
/// `ignore_completely` members already filtered out of both sides.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    followers: BTreeSet<Login>,
    following: BTreeSet<Login>,
}

impl GraphSnapshot {
    pub fn new(
        followers: BTreeSet<Login>,
        following: BTreeSet<Login>,
        bans: &BanLists,
    ) -> Self {
        let ignored = &bans.ignore_completely;
        Self {
            followers: followers
                .into_iter()
                .filter(|login| !ignored.contains(login))
                .collect(),
            following: following
                .into_iter()
                .filter(|login| !ignored.contains(login))
                .collect(),
        }
    }

    pub fn followers(&self) -> &BTreeSet<Login> {
        &self.followers
    }

    pub fn following(&self) -> &BTreeSet<Login> {
        &self.following
    }

    /// Accounts present on both sides of the snapshot.
    pub fn mutual(&self) -> BTreeSet<Login> {
        self.followers
            .intersection(&self.following)
            .cloned()
            .collect()
    }

    pub fn is_follower(&self, login: &Login) -> bool {
        self.followers.contains(login)
    }

    pub fn is_following(&self, login: &Login) -> bool {
        self.following.contains(login)
    }
}
