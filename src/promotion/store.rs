//! Persisted ledger of promotion follows. The file format is one
//! `login YYYY-MM-DD` record per line; malformed lines are skipped with a
//! warning so a damaged ledger never aborts a run.

use crate::engine::snapshot::Login;
use crate::promotion::record::PromotedUser;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// In-memory promotion ledger, keyed case-insensitively by login.
#[derive(Debug, Clone, Default)]
pub struct PromotionStore {
    entries: BTreeMap<Login, PromotedUser>,
}

impl PromotionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for the user's login.
    pub fn insert(&mut self, user: PromotedUser) {
        self.entries.insert(user.login().clone(), user);
    }

    pub fn remove(&mut self, login: &Login) -> Option<PromotedUser> {
        self.entries.remove(login)
    }

    pub fn contains(&self, login: &Login) -> bool {
        self.entries.contains_key(login)
    }

    pub fn get(&self, login: &Login) -> Option<&PromotedUser> {
        self.entries.get(login)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in lexicographic login order.
    pub fn iter(&self) -> impl Iterator<Item = &PromotedUser> {
        self.entries.values()
    }

    /// Entries whose grace period has elapsed as of `today`.
    pub fn eligible(&self, today: NaiveDate, days_period: u32) -> Vec<&PromotedUser> {
        self.entries
            .values()
            .filter(|user| user.is_eligible(today, days_period))
            .collect()
    }
}

/// Storage seam for the promotion ledger. Load happens once before
/// reconciliation, save once after execution; both must be idempotent so the
/// ledger survives process restarts.
pub trait PromotionStorage: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<PromotionStore>>;
    fn save<'a>(&'a self, store: &'a PromotionStore) -> BoxFuture<'a, Result<()>>;
}

/// Flat-file implementation of [`PromotionStorage`].
#[derive(Debug, Clone)]
pub struct FilePromotionStore {
    path: PathBuf,
}

impl FilePromotionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_inner(&self) -> Result<PromotionStore> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "promotion ledger not found; starting empty");
                return Ok(PromotionStore::new());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read promotion ledger {}", self.path.display())
                });
            }
        };

        let mut store = PromotionStore::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(line) {
                Some(user) => store.insert(user),
                None => {
                    tracing::warn!(line, "skipping malformed promotion record");
                }
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = store.len(),
            "loaded promotion ledger"
        );
        Ok(store)
    }

    async fn save_inner(&self, store: &PromotionStore) -> Result<()> {
        let mut content = store
            .iter()
            .map(render_record)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        tokio::fs::write(&self.path, content).await.with_context(|| {
            format!("failed to write promotion ledger {}", self.path.display())
        })?;

        tracing::debug!(
            path = %self.path.display(),
            entries = store.len(),
            "saved promotion ledger"
        );
        Ok(())
    }
}

impl PromotionStorage for FilePromotionStore {
    fn load(&self) -> BoxFuture<'_, Result<PromotionStore>> {
        Box::pin(self.load_inner())
    }

    fn save<'a>(&'a self, store: &'a PromotionStore) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.save_inner(store))
    }
}

fn parse_record(line: &str) -> Option<PromotedUser> {
    let (login, date) = line.trim().rsplit_once(' ')?;
    let login = login.trim();
    if login.is_empty() {
        return None;
    }
    let followed_at = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    Some(PromotedUser::new(login, followed_at))
}

fn render_record(user: &PromotedUser) -> String {
    format!(
        "{} {}",
        user.login().as_str(),
        user.followed_at().format(DATE_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn store_keys_are_case_insensitive() {
        let mut store = PromotionStore::new();
        store.insert(PromotedUser::new("Alice", date(2026, 1, 1)));
        store.insert(PromotedUser::new("alice", date(2026, 2, 2)));

        assert_eq!(store.len(), 1);
        assert!(store.contains(&Login::new("ALICE")));
        assert_eq!(
            store.get(&Login::new("alice")).map(PromotedUser::followed_at),
            Some(date(2026, 2, 2))
        );
    }

    #[test]
    fn eligible_filters_by_grace_period() {
        let mut store = PromotionStore::new();
        store.insert(PromotedUser::new("old", date(2026, 1, 1)));
        store.insert(PromotedUser::new("recent", date(2026, 1, 9)));

        let eligible = store.eligible(date(2026, 1, 10), 3);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].login().as_str(), "old");
    }

    #[test]
    fn parse_rejects_malformed_records() {
        assert!(parse_record("alice 2026-01-01").is_some());
        assert!(parse_record("   alice 2026-01-01  ").is_some());
        assert!(parse_record("no-date-here").is_none());
        assert!(parse_record("alice not-a-date").is_none());
        assert!(parse_record(" 2026-01-01").is_none());
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FilePromotionStore::new(dir.path().join("promoted_users.txt"));

        let store = storage.load().await.expect("load should succeed");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn ledger_round_trips_and_skips_bad_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("promoted_users.txt");
        let storage = FilePromotionStore::new(&path);

        let mut store = PromotionStore::new();
        store.insert(PromotedUser::new("alice", date(2026, 3, 1)));
        store.insert(PromotedUser::new("bob", date(2026, 3, 2)));
        storage.save(&store).await.expect("save should succeed");

        // Corrupt one line in place; the loader must keep the rest.
        let mut content = std::fs::read_to_string(&path).expect("read ledger");
        content.push_str("garbage-without-a-date\n");
        std::fs::write(&path, content).expect("write ledger");

        let reloaded = storage.load().await.expect("reload should succeed");
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&Login::new("alice")));
        assert!(reloaded.contains(&Login::new("bob")));
        assert_eq!(
            reloaded
                .get(&Login::new("alice"))
                .map(PromotedUser::followed_at),
            Some(date(2026, 3, 1))
        );
    }
}
