//! End-to-end runs of the full pipeline (snapshot, plan, execute, persist)
//! over an in-memory graph and a temporary ledger file.

mod support;

use anyhow::Result;
use followsync::{init_tracing, BanLists, FilePromotionStore, Login, RunConfig, Runner};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::mock_api::{MockFailure, MockGraph};
use tempfile::TempDir;

fn base_config(store_path: &Path) -> followsync::RunConfigBuilder {
    RunConfig::builder()
        .username("viewer")
        .token("token")
        .promotion_enabled(false)
        .request_delay(Duration::from_millis(1))
        .store_path(store_path)
}

fn runner(config: RunConfig, graph: Arc<MockGraph>) -> Runner {
    let storage = Arc::new(FilePromotionStore::new(config.store_path()));
    Runner::with_components(config, graph, storage)
}

#[tokio::test]
async fn full_run_reconciles_the_graph() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["a", "b", "c"], &["b", "d"]));
    let config = base_config(&store_path).build()?;

    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.followers, 3);
    assert_eq!(summary.following, 2);
    assert_eq!(summary.mutual, 1);
    assert_eq!(summary.follows_attempted, 2);
    assert_eq!(summary.follows_succeeded, 2);
    assert_eq!(summary.unfollows_attempted, 1);
    assert_eq!(summary.unfollows_succeeded, 1);

    assert!(graph.is_following("a"));
    assert!(graph.is_following("b"));
    assert!(graph.is_following("c"));
    assert!(!graph.is_following("d"));
    Ok(())
}

#[tokio::test]
async fn ban_lists_suppress_disallowed_actions() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["a", "b", "c"], &["b", "d"]));
    let config = base_config(&store_path)
        .ban_lists(BanLists::new(
            [Login::new("a")],
            [Login::new("d")],
            [],
        ))
        .build()?;

    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.follows_attempted, 1);
    assert_eq!(summary.unfollows_attempted, 0);
    assert!(!graph.is_following("a"), "never_follow must hold");
    assert!(graph.is_following("d"), "never_unfollow must hold");
    assert!(graph.is_following("c"));
    Ok(())
}

#[tokio::test]
async fn second_run_with_settled_graph_is_a_no_op() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["a", "b", "c"], &["b", "d"]));
    let config = base_config(&store_path).build()?;

    let first = runner(config.clone(), graph.clone()).run().await?;
    assert_eq!(first.follows_attempted + first.unfollows_attempted, 3);

    let second = runner(config, graph.clone()).run().await?;
    assert_eq!(second.follows_attempted, 0);
    assert_eq!(second.unfollows_attempted, 0);
    Ok(())
}

#[tokio::test]
async fn promotion_follows_candidates_and_tracks_them() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");

    // seed is mutual so reciprocation and stale logic stay quiet.
    let graph = Arc::new(MockGraph::new(&["seed"], &["seed"]));
    graph.set_neighbor_followers("seed", &["xavier", "yann", "xavier"]);

    let config = base_config(&store_path)
        .promotion_enabled(true)
        .count_users(2)
        .build()?;

    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.follows_succeeded, 2);
    assert_eq!(summary.promoted_active, 2);
    assert!(graph.is_following("xavier"));
    assert!(graph.is_following("yann"));

    let ledger = std::fs::read_to_string(&store_path)?;
    assert!(ledger.contains("xavier"));
    assert!(ledger.contains("yann"));
    Ok(())
}

#[tokio::test]
async fn expired_promotions_are_unfollowed_and_reciprocated_ones_released() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    std::fs::write(&store_path, "xavier 2020-01-01\nyann 2020-01-01\n")?;

    // xavier reciprocated since the promotion; yann never did.
    let graph = Arc::new(MockGraph::new(&["seed", "xavier"], &["seed", "xavier", "yann"]));

    let config = base_config(&store_path)
        .promotion_enabled(true)
        .count_users(2)
        .days_period(3)
        .build()?;

    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.unfollows_succeeded, 1);
    assert!(graph.is_following("xavier"), "reciprocated promotion stays");
    assert!(!graph.is_following("yann"), "expired promotion is dropped");

    let ledger = std::fs::read_to_string(&store_path)?;
    assert!(!ledger.contains("xavier"));
    assert!(!ledger.contains("yann"));
    Ok(())
}

#[tokio::test]
async fn auth_failure_aborts_the_run_but_persists_the_ledger() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    std::fs::write(&store_path, "mutualpromo 2026-01-01\n")?;

    let graph = Arc::new(MockGraph::new(
        &["mutualpromo"],
        &["mutualpromo", "stale"],
    ));
    graph.script_failures("stale", &[MockFailure::Auth]);

    let config = base_config(&store_path)
        .promotion_enabled(true)
        .retry_on_error(false)
        .build()?;

    let err = runner(config, graph.clone())
        .run()
        .await
        .expect_err("auth failure must surface as a run-level failure");
    assert!(format!("{err:#}").contains("credential"));

    // The reciprocation removal settled before the abort and must survive.
    let ledger = std::fs::read_to_string(&store_path)?;
    assert!(!ledger.contains("mutualpromo"));
    Ok(())
}

#[tokio::test]
async fn transient_failures_retry_and_the_run_finishes() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["a"], &[]));
    graph.script_failures(
        "a",
        &[
            MockFailure::RateLimited(Some(Duration::from_millis(1))),
            MockFailure::Network,
        ],
    );

    let config = base_config(&store_path).build()?;
    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.follows_succeeded, 1);
    assert!(graph.is_following("a"));
    Ok(())
}

#[tokio::test]
async fn vanished_target_is_reported_but_does_not_abort() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["ghost", "a"], &[]));
    graph.script_failures("ghost", &[MockFailure::NotFound]);

    let config = base_config(&store_path).build()?;
    let summary = runner(config, graph.clone()).run().await?;

    assert_eq!(summary.follows_attempted, 2);
    assert_eq!(summary.follows_succeeded, 1);
    assert_eq!(summary.follows_failed, 1);
    assert!(graph.is_following("a"));
    assert!(!graph.is_following("ghost"));
    Ok(())
}

#[tokio::test]
async fn stats_mode_never_mutates() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store_path = dir.path().join("promoted_users.txt");
    let graph = Arc::new(MockGraph::new(&["a", "b"], &["b", "d"]));
    let config = base_config(&store_path).build()?;

    let summary = runner(config, graph.clone()).stats().await?;

    assert_eq!(summary.followers, 2);
    assert_eq!(summary.following, 2);
    assert_eq!(summary.mutual, 1);
    assert_eq!(summary.not_following_back, 1);
    assert_eq!(summary.not_followed_back, 1);
    assert_eq!(summary.follows_attempted, 0);
    assert_eq!(summary.unfollows_attempted, 0);
    assert_eq!(graph.mutation_calls(), 0);
    assert!(graph.is_following("d"));
    Ok(())
}
