//! In-memory stand-in for the remote user-graph API. Keeps real follower and
//! following state so a run's mutations are observable, and supports scripted
//! per-login failures.

use anyhow::Result;
use followsync::{ApiError, Login, UserGraphClient};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Auth,
    RateLimited(Option<Duration>),
    Network,
    NotFound,
}

impl MockFailure {
    fn into_error(self, login: &Login) -> anyhow::Error {
        match self {
            MockFailure::Auth => ApiError::Auth.into(),
            MockFailure::RateLimited(retry_after) => {
                ApiError::RateLimited { retry_after }.into()
            }
            MockFailure::Network => ApiError::Network {
                message: "connection reset".into(),
            }
            .into(),
            MockFailure::NotFound => ApiError::NotFound {
                login: login.to_string(),
            }
            .into(),
        }
    }
}

#[derive(Default)]
pub struct MockGraph {
    followers: Mutex<BTreeSet<Login>>,
    following: Mutex<BTreeSet<Login>>,
    neighbor_followers: Mutex<BTreeMap<Login, Vec<Login>>>,
    failures: Mutex<HashMap<Login, VecDeque<MockFailure>>>,
    mutation_calls: AtomicUsize,
}

impl MockGraph {
    pub fn new(followers: &[&str], following: &[&str]) -> Self {
        let graph = Self::default();
        graph.set_followers(followers);
        graph.set_following(following);
        graph
    }

    pub fn set_followers(&self, logins: &[&str]) {
        *self.followers.lock().unwrap() = logins.iter().map(|login| Login::new(*login)).collect();
    }

    pub fn set_following(&self, logins: &[&str]) {
        *self.following.lock().unwrap() = logins.iter().map(|login| Login::new(*login)).collect();
    }

    pub fn add_follower(&self, login: &str) {
        self.followers.lock().unwrap().insert(Login::new(login));
    }

    pub fn set_neighbor_followers(&self, login: &str, followers: &[&str]) {
        self.neighbor_followers.lock().unwrap().insert(
            Login::new(login),
            followers.iter().map(|login| Login::new(*login)).collect(),
        );
    }

    /// Queues failures for the next follow/unfollow calls targeting `login`.
    pub fn script_failures(&self, login: &str, failures: &[MockFailure]) {
        self.failures
            .lock()
            .unwrap()
            .insert(Login::new(login), failures.iter().copied().collect());
    }

    pub fn is_following(&self, login: &str) -> bool {
        self.following.lock().unwrap().contains(&Login::new(login))
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    fn next_failure(&self, login: &Login) -> Option<MockFailure> {
        self.failures
            .lock()
            .unwrap()
            .get_mut(login)
            .and_then(|queue| queue.pop_front())
    }

    fn mutate(&self, login: &Login, insert: bool) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.next_failure(login) {
            return Err(failure.into_error(login));
        }

        let mut following = self.following.lock().unwrap();
        if insert {
            following.insert(login.clone());
        } else {
            following.remove(login);
        }
        Ok(())
    }
}

impl UserGraphClient for MockGraph {
    fn list_followers(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>> {
        let followers = self.followers.lock().unwrap().clone();
        Box::pin(async move { Ok(followers) })
    }

    fn list_following(&self) -> BoxFuture<'_, Result<BTreeSet<Login>>> {
        let following = self.following.lock().unwrap().clone();
        Box::pin(async move { Ok(following) })
    }

    fn follow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.mutate(login, true) })
    }

    fn unfollow<'a>(&'a self, login: &'a Login) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.mutate(login, false) })
    }

    fn followers_of<'a>(
        &'a self,
        login: &'a Login,
        _max_pages: usize,
    ) -> BoxFuture<'a, Result<Vec<Login>>> {
        let found = self
            .neighbor_followers
            .lock()
            .unwrap()
            .get(login)
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { Ok(found) })
    }
}
