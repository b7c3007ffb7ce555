#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use github_star_network::error::{Result, StarNetworkError};
use github_star_network::github::StarSource;
use github_star_network::models::{Resource, StarRecord, UserIdentity};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn repo(full_name: &str, stars: u32) -> Resource {
    Resource {
        full_name: full_name.to_string(),
        html_url: format!("https://github.com/{}", full_name),
        stargazers_count: stars,
        created_at: Some(fixed_now() - Duration::days(1)),
    }
}

pub fn user(login: &str) -> UserIdentity {
    UserIdentity::from_login(login)
}

/// Star record aged `days_ago` relative to [`fixed_now`].
pub fn star(login: &str, resource: &Resource, days_ago: i64) -> StarRecord {
    StarRecord {
        user: user(login),
        resource: resource.clone(),
        starred_at: Some(fixed_now() - Duration::days(days_ago)),
    }
}

pub fn undated_star(login: &str, resource: &Resource) -> StarRecord {
    StarRecord {
        user: user(login),
        resource: resource.clone(),
        starred_at: None,
    }
}

/// In-memory stand-in for the GitHub API
#[derive(Default)]
pub struct FakeSource {
    pub starred: HashMap<String, Vec<StarRecord>>,
    pub stargazers: HashMap<String, Vec<UserIdentity>>,
    pub failing: HashSet<String>,
    pub listing_cap: Option<usize>,
    pub starred_calls: AtomicUsize,
    pub stargazer_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `login` as starring each repo, recent stars.
    pub fn stars(mut self, login: &str, repos: &[&Resource]) -> Self {
        for resource in repos {
            self.starred
                .entry(login.to_string())
                .or_default()
                .push(star(login, resource, 1));
            self.stargazers
                .entry(resource.full_name.clone())
                .or_default()
                .push(user(login));
        }
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Pretend listings are paginated and stop at `cap` entries.
    pub fn capped(mut self, cap: usize) -> Self {
        self.listing_cap = Some(cap);
        self
    }

    pub fn starred_calls(&self) -> usize {
        self.starred_calls.load(Ordering::SeqCst)
    }

    pub fn stargazer_calls(&self) -> usize {
        self.stargazer_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StarSource for FakeSource {
    async fn fetch_user_starred(&self, login: &str) -> Result<Vec<StarRecord>> {
        self.starred_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(login) {
            return Err(StarNetworkError::ApiError(format!(
                "starred list for {} unavailable",
                login
            )));
        }
        Ok(self.starred.get(login).cloned().unwrap_or_default())
    }

    async fn fetch_stargazers(&self, resource: &Resource) -> Result<Vec<UserIdentity>> {
        self.stargazer_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&resource.full_name) {
            return Err(StarNetworkError::ApiError(format!(
                "stargazers of {} unavailable",
                resource.full_name
            )));
        }
        Ok(self.stargazers.get(&resource.full_name).cloned().unwrap_or_default())
    }

    fn listing_cap(&self) -> Option<usize> {
        self.listing_cap
    }
}

/// Fetch function for calls that must be answered from the cache.
pub async fn must_not_fetch(login: String) -> Result<Vec<StarRecord>> {
    panic!("unexpected fetch for {}", login)
}
