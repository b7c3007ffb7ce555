//! Daily snapshots of each user's starred repositories.
//!
//! An entry is keyed by login and UTC calendar date. The first request of a
//! day fetches and stores the listing; later requests that day read it back
//! unchanged. Nothing serializes concurrent misses: two requests racing on an
//! absent key both fetch and the last write wins.

pub mod file;
pub mod memory;
pub mod surreal;

use crate::error::{Result, StarNetworkError};
use crate::models::StarRecord;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use file::FileCacheBackend;
pub use memory::MemoryCacheBackend;
pub use surreal::SurrealCacheBackend;

/// Storage key of a cache entry. Logins are stored lowercased since GitHub
/// treats them case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub login: String,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(login: &str, date: NaiveDate) -> Result<Self> {
        validate_login(login)?;
        Ok(Self {
            login: login.to_ascii_lowercase(),
            date,
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.login, self.date.format("%Y-%m-%d"))
    }
}

/// Logins end up in file names and record ids, so only GitHub's own
/// character set is accepted (brackets cover `name[bot]` accounts).
pub fn validate_login(login: &str) -> Result<()> {
    let valid = !login.is_empty()
        && login.len() <= 64
        && login
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '[' | ']'));
    if valid {
        Ok(())
    } else {
        Err(StarNetworkError::InvalidLogin(login.to_string()))
    }
}

pub fn encode_entry(records: &[StarRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

pub fn decode_entry(bytes: &[u8]) -> Result<Vec<StarRecord>> {
    serde_json::from_slice(bytes).map_err(|e| StarNetworkError::CorruptEntry(e.to_string()))
}

/// Durable storage for cache entries
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<StarRecord>>>;

    /// Write an entry, replacing any existing one for the key.
    async fn store(&self, key: &CacheKey, records: &[StarRecord]) -> Result<()>;

    async fn keys(&self) -> Result<Vec<CacheKey>>;

    async fn remove(&self, key: &CacheKey) -> Result<()>;
}

/// Which entries survive a purge. `None` fields keep everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_days: Option<u32>,
    pub max_entries_per_user: Option<usize>,
}

impl RetentionPolicy {
    pub fn keep_all() -> Self {
        Self::default()
    }

    /// Keys to drop, given every stored key.
    pub fn expired(&self, mut keys: Vec<CacheKey>, today: NaiveDate) -> Vec<CacheKey> {
        // Newest first within each login
        keys.sort_by(|a, b| a.login.cmp(&b.login).then_with(|| b.date.cmp(&a.date)));

        let mut expired = Vec::new();
        let mut seen_for_login = 0usize;
        let mut current_login: Option<String> = None;

        for key in keys {
            if current_login.as_deref() != Some(key.login.as_str()) {
                current_login = Some(key.login.clone());
                seen_for_login = 0;
            }
            seen_for_login += 1;

            let too_old = self
                .max_age_days
                .is_some_and(|days| (today - key.date).num_days() > i64::from(days));
            let over_count = self
                .max_entries_per_user
                .is_some_and(|max| seen_for_login > max);

            if too_old || over_count {
                expired.push(key);
            }
        }

        expired
    }
}

/// Per-user, per-day cache of starred listings
#[derive(Clone)]
pub struct ResourceCache {
    backend: Arc<dyn CacheBackend>,
    retention: RetentionPolicy,
}

impl ResourceCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            retention: RetentionPolicy::keep_all(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()))
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Today's entry for `login`, fetching and storing it on a miss.
    pub async fn get_or_fetch<F, Fut>(&self, login: &str, fetch: F) -> Result<Vec<StarRecord>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<StarRecord>>>,
    {
        self.get_or_fetch_on(login, Utc::now().date_naive(), fetch).await
    }

    ///
    /// An entry that no longer decodes is treated as a miss and overwritten.
    pub async fn get_or_fetch_on<F, Fut>(
        &self,
        login: &str,
        date: NaiveDate,
        fetch: F,
    ) -> Result<Vec<StarRecord>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<StarRecord>>>,
    {
        let key = CacheKey::new(login, date)?;

        match self.backend.load(&key).await {
            Ok(Some(records)) => {
                debug!(%key, records = records.len(), "Cache hit");
                return Ok(records);
            }
            Ok(None) => debug!(%key, "Cache miss, fetching starred repositories"),
            Err(StarNetworkError::CorruptEntry(reason)) => {
                warn!(%key, %reason, "Discarding undecodable cache entry, refetching");
            }
            Err(e) => return Err(e),
        }

        let records = fetch(login.to_string()).await?;
        self.backend.store(&key, &records).await?;
        info!(%key, records = records.len(), "Cached starred repositories");

        Ok(records)
    }

    /// Remove entries outside the retention policy. Returns how many went.
    pub async fn purge(&self, today: NaiveDate) -> Result<usize> {
        let keys = self.backend.keys().await?;
        let expired = self.retention.expired(keys, today);

        for key in &expired {
            self.backend.remove(key).await?;
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "Purged expired cache entries");
        }
        Ok(expired.len())
    }
}
