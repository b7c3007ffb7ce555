use crate::cache::ResourceCache;
use crate::engine::neighborhood::{DEFAULT_MAX_NEIGHBORS, DEFAULT_MAX_SEED_RESOURCES};
use crate::engine::{NeighborFailurePolicy, NeighborhoodCollector, RecommendationAggregator};
use crate::error::Result;
use crate::github::StarSource;
use crate::models::{Neighbor, NeighborhoodSet, Resource, ResourceScore};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_RESULT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct RecommendationSettings {
    pub max_neighbors: usize,
    pub max_seed_resources: usize,
    pub result_limit: usize,
    pub failure_policy: NeighborFailurePolicy,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
            max_seed_resources: DEFAULT_MAX_SEED_RESOURCES,
            result_limit: DEFAULT_RESULT_LIMIT,
            failure_policy: NeighborFailurePolicy::Propagate,
        }
    }
}

/// Top recommendations for one seed user
#[derive(Debug, Clone)]
pub struct RecommendationReport {
    pub login: String,
    pub neighbors: usize,
    pub recommendations: Vec<ResourceScore>,
    pub skipped_records: usize,
    pub failed_neighbors: Vec<String>,
    /// True when the neighborhood, a listing or the result list was cut short.
    pub truncated: bool,
}

/// Users sharing the most starred repositories with a seed user
#[derive(Debug, Clone)]
pub struct SimilarUsersReport {
    pub login: String,
    pub users: Vec<Neighbor>,
    pub truncated: bool,
}

/// Runs one recommendation request end to end against a star source
#[derive(Clone)]
pub struct RecommendationService {
    source: Arc<dyn StarSource>,
    cache: ResourceCache,
    settings: RecommendationSettings,
}

impl RecommendationService {
    pub fn new(
        source: Arc<dyn StarSource>,
        cache: ResourceCache,
        settings: RecommendationSettings,
    ) -> Self {
        Self { source, cache, settings }
    }

    pub fn settings(&self) -> RecommendationSettings {
        self.settings
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    fn reaches_cap(&self, len: usize) -> bool {
        self.source.listing_cap().is_some_and(|cap| len >= cap)
    }

    async fn seed_resources(&self, login: &str, now: DateTime<Utc>) -> Result<Vec<Resource>> {
        let source = self.source.clone();
        let records = self
            .cache
            .get_or_fetch_on(login, now.date_naive(), |login| async move {
                source.fetch_user_starred(&login).await
            })
            .await?;
        Ok(records.into_iter().map(|record| record.resource).collect())
    }

    async fn neighborhood(&self, login: &str, seed: &[Resource]) -> Result<NeighborhoodSet> {
        let settings = self.settings;
        let collector =
            NeighborhoodCollector::new(settings.max_neighbors, settings.max_seed_resources)
                .excluding(login)
                .with_listing_cap(self.source.listing_cap());
        let source = self.source.clone();
        let mut neighborhood = collector
            .run(seed, |resource| {
                let source = source.clone();
                async move { source.fetch_stargazers(&resource).await }
            })
            .await?;

        if self.reaches_cap(seed.len()) {
            warn!(login, "Seed listing hit the page cap");
            neighborhood.truncated = true;
        }
        Ok(neighborhood)
    }

    pub async fn recommend(&self, login: &str) -> Result<RecommendationReport> {
        self.recommend_at(login, Utc::now()).await
    }

    pub async fn recommend_at(
        &self,
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<RecommendationReport> {
        let seed = self.seed_resources(login, now).await?;
        let neighborhood = self.neighborhood(login, &seed).await?;

        let aggregator = RecommendationAggregator::new(self.cache.clone())
            .with_failure_policy(self.settings.failure_policy)
            .with_listing_cap(self.source.listing_cap());
        let source = self.source.clone();
        let aggregated = aggregator
            .aggregate(neighborhood.logins(), now, |neighbor| {
                let source = source.clone();
                async move { source.fetch_user_starred(&neighbor).await }
            })
            .await?;

        let already_starred: HashSet<&str> = seed.iter().map(|r| r.full_name.as_str()).collect();
        let mut recommendations: Vec<ResourceScore> = aggregated
            .scores
            .into_iter()
            .filter(|score| !already_starred.contains(score.resource_id.to_string().as_str()))
            .collect();

        let mut truncated = neighborhood.truncated || !aggregated.truncated_listings.is_empty();
        if recommendations.len() > self.settings.result_limit {
            recommendations.truncate(self.settings.result_limit);
            truncated = true;
        }

        info!(
            login,
            neighbors = neighborhood.len(),
            recommendations = recommendations.len(),
            truncated,
            "Built recommendations"
        );

        Ok(RecommendationReport {
            login: login.to_string(),
            neighbors: neighborhood.len(),
            recommendations,
            skipped_records: aggregated.skipped_records,
            failed_neighbors: aggregated.failed_neighbors,
            truncated,
        })
    }

    pub async fn similar_users(&self, login: &str, limit: usize) -> Result<SimilarUsersReport> {
        let seed = self.seed_resources(login, Utc::now()).await?;
        let neighborhood = self.neighborhood(login, &seed).await?;

        let ranked = neighborhood.ranked_by_overlap();
        let truncated = neighborhood.truncated || ranked.len() > limit;
        let users = ranked.into_iter().take(limit).cloned().collect();

        Ok(SimilarUsersReport {
            login: login.to_string(),
            users,
            truncated,
        })
    }
}
