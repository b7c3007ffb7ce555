use crate::cache::ResourceCache;
use crate::engine::weighting::weight_units_or_default;
use crate::error::{ErrorKind, Result};
use crate::models::{Recommendations, ResourceId, ResourceScore, StarRecord};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

/// What to do when one neighbor's listing cannot be fetched or cached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NeighborFailurePolicy {
    /// Abort the aggregation with the error.
    #[default]
    Propagate,
    /// Log, remember the login in `failed_neighbors` and carry on.
    SkipNeighbor,
}

/// Scores repositories starred across a neighborhood
#[derive(Clone)]
pub struct RecommendationAggregator {
    cache: ResourceCache,
    failure_policy: NeighborFailurePolicy,
    listing_cap: Option<usize>,
}

impl RecommendationAggregator {
    pub fn new(cache: ResourceCache) -> Self {
        Self {
            cache,
            failure_policy: NeighborFailurePolicy::default(),
            listing_cap: None,
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: NeighborFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Listings reaching `cap` records are reported in `truncated_listings`.
    pub fn with_listing_cap(mut self, cap: Option<usize>) -> Self {
        self.listing_cap = cap;
        self
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Rank every repository starred by `neighbor_logins`.
    ///
    /// Each star adds one to the repository's count and its recency weight to
    /// the score; the URL and star count come from the last record seen.
    /// Records that fail validation are skipped and counted. A neighbor whose
    /// login or listing is malformed is skipped whatever the failure policy.
    /// The result is sorted by weighted score, then star count, both
    /// descending.
    pub async fn aggregate<I, S, F, Fut>(
        &self,
        neighbor_logins: I,
        now: DateTime<Utc>,
        mut fetch_user_starred: F,
    ) -> Result<Recommendations>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Vec<StarRecord>>>,
    {
        let today = now.date_naive();
        let mut scores: HashMap<ResourceId, ResourceScore> = HashMap::new();
        let mut recommendations = Recommendations::default();
        let mut neighbors = 0usize;

        for login in neighbor_logins {
            let login = login.as_ref();
            neighbors += 1;

            let fetched = self
                .cache
                .get_or_fetch_on(login, today, &mut fetch_user_starred)
                .await;
            let records = match fetched {
                Ok(records) => records,
                Err(e)
                    if e.kind() == ErrorKind::MalformedRecord
                        || self.failure_policy == NeighborFailurePolicy::SkipNeighbor =>
                {
                    warn!(login, error = %e, "Skipping neighbor after failed fetch");
                    recommendations.failed_neighbors.push(login.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.listing_cap.is_some_and(|cap| records.len() >= cap) {
                warn!(login, records = records.len(), "Neighbor listing hit the page cap");
                recommendations.truncated_listings.push(login.to_string());
            }

            for record in &records {
                match record.validate() {
                    Ok(id) => accumulate(&mut scores, id, record, now),
                    Err(e) => {
                        debug!(login, error = %e, "Skipping malformed star record");
                        recommendations.skipped_records += 1;
                    }
                }
            }
        }

        let mut ranked: Vec<ResourceScore> = scores.into_values().collect();
        ranked.sort_by(rank_order);

        info!(
            neighbors,
            candidates = ranked.len(),
            skipped_records = recommendations.skipped_records,
            failed_neighbors = recommendations.failed_neighbors.len(),
            "Aggregated neighborhood stars"
        );

        recommendations.scores = ranked;
        Ok(recommendations)
    }
}

fn accumulate(
    scores: &mut HashMap<ResourceId, ResourceScore>,
    id: ResourceId,
    record: &StarRecord,
    now: DateTime<Utc>,
) {
    let score = scores.entry(id).or_insert_with_key(|id| ResourceScore::new(id.clone()));
    score.count += 1;
    score.weight_units += weight_units_or_default(record.starred_at, now);
    score.html_url.clone_from(&record.resource.html_url);
    score.stargazers_count = record.resource.stargazers_count;
}

/// Weighted score desc, star count desc, then name for a stable order.
pub fn rank_order(a: &ResourceScore, b: &ResourceScore) -> Ordering {
    b.weight_units
        .cmp(&a.weight_units)
        .then_with(|| b.stargazers_count.cmp(&a.stargazers_count))
        .then_with(|| a.resource_id.cmp(&b.resource_id))
}
