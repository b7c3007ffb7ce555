use crate::error::Result;
use crate::models::{Neighbor, NeighborhoodSet, Resource, UserIdentity};
use std::future::Future;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_NEIGHBORS: usize = 500;
pub const DEFAULT_MAX_SEED_RESOURCES: usize = 10;

/// Finds users who starred the same repositories as a seed user
#[derive(Debug, Clone)]
pub struct NeighborhoodCollector {
    pub max_neighbors: usize,
    pub max_seed_resources: usize,
    /// Login never admitted to the set, normally the seed user. Compared
    /// ignoring ASCII case.
    pub exclude: Option<String>,
    /// Stargazer lists reaching this length mark the set truncated.
    pub listing_cap: Option<usize>,
}

impl Default for NeighborhoodCollector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NEIGHBORS, DEFAULT_MAX_SEED_RESOURCES)
    }
}

impl NeighborhoodCollector {
    pub fn new(max_neighbors: usize, max_seed_resources: usize) -> Self {
        Self {
            max_neighbors,
            max_seed_resources,
            exclude: None,
            listing_cap: None,
        }
    }

    pub fn excluding(mut self, login: &str) -> Self {
        self.exclude = Some(login.to_string());
        self
    }

    pub fn with_listing_cap(mut self, cap: Option<usize>) -> Self {
        self.listing_cap = cap;
        self
    }

    pub async fn run<F, Fut>(
        &self,
        seed_resources: &[Resource],
        fetch_stargazers: F,
    ) -> Result<NeighborhoodSet>
    where
        F: FnMut(Resource) -> Fut,
        Fut: Future<Output = Result<Vec<UserIdentity>>>,
    {
        collect_members(seed_resources, self, fetch_stargazers).await
    }
}

/// Walk the seed's repositories in provider order, one stargazer fetch per
/// repository, and gather the stargazers into a neighborhood.
///
/// Collection stops once a new stargazer would exceed `max_neighbors`; the
/// returned set is then marked truncated, as it is when the seed list was
/// longer than `max_seed_resources`. A failed stargazer fetch aborts the
/// whole collection.
pub async fn collect<F, Fut>(
    seed_resources: &[Resource],
    max_neighbors: usize,
    max_seed_resources: usize,
    fetch_stargazers: F,
) -> Result<NeighborhoodSet>
where
    F: FnMut(Resource) -> Fut,
    Fut: Future<Output = Result<Vec<UserIdentity>>>,
{
    let collector = NeighborhoodCollector::new(max_neighbors, max_seed_resources);
    collect_members(seed_resources, &collector, fetch_stargazers).await
}

async fn collect_members<F, Fut>(
    seed_resources: &[Resource],
    collector: &NeighborhoodCollector,
    mut fetch_stargazers: F,
) -> Result<NeighborhoodSet>
where
    F: FnMut(Resource) -> Fut,
    Fut: Future<Output = Result<Vec<UserIdentity>>>,
{
    let max_neighbors = collector.max_neighbors;
    let max_seed_resources = collector.max_seed_resources;
    let exclude = collector.exclude.as_deref();

    let mut neighborhood = NeighborhoodSet {
        truncated: seed_resources.len() > max_seed_resources,
        ..Default::default()
    };

    'resources: for resource in seed_resources.iter().take(max_seed_resources) {
        let stargazers = fetch_stargazers(resource.clone()).await?;
        debug!(
            repo = %resource.full_name,
            stargazers = stargazers.len(),
            "Fetched stargazers for seed repository"
        );
        if collector.listing_cap.is_some_and(|cap| stargazers.len() >= cap) {
            warn!(repo = %resource.full_name, "Stargazer listing hit the page cap");
            neighborhood.truncated = true;
        }

        for stargazer in stargazers {
            if exclude.is_some_and(|login| login.eq_ignore_ascii_case(&stargazer.login)) {
                continue;
            }
            if let Some(member) = neighborhood.members.get_mut(&stargazer.login) {
                if !member.common_resources.contains(&resource.full_name) {
                    member.common_resources.push(resource.full_name.clone());
                }
                continue;
            }

            if neighborhood.members.len() >= max_neighbors {
                neighborhood.truncated = true;
                break 'resources;
            }

            neighborhood.members.insert(
                stargazer.login.clone(),
                Neighbor {
                    identity: stargazer,
                    common_resources: vec![resource.full_name.clone()],
                },
            );
        }
    }

    info!(
        members = neighborhood.len(),
        truncated = neighborhood.truncated,
        "Collected neighborhood"
    );

    Ok(neighborhood)
}
