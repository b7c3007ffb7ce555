use crate::error::{Result, StarNetworkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Owner/name pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub owner: String,
    pub name: String,
}

impl FromStr for ResourceId {
    type Err = StarNetworkError;

    fn from_str(full_name: &str) -> Result<Self> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(ResourceId {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(StarNetworkError::InvalidRepoUrl(
                format!("Invalid repository name format: {}", full_name)
            )),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository snapshot as fetched from GitHub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub full_name: String,
    pub html_url: String,
    pub stargazers_count: u32,
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn id(&self) -> Result<ResourceId> {
        self.full_name.parse()
    }
}

/// GitHub account as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub login: String,
    pub avatar_url: String,
    pub profile_url: String,
}

impl UserIdentity {
    /// Identity with the URLs GitHub derives from a bare login.
    pub fn from_login(login: &str) -> Self {
        Self {
            login: login.to_string(),
            avatar_url: format!("https://github.com/{}.png", login),
            profile_url: format!("https://github.com/{}", login),
        }
    }
}

/// A user starring a repository.
///
/// `starred_at` is approximate: the starred list endpoint does not report
/// when the star happened, so the repository's creation time stands in for
/// it. Recency weighting built on this value inherits the approximation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    pub user: UserIdentity,
    pub resource: Resource,
    pub starred_at: Option<DateTime<Utc>>,
}

impl StarRecord {
    /// Build a record for `user`, using the repository creation time as the
    /// starred-at proxy.
    pub fn approximate(user: UserIdentity, resource: Resource) -> Self {
        let starred_at = resource.created_at;
        Self { user, resource, starred_at }
    }

    /// Check the fields scoring depends on.
    pub fn validate(&self) -> Result<ResourceId> {
        let id = self.resource.id().map_err(|_| {
            StarNetworkError::MalformedRecord(format!(
                "bad repository name {:?} starred by {}",
                self.resource.full_name, self.user.login
            ))
        })?;
        if self.resource.html_url.is_empty() {
            return Err(StarNetworkError::MalformedRecord(
                format!("repository {} has no URL", self.resource.full_name)
            ));
        }
        Ok(id)
    }
}

/// A neighborhood member and the seed repositories they share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub identity: UserIdentity,
    pub common_resources: Vec<String>,
}

/// Users who starred the same repositories as a seed user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodSet {
    pub members: BTreeMap<String, Neighbor>,
    /// Set when the member cap or the seed resource cap cut collection short.
    pub truncated: bool,
}

impl NeighborhoodSet {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn logins(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    /// Members ordered by number of shared repositories, most first; ties by login.
    pub fn ranked_by_overlap(&self) -> Vec<&Neighbor> {
        let mut ranked: Vec<&Neighbor> = self.members.values().collect();
        ranked.sort_by(|a, b| {
            b.common_resources
                .len()
                .cmp(&a.common_resources.len())
                .then_with(|| a.identity.login.cmp(&b.identity.login))
        });
        ranked
    }
}

/// Per-repository accumulator for one aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceScore {
    pub resource_id: ResourceId,
    pub html_url: String,
    pub stargazers_count: u32,
    pub count: u32,
    /// Sum of weights in fifths, so equal scores compare equal.
    pub(crate) weight_units: u32,
}

impl ResourceScore {
    pub fn new(resource_id: ResourceId) -> Self {
        Self {
            resource_id,
            html_url: String::new(),
            stargazers_count: 0,
            count: 0,
            weight_units: 0,
        }
    }

    pub fn weighted_score(&self) -> f64 {
        self.weight_units as f64 / crate::engine::weighting::UNITS_PER_WEIGHT as f64
    }
}

/// Ranked output of one aggregation
#[derive(Debug, Clone, Default)]
pub struct Recommendations {
    pub scores: Vec<ResourceScore>,
    pub skipped_records: usize,
    pub failed_neighbors: Vec<String>,
    /// Neighbors whose listing reached the source's page cap.
    pub truncated_listings: Vec<String>,
}

/// Rate limit state parsed from response headers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u32,
    pub limit: u32,
    pub reset_time: DateTime<Utc>,
    pub is_limited: bool,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: 5000,
            limit: 5000,
            reset_time: Utc::now() + chrono::Duration::hours(1),
            is_limited: false,
        }
    }
}
