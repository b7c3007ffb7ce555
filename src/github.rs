use crate::error::{Result, StarNetworkError};
use crate::models::{RateLimitState, Resource, StarRecord, UserIdentity};
use crate::types::{GitHubProfile, GitHubStarredRepo, GitHubUser};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";
pub const PER_PAGE: u32 = 100;
const MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_PAGES: u32 = 10;

/// Remote listings the recommendation engine reads from
#[async_trait]
pub trait StarSource: Send + Sync {
    /// Repositories starred by `login`, in provider order (newest first).
    async fn fetch_user_starred(&self, login: &str) -> Result<Vec<StarRecord>>;

    /// Users who starred `resource`.
    async fn fetch_stargazers(&self, resource: &Resource) -> Result<Vec<UserIdentity>>;

    /// Largest listing either fetch can return. A listing that reaches it may
    /// have been cut short. `None` means listings are always complete.
    fn listing_cap(&self) -> Option<usize> {
        None
    }
}

pub struct GitHubClient {
    client: Client,
    token: String,
    base_url: Url,
    max_pages: u32,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, API_BASE_URL)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("GitHub Star Network/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        // Relative joins replace the last path segment unless it ends in '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            StarNetworkError::EnvError(format!("Invalid API base URL {}: {}", base_url, e))
        })?;

        Ok(GitHubClient {
            client,
            token,
            base_url,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Upper bound on pages followed by the paginated listings.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn endpoint(&self, path: &str, page: Option<u32>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| StarNetworkError::ApiError(format!("Bad endpoint {}: {}", path, e)))?;
        if let Some(page) = page {
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    async fn make_request(&self, url: &Url) -> Result<Response> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(url.clone())
                .header("Accept", "application/vnd.github.v3+json")
                .header("Authorization", format!("token {}", self.token))
                .send()
                .await?;

            let rate_limit = self.get_rate_limit_state(&response);

            match response.status() {
                reqwest::StatusCode::OK => {
                    if rate_limit.remaining < 10 {
                        warn!(remaining = rate_limit.remaining, "Rate limit low, adding delay");
                        sleep(Duration::from_secs(1)).await;
                    }
                    return Ok(response);
                }
                reqwest::StatusCode::NOT_FOUND => {
                    return Err(StarNetworkError::NotFound(format!("Resource not found: {}", url)));
                }
                reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(StarNetworkError::AuthError(
                        "GitHub rejected the access token".to_string(),
                    ));
                }
                reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::TOO_MANY_REQUESTS
                    if rate_limit.is_limited =>
                {
                    let reset_time = SystemTime::from(rate_limit.reset_time);
                    let wait_time = reset_time
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::from_secs(0));

                    if wait_time > Duration::from_secs(60) {
                        return Err(StarNetworkError::RateLimitExceeded(
                            format!("API rate limit exceeded. Reset at: {}", rate_limit.reset_time)
                        ));
                    }
                    warn!(wait_seconds = wait_time.as_secs() + 1, "Rate limit reached, waiting");
                    sleep(wait_time + Duration::from_secs(1)).await;
                    continue;
                }
                reqwest::StatusCode::FORBIDDEN => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(StarNetworkError::ApiError(format!("Forbidden: {}", error_text)));
                }
                status if status.is_server_error() && retries < MAX_RETRIES => {
                    warn!(%status, attempt = retries + 1, "Server error, retrying in 2 seconds");
                    sleep(Duration::from_secs(2)).await;
                    retries += 1;
                    continue;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(StarNetworkError::ApiError(
                        format!("API request failed with status {}: {}", status, error_text)
                    ));
                }
            }
        }
    }

    /// Get current rate limit state from a response
    pub fn get_rate_limit_state(&self, response: &Response) -> RateLimitState {
        let headers = response.headers();
        let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

        let limit = header("X-RateLimit-Limit")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5000);

        // Without the header (proxies, rate limiting disabled) nothing is spent
        let remaining_header = header("X-RateLimit-Remaining").and_then(|s| s.parse::<u32>().ok());
        let remaining = remaining_header.unwrap_or(limit);

        let reset_time = header("X-RateLimit-Reset")
            .and_then(|s| s.parse::<i64>().ok())
            .map(|timestamp| DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

        RateLimitState {
            remaining,
            limit,
            reset_time,
            is_limited: remaining_header == Some(0),
        }
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<(Vec<T>, bool, RateLimitState)> {
        let response = self.make_request(url).await?;
        let rate_limit = self.get_rate_limit_state(&response);

        let items: Vec<T> = response.json().await?;
        let has_more = items.len() == PER_PAGE as usize;

        Ok((items, has_more, rate_limit))
    }

    /// Follow pages until a short page or the page cap. Hitting the cap with
    /// more pages left is logged; callers detect it through `listing_cap`.
    async fn fetch_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let url = self.endpoint(path, Some(page))?;
            let (batch, has_more, rate_limit) = self.fetch_page::<T>(&url).await?;
            debug!(
                path,
                page,
                count = batch.len(),
                remaining = rate_limit.remaining,
                "Fetched page"
            );
            items.extend(batch);

            if !has_more {
                break;
            }
            if page >= self.max_pages {
                warn!(
                    path,
                    max_pages = self.max_pages,
                    items = items.len(),
                    "Page cap reached, listing truncated"
                );
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Profile of the user owning the access token
    pub async fn get_authenticated_user(&self) -> Result<GitHubProfile> {
        let url = self.endpoint("user", None)?;
        let response = self.make_request(&url).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StarSource for GitHubClient {
    async fn fetch_user_starred(&self, login: &str) -> Result<Vec<StarRecord>> {
        let repos: Vec<GitHubStarredRepo> = self
            .fetch_all_pages(&format!("users/{}/starred", login))
            .await?;
        let user = UserIdentity::from_login(login);

        let mut records = Vec::with_capacity(repos.len());
        for repo in repos {
            match Resource::try_from(repo) {
                Ok(resource) => records.push(StarRecord::approximate(user.clone(), resource)),
                Err(e) => warn!(login, error = %e, "Dropping malformed starred repo"),
            }
        }

        Ok(records)
    }

    async fn fetch_stargazers(&self, resource: &Resource) -> Result<Vec<UserIdentity>> {
        let repo_id = resource.id()?;
        let users: Vec<GitHubUser> = self
            .fetch_all_pages(&format!("repos/{}/{}/stargazers", repo_id.owner, repo_id.name))
            .await?;
        Ok(users.into_iter().map(UserIdentity::from).collect())
    }

    fn listing_cap(&self) -> Option<usize> {
        Some(self.max_pages as usize * PER_PAGE as usize)
    }
}
