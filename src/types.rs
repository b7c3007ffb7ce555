use crate::error::StarNetworkError;
use crate::models::{Resource, UserIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// GitHub API response structures. Fields the provider has been seen to omit
// are optional and checked when converting into domain types.
#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub avatar_url: Option<String>,
    pub html_url: String,
}

impl From<GitHubUser> for UserIdentity {
    fn from(user: GitHubUser) -> Self {
        let avatar_url = user
            .avatar_url
            .unwrap_or_else(|| format!("https://github.com/{}.png", user.login));
        UserIdentity {
            login: user.login,
            avatar_url,
            profile_url: user.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubStarredRepo {
    pub full_name: Option<String>,
    pub html_url: Option<String>,
    pub stargazers_count: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<GitHubStarredRepo> for Resource {
    type Error = StarNetworkError;

    fn try_from(repo: GitHubStarredRepo) -> Result<Self, Self::Error> {
        let full_name = repo.full_name.ok_or_else(|| {
            StarNetworkError::MalformedRecord("starred repo without full_name".to_string())
        })?;
        let html_url = repo.html_url.ok_or_else(|| {
            StarNetworkError::MalformedRecord(format!(
                "starred repo {} without html_url",
                full_name
            ))
        })?;

        Ok(Resource {
            full_name,
            html_url,
            stargazers_count: repo.stargazers_count.unwrap_or(0),
            created_at: repo.created_at,
        })
    }
}

/// Authenticated user's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: String,
    pub public_repos: Option<u32>,
    pub followers: Option<u32>,
    pub following: Option<u32>,
}
