use chrono::{TimeZone, Utc};
use github_star_network::models::{
    NeighborhoodSet, RateLimitState, Resource, ResourceId, StarRecord, UserIdentity,
};
use github_star_network::types::GitHubStarredRepo;
use github_star_network::error::StarNetworkError;

fn resource() -> Resource {
    Resource {
        full_name: "owner/test-repo".to_string(),
        html_url: "https://github.com/owner/test-repo".to_string(),
        stargazers_count: 100,
        created_at: Some(Utc.with_ymd_and_hms(2023, 3, 14, 9, 26, 53).unwrap()),
    }
}

#[test]
fn test_resource_id_parsing() {
    let id: ResourceId = "rust-lang/rust".parse().unwrap();
    assert_eq!(id.owner, "rust-lang");
    assert_eq!(id.name, "rust");
    assert_eq!(id.to_string(), "rust-lang/rust");

    for bad in ["invalid-format", "/rust", "rust-lang/", "a/b/c", ""] {
        match bad.parse::<ResourceId>() {
            Err(StarNetworkError::InvalidRepoUrl(_)) => {}
            other => panic!("Expected InvalidRepoUrl for {:?}, got: {:?}", bad, other),
        }
    }
}

#[test]
fn test_user_identity_from_login() {
    let user = UserIdentity::from_login("octocat");
    assert_eq!(user.login, "octocat");
    assert_eq!(user.avatar_url, "https://github.com/octocat.png");
    assert_eq!(user.profile_url, "https://github.com/octocat");
}

#[test]
fn test_star_record_uses_creation_time() {
    let record = StarRecord::approximate(UserIdentity::from_login("octocat"), resource());
    assert_eq!(record.starred_at, resource().created_at);
    assert_eq!(record.validate().unwrap().to_string(), "owner/test-repo");
}

#[test]
fn test_star_record_validation() {
    let mut bad_name = resource();
    bad_name.full_name = "test-repo".to_string();
    let record = StarRecord::approximate(UserIdentity::from_login("octocat"), bad_name);
    assert!(matches!(record.validate(), Err(StarNetworkError::MalformedRecord(_))));

    let mut no_url = resource();
    no_url.html_url.clear();
    let record = StarRecord::approximate(UserIdentity::from_login("octocat"), no_url);
    assert!(matches!(record.validate(), Err(StarNetworkError::MalformedRecord(_))));
}

#[test]
fn test_starred_repo_conversion() {
    let json = r#"{
        "full_name": "owner/test-repo",
        "html_url": "https://github.com/owner/test-repo",
        "stargazers_count": 100,
        "created_at": "2023-03-14T09:26:53Z",
        "language": "Rust"
    }"#;
    let wire: GitHubStarredRepo = serde_json::from_str(json).unwrap();
    assert_eq!(Resource::try_from(wire).unwrap(), resource());

    let missing_url: GitHubStarredRepo =
        serde_json::from_str(r#"{"full_name": "owner/x"}"#).unwrap();
    assert!(matches!(
        Resource::try_from(missing_url),
        Err(StarNetworkError::MalformedRecord(_))
    ));
}

#[test]
fn test_star_record_serialization() {
    let record = StarRecord::approximate(UserIdentity::from_login("octocat"), resource());
    let json = serde_json::to_string(&record).unwrap();

    assert!(json.contains("\"login\":\"octocat\""));
    assert!(json.contains("\"full_name\":\"owner/test-repo\""));
    assert!(json.contains("\"starred_at\":\"2023-03-14T09:26:53Z\""));

    let back: StarRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_empty_neighborhood() {
    let neighborhood = NeighborhoodSet::default();
    assert!(neighborhood.is_empty());
    assert!(!neighborhood.truncated);
    assert!(neighborhood.ranked_by_overlap().is_empty());
}

#[test]
fn test_rate_limit_default() {
    let default_rate_limit = RateLimitState::default();

    assert_eq!(default_rate_limit.remaining, 5000);
    assert_eq!(default_rate_limit.limit, 5000);
    assert!(!default_rate_limit.is_limited);
    let time_diff = default_rate_limit.reset_time.signed_duration_since(Utc::now());
    assert!(time_diff.num_minutes() >= 59 && time_diff.num_minutes() <= 61);
}
