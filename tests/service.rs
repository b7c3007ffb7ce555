mod common;

use common::{fixed_now, repo, FakeSource};
use github_star_network::cache::ResourceCache;
use github_star_network::error::StarNetworkError;
use github_star_network::service::{RecommendationService, RecommendationSettings};
use std::sync::Arc;

/// `me` stars one and two; u1 and u2 share one of those each and star
/// three and four besides.
fn network() -> Arc<FakeSource> {
    let one = repo("acme/one", 10);
    let two = repo("acme/two", 20);
    let three = repo("acme/three", 30);
    let four = repo("acme/four", 40);
    Arc::new(
        FakeSource::new()
            .stars("me", &[&one, &two])
            .stars("u1", &[&one, &three])
            .stars("u2", &[&two, &three, &four]),
    )
}

fn service(source: Arc<FakeSource>, settings: RecommendationSettings) -> RecommendationService {
    RecommendationService::new(source, ResourceCache::in_memory(), settings)
}

#[tokio::test]
async fn test_recommend_excludes_seed_user_and_own_stars() {
    let source = network();
    let service = service(source.clone(), RecommendationSettings::default());

    let report = service.recommend_at("me", fixed_now()).await.unwrap();

    let names: Vec<String> = report
        .recommendations
        .iter()
        .map(|s| s.resource_id.to_string())
        .collect();
    assert_eq!(names, vec!["acme/three", "acme/four"]);
    assert_eq!(report.recommendations[0].count, 2);
    assert_eq!(report.neighbors, 2);
    assert!(!report.truncated);
    assert_eq!(report.login, "me");
    // seed listing plus one listing per neighbor, one stargazer fetch per seed repo
    assert_eq!(source.starred_calls(), 3);
    assert_eq!(source.stargazer_calls(), 2);
}

#[tokio::test]
async fn test_result_limit_marks_truncated() {
    let settings = RecommendationSettings {
        result_limit: 1,
        ..Default::default()
    };
    let service = service(network(), settings);

    let report = service.recommend_at("me", fixed_now()).await.unwrap();

    assert_eq!(report.recommendations.len(), 1);
    assert!(report.truncated);
}

#[tokio::test]
async fn test_neighbor_cap_is_reported() {
    let settings = RecommendationSettings {
        max_neighbors: 1,
        ..Default::default()
    };
    let service = service(network(), settings);

    let report = service.recommend_at("me", fixed_now()).await.unwrap();

    assert_eq!(report.neighbors, 1);
    assert!(report.truncated);
}

#[tokio::test]
async fn test_similar_users_ranked_by_overlap() {
    let one = repo("acme/one", 10);
    let two = repo("acme/two", 20);
    let source = Arc::new(
        FakeSource::new()
            .stars("me", &[&one, &two])
            .stars("solo", &[&two])
            .stars("twin", &[&one, &two]),
    );
    let service = service(source, RecommendationSettings::default());

    let report = service.similar_users("me", 10).await.unwrap();

    let logins: Vec<&str> = report.users.iter().map(|u| u.identity.login.as_str()).collect();
    assert_eq!(logins, vec!["twin", "solo"]);
    assert_eq!(report.users[0].common_resources.len(), 2);
    assert!(!report.truncated);

    let limited = service.similar_users("me", 1).await.unwrap();
    assert_eq!(limited.users.len(), 1);
    assert!(limited.truncated);
}

#[tokio::test]
async fn test_invalid_seed_login() {
    let service = service(network(), RecommendationSettings::default());

    let result = service.recommend_at("not/a/login", fixed_now()).await;

    assert!(matches!(result, Err(StarNetworkError::InvalidLogin(_))));
}

#[tokio::test]
async fn test_seed_fetch_failure_propagates() {
    let source = Arc::new(FakeSource::new().failing("me"));
    let service = service(source, RecommendationSettings::default());

    let result = service.recommend_at("me", fixed_now()).await;

    assert!(matches!(result, Err(StarNetworkError::ApiError(_))));
}

#[tokio::test]
async fn test_listing_at_page_cap_marks_truncated() {
    let one = repo("acme/one", 10);
    let two = repo("acme/two", 20);
    let three = repo("acme/three", 30);
    let source = Arc::new(
        FakeSource::new()
            .stars("me", &[&one])
            .stars("u1", &[&one, &two, &three])
            .capped(3),
    );
    let service = service(source, RecommendationSettings::default());

    let report = service.recommend_at("me", fixed_now()).await.unwrap();

    assert_eq!(report.recommendations.len(), 2);
    assert!(report.truncated);
}
