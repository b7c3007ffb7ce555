mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{repo, FakeSource};
use github_star_network::cache::ResourceCache;
use github_star_network::github::GitHubClient;
use github_star_network::server::{
    create_router, AppState, HealthResponse, RecommendationsResponse,
};
use github_star_network::service::{RecommendationService, RecommendationSettings};
use std::sync::Arc;
use tower::ServiceExt;

fn app(api_key: Option<&str>) -> Router {
    let one = repo("acme/one", 10);
    let two = repo("acme/two", 20);
    let three = repo("acme/three", 30);
    let source = Arc::new(
        FakeSource::new()
            .stars("me", &[&one])
            .stars("u1", &[&one, &two, &three])
            .stars("u2", &[&one, &two]),
    );
    let service = RecommendationService::new(
        source,
        ResourceCache::in_memory(),
        RecommendationSettings::default(),
    );
    let github =
        Arc::new(GitHubClient::new("test_token".to_string()).expect("Failed to create client"));
    create_router(AppState::new(service, github, api_key.map(str::to_string)))
}

async fn send(app: Router, uri: &str, auth: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().uri(uri);
    if let Some(auth) = auth {
        request = request.header(header::AUTHORIZATION, auth);
    }
    let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_is_open() {
    let (status, body) = send(app(Some("secret")), "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_recommendations_route() {
    let (status, body) = send(app(None), "/users/me/recommendations", None).await;

    assert_eq!(status, StatusCode::OK);
    let response: RecommendationsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.login, "me");
    assert_eq!(response.neighbors, 2);
    assert!(!response.truncated);

    // Every star has the same age, so shared stars outrank popularity
    let ranked: Vec<(&str, u32)> = response
        .recommendations
        .iter()
        .map(|r| (r.full_name.as_str(), r.count))
        .collect();
    assert_eq!(ranked, vec![("acme/two", 2), ("acme/three", 1)]);
    let (first, second) = (&response.recommendations[0], &response.recommendations[1]);
    assert!(first.weighted_score > second.weighted_score);
}

#[tokio::test]
async fn test_recommendations_limit_param() {
    let (status, body) = send(app(None), "/users/me/recommendations?limit=1", None).await;

    assert_eq!(status, StatusCode::OK);
    let response: RecommendationsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.recommendations.len(), 1);
    assert_eq!(response.recommendations[0].full_name, "acme/two");
    assert!(response.truncated);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let (status, _) = send(app(Some("secret")), "/users/me/recommendations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = "/users/me/recommendations";
    let (status, _) = send(app(Some("secret")), uri, Some("Bearer wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app(Some("secret")), uri, Some("Bearer secret")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_login_is_bad_request() {
    let (status, body) = send(app(None), "/users/bad%20login/similar", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("Invalid login"));
}

#[tokio::test]
async fn test_purge_route() {
    let app = app(None);
    let request = Request::builder()
        .method("POST")
        .uri("/cache/purge")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
