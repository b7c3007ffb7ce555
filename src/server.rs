use crate::error::{ErrorKind, StarNetworkError};
use crate::github::GitHubClient;
use crate::models::{Neighbor, ResourceScore};
use crate::service::RecommendationService;
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const DEFAULT_SIMILAR_USERS: usize = 20;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: RecommendationService,
    pub github: Arc<GitHubClient>,
    pub api_key: Option<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        service: RecommendationService,
        github: Arc<GitHubClient>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            service,
            github,
            api_key,
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoredRepo {
    pub full_name: String,
    pub html_url: String,
    pub stargazers_count: u32,
    pub count: u32,
    pub weighted_score: f64,
}

impl From<&ResourceScore> for ScoredRepo {
    fn from(score: &ResourceScore) -> Self {
        Self {
            full_name: score.resource_id.to_string(),
            html_url: score.html_url.clone(),
            stargazers_count: score.stargazers_count,
            count: score.count,
            weighted_score: score.weighted_score(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub login: String,
    pub neighbors: usize,
    pub truncated: bool,
    pub skipped_records: usize,
    pub failed_neighbors: Vec<String>,
    pub recommendations: Vec<ScoredRepo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarUsersResponse {
    pub login: String,
    pub truncated: bool,
    pub users: Vec<Neighbor>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub removed: usize,
}

impl IntoResponse for StarNetworkError {
    fn into_response(self) -> Response {
        let status = match (&self, self.kind()) {
            (StarNetworkError::NotFound(_), _) => StatusCode::NOT_FOUND,
            (StarNetworkError::RateLimitExceeded(_), _) => StatusCode::TOO_MANY_REQUESTS,
            (StarNetworkError::AuthError(_), _) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::RemoteFetch) => StatusCode::BAD_GATEWAY,
            (_, ErrorKind::MalformedRecord) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::CacheIo) | (_, ErrorKind::Config) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/me", get(get_profile))
        .route("/users/:login/recommendations", get(get_recommendations))
        .route("/users/:login/similar", get(get_similar_users))
        .route("/cache/purge", post(purge_cache))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Serve the router until ctrl-c
pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

/// Rejects requests without the configured API key. Accepts the key as a
/// bearer token or as the raw header value.
async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(api_key) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h));

    match presented {
        Some(token) if token == api_key => next.run(req).await,
        Some(_) => {
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid API key" }))).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing or invalid Authorization header" })),
        )
            .into_response(),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

async fn get_profile(State(state): State<AppState>) -> Result<impl IntoResponse, StarNetworkError> {
    let profile = state.github.get_authenticated_user().await?;
    Ok(Json(profile))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(login): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<RecommendationsResponse>, StarNetworkError> {
    let report = state.service.recommend(&login).await?;

    let mut truncated = report.truncated;
    let mut recommendations: Vec<ScoredRepo> =
        report.recommendations.iter().map(ScoredRepo::from).collect();
    if let Some(limit) = params.limit {
        if recommendations.len() > limit {
            recommendations.truncate(limit);
            truncated = true;
        }
    }

    Ok(Json(RecommendationsResponse {
        login: report.login,
        neighbors: report.neighbors,
        truncated,
        skipped_records: report.skipped_records,
        failed_neighbors: report.failed_neighbors,
        recommendations,
    }))
}

async fn get_similar_users(
    State(state): State<AppState>,
    Path(login): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<SimilarUsersResponse>, StarNetworkError> {
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_USERS);
    let report = state.service.similar_users(&login, limit).await?;

    Ok(Json(SimilarUsersResponse {
        login: report.login,
        truncated: report.truncated,
        users: report.users,
    }))
}

async fn purge_cache(
    State(state): State<AppState>,
) -> Result<Json<PurgeResponse>, StarNetworkError> {
    let removed = state.service.cache().purge(Utc::now().date_naive()).await?;
    Ok(Json(PurgeResponse { removed }))
}
