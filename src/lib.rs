pub mod aggregator;
pub mod config;
pub mod error;
pub mod github;
pub mod pages;
pub mod querier;
pub mod report;
pub mod source;
pub mod table;
pub mod types;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use config::AppConfig;
use error::StatsError;
use github::GitHubSource;
use querier::StatsQuerier;
use report::ContributorReport;
use serde::{Deserialize, Serialize};
use source::RemoteSource;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use types::RepoId;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ContributorsQuery {
    /// How many days back to look; falls back to the configured default.
    pub days: Option<i64>,
}

/// Shared application state accessible to all request handlers.
pub struct AppState {
    /// Service for running and caching contributor reports.
    pub querier: StatsQuerier,
    /// Application configuration loaded from environment variables.
    pub config: AppConfig,
}

impl AppState {
    /// Initializes the application state against the GitHub API.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let source = GitHubSource::new(config.github_token())?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Initializes the application state against an arbitrary remote source.
    pub fn with_source(config: AppConfig, source: Arc<dyn RemoteSource>) -> Self {
        let querier = StatsQuerier::new(&config, source);
        Self { querier, config }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/repos/{owner}/{repo}/contributors", get(get_contributors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "repo-stats",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_contributors(
    Path(repo_id): Path<RepoId>,
    Query(query): Query<ContributorsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ContributorReport>, (StatusCode, String)> {
    let days = query.days.unwrap_or(state.config.default_lookback_days);

    match state.querier.get(repo_id.clone(), days).await {
        Ok(report) => {
            tracing::debug!(repo_id = %repo_id, days, "Returning contributor report");
            Ok(Json(report.as_ref().clone()))
        }
        Err(e) => {
            tracing::error!("Failed to build contributor report for {}: {}", repo_id, e);
            Err(error_response(&e))
        }
    }
}

/// Maps a failed run to the status code and message returned to clients.
pub fn error_response(err: &StatsError) -> (StatusCode, String) {
    match err {
        StatsError::InvalidOptions(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        StatsError::Cancelled => (
            StatusCode::GATEWAY_TIMEOUT,
            "Report generation timed out".to_string(),
        ),
        StatsError::Transport { source, .. } => {
            if let Some(octocrab::Error::GitHub { source, .. }) =
                source.downcast_ref::<octocrab::Error>()
            {
                let message = source.message.to_lowercase();
                if message.contains("rate limit") {
                    return (
                        StatusCode::TOO_MANY_REQUESTS,
                        "GitHub Rate Limit Exceeded".to_string(),
                    );
                }
                if message.contains("not found") {
                    return (
                        StatusCode::NOT_FOUND,
                        "Repository Not Found".to_string(),
                    );
                }
            }

            (
                StatusCode::BAD_GATEWAY,
                "Failed to fetch data from GitHub".to_string(),
            )
        }
    }
}
