use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docsearch_core::persist::{load_index, to_js_string};
use docsearch_core::{Category, Combine, SearchEngine, SearchEntry, SearchHit, SearchOptions};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    pub category: Option<String>,
    pub mode: Option<Combine>,
}
fn default_k() -> usize { 10 }

/// Upper bound for `k`; smaller values are raised to 1.
pub const MAX_K: usize = 100;

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct PageSummary {
    pub page: String,
    pub entries: usize,
}

/// Settings normally taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub admin_token: Option<String>,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// `ADMIN_TOKEN` and comma-separated `CORS_ALLOW_ORIGIN`.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ALLOW_ORIGIN")
            .map(|val| val.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Self { admin_token: std::env::var("ADMIN_TOKEN").ok(), cors_origins }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_path: PathBuf,
    /// Replaced as a whole on reload, never edited in place.
    pub engine: Arc<RwLock<Arc<SearchEngine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<SearchEngine> {
        self.engine.read().clone()
    }
}

pub fn build_app(index_path: impl Into<PathBuf>) -> Result<Router> {
    build_app_with(index_path, ServerConfig::from_env())
}

pub fn build_app_with(index_path: impl Into<PathBuf>, config: ServerConfig) -> Result<Router> {
    // Load the artifact at startup
    let index_path = index_path.into();
    let index = load_index(&index_path)?;
    tracing::info!(path = %index_path.display(), entries = index.len(), "loaded search index");
    let engine = Arc::new(SearchEngine::new(Arc::new(index)));
    let app_state = AppState { index_path, engine: Arc::new(RwLock::new(engine)), admin_token: config.admin_token };

    let origins: Vec<_> = config.cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/entry/:n", get(entry_handler))
        .route("/pages", get(pages_handler))
        .route("/search_index.js", get(artifact_handler))
        .route("/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Header carrying the admin token for `/reload`.
pub const ADMIN_HEADER: &str = "x-admin-token";

/// Error body returned by every route as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    /// Reload is disabled because no admin token is configured.
    AdminDisabled,
    Forbidden,
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "no such entry".to_string()),
            ApiError::AdminDisabled => (StatusCode::UNAUTHORIZED, "reload disabled: ADMIN_TOKEN not set".to_string()),
            ApiError::Forbidden => (StatusCode::UNAUTHORIZED, format!("missing or wrong {ADMIN_HEADER}")),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let category = params
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::parse::<Category>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let opts = SearchOptions {
        limit: params.k.clamp(1, MAX_K),
        combine: params.mode.unwrap_or(Combine::And),
        category,
        ..SearchOptions::default()
    };
    let results = state.current().search(&params.q, &opts);
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: results.query,
        took_s: elapsed.as_secs_f64(),
        total_hits: results.total_hits,
        results: results.hits,
    }))
}

pub async fn entry_handler(State(state): State<AppState>, Path(n): Path<usize>) -> Result<Json<SearchEntry>, ApiError> {
    state.current().index().get(n).cloned().map(Json).ok_or(ApiError::NotFound)
}

pub async fn pages_handler(State(state): State<AppState>) -> Json<Vec<PageSummary>> {
    let engine = state.current();
    let index = engine.index();
    let pages = index
        .pages()
        .into_iter()
        .map(|page| PageSummary { page: page.to_string(), entries: index.entries_for_page(page).count() })
        .collect();
    Json(pages)
}

pub async fn artifact_handler(
    State(state): State<AppState>,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let js = to_js_string(state.current().index()).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], js))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(state.admin_token.as_deref(), &headers)?;
    let index = load_index(&state.index_path).map_err(|e| {
        tracing::error!(error = %e, "reload failed");
        ApiError::Unprocessable(format!("{e:#}"))
    })?;
    let entries = index.len();
    let engine = Arc::new(SearchEngine::new(Arc::new(index)));
    *state.engine.write() = engine;
    tracing::info!(entries, "reloaded search index");
    Ok(Json(serde_json::json!({ "entries": entries })))
}

fn require_admin(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = expected.ok_or(ApiError::AdminDisabled)?;
    match headers.get(ADMIN_HEADER).map(|v| v.as_bytes()) {
        Some(given) if given == expected.as_bytes() => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}
