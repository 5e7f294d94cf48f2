use crate::cache::LoadCache;
use crate::config::ServeConfig;
use crate::loader::{self, LoadError};
use crate::records::{ResultSet, Sample};
use crate::table::{self, PivotTable, TableFilter};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Clone)]
struct AppState {
    root: PathBuf,
    cache: Arc<Mutex<LoadCache>>,
}

pub async fn run(root: PathBuf, config: &ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState {
        root,
        cache: Arc::new(Mutex::new(LoadCache::new())),
    };
    let app = router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("evalboard listening on {local_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/models", get(api_models))
        .route("/api/results", get(api_results))
        .route("/api/pivot", get(api_pivot))
        .route("/api/tasks", get(api_tasks))
        .route("/api/samples", get(api_samples))
        .route("/api/status", get(api_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

async fn api_models(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    loader::discover_models(&state.root)
        .map(Json)
        .map_err(|e| load_error(&e))
}

async fn api_results(State(state): State<AppState>) -> Result<Json<ResultSet>, ApiError> {
    let mut cache = state.cache.lock().await;
    let entry = cache
        .get_or_load(&state.root)
        .map_err(|e| load_error(&e))?;
    Ok(Json(entry.results.clone()))
}

#[derive(Deserialize)]
struct PivotParams {
    models: Option<String>,
    benchmarks: Option<String>,
    languages: Option<String>,
}

async fn api_pivot(
    State(state): State<AppState>,
    Query(params): Query<PivotParams>,
) -> Result<Json<PivotTable>, ApiError> {
    let filter = TableFilter {
        models: split_list(params.models.as_deref()),
        benchmarks: split_list(params.benchmarks.as_deref()),
        languages: split_list(params.languages.as_deref()),
    };

    let mut cache = state.cache.lock().await;
    let entry = cache
        .get_or_load(&state.root)
        .map_err(|e| load_error(&e))?;
    Ok(Json(table::pivot(&entry.results, &filter)))
}

async fn api_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let mut cache = state.cache.lock().await;
    let entry = cache
        .get_or_load(&state.root)
        .map_err(|e| load_error(&e))?;
    let tasks = entry
        .samples
        .iter()
        .map(|(key, samples)| {
            json!({
                "model": key.model,
                "task": key.task,
                "samples": samples.len(),
            })
        })
        .collect();
    Ok(Json(tasks))
}

#[derive(Deserialize)]
struct SampleParams {
    model: Option<String>,
    benchmark: Option<String>,
    language: Option<String>,
}

async fn api_samples(
    State(state): State<AppState>,
    Query(params): Query<SampleParams>,
) -> Result<Json<Vec<Sample>>, ApiError> {
    let model = require(params.model.as_deref(), "model")?;
    let benchmark = require(params.benchmark.as_deref(), "benchmark")?;
    let language = require(params.language.as_deref(), "language")?;

    loader::load_samples_for(&state.root, model, benchmark, language)
        .map(Json)
        .map_err(|e| load_error(&e))
}

async fn api_status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut cache = state.cache.lock().await;
    let entry = cache
        .get_or_load(&state.root)
        .map_err(|e| load_error(&e))?;
    Ok(Json(json!({
        "root": state.root.display().to_string(),
        "loaded_at": entry.loaded_at.to_rfc3339(),
        "records": entry.results.len(),
        "tasks": entry.samples.len(),
    })))
}

/// Comma-separated query value into a filter list; absent means "All".
fn split_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ApiError> {
    value.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("missing query parameter '{name}'")})),
        )
    })
}

fn load_error(e: &LoadError) -> ApiError {
    let status = match e {
        LoadError::ModelNotFound { .. }
        | LoadError::NoSampleFiles { .. }
        | LoadError::NoSamples { .. } => StatusCode::NOT_FOUND,
        LoadError::InvalidRoot { .. } | LoadError::Scan { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": e.to_string()})))
}
