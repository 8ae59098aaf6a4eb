//! HTTP backend: building dataset proxy, land-use lookup, phrase-based
//! filter evaluation and saved filter sets.

pub mod config;
pub mod dataset;
pub mod filtering;
pub mod persistence;
pub mod places;
pub mod query;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use catalog::FilterSetStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dataset::Dataset;

pub type SharedFilterSets = Arc<Mutex<Box<dyn FilterSetStore + Send>>>;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub filter_sets: SharedFilterSets,
}

impl AppState {
    pub fn new(dataset: Dataset, filter_sets: impl FilterSetStore + Send + 'static) -> Self {
        Self {
            dataset: Arc::new(dataset),
            filter_sets: Arc::new(Mutex::new(Box::new(filter_sets))),
        }
    }
}

pub fn router(state: AppState, cors_origin: Option<&str>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);
    let cors = match cors_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(err)) => {
            warn!("ignoring invalid CORS origin: {err}");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/buildings", get(places::buildings))
        .route(
            "/api/buildings-with-land-use",
            get(places::buildings_with_land_use),
        )
        .route("/api/land-use", get(places::land_use))
        .route("/api/filter-buildings", post(filtering::filter_buildings))
        .route("/api/filters/save", post(persistence::save))
        .route("/api/filters/load", get(persistence::load))
        .route("/api/filters/list", get(persistence::list))
        .route("/api/filters/delete", delete(persistence::delete))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
