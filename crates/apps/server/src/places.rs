use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use foundation::GeoPoint;
use remote::wire::RawBuilding;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::dataset::land_use_at;
use crate::{api_error, AppState};

pub async fn buildings(
    State(state): State<AppState>,
) -> Result<Json<Vec<RawBuilding>>, (StatusCode, Json<Value>)> {
    let buildings = state.dataset.buildings().await.map_err(|e| {
        error!("building fetch failed: {e}");
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;
    Ok(Json(buildings.as_ref().clone()))
}

pub async fn buildings_with_land_use(
    State(state): State<AppState>,
) -> Result<Json<Vec<RawBuilding>>, (StatusCode, Json<Value>)> {
    let buildings = state.dataset.buildings_with_land_use().await.map_err(|e| {
        error!("building fetch failed: {e}");
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;
    Ok(Json(buildings))
}

#[derive(Debug, Deserialize)]
pub struct LandUseParams {
    pub lng: Option<f64>,
    pub lat: Option<f64>,
}

/// `{status: "success", data}` with the district at the point (or null), or
/// `{status: "error", message}`.
pub async fn land_use(
    State(state): State<AppState>,
    Query(params): Query<LandUseParams>,
) -> (StatusCode, Json<Value>) {
    let (Some(lng), Some(lat)) = (params.lng, params.lat) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "lng and lat are required" })),
        );
    };
    let point = GeoPoint::new(lng, lat);
    if !point.is_valid() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "coordinates out of range" })),
        );
    }
    match state.dataset.land_use().await {
        Ok(areas) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "data": land_use_at(&areas, point) })),
        ),
        Err(e) => {
            error!("land-use fetch failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "error", "message": e })),
            )
        }
    }
}
