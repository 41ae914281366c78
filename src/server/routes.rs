//! Backend Routes
//!
//! - POST /update_count - Camera reports its latest count
//! - GET /all_data - Latest reading of every camera
//! - GET /health - Service status

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::poller::CameraReading;

/// Camera update request
#[derive(Debug, Deserialize)]
pub struct UpdateCountRequest {
    pub camera_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub people_count: u32,
}

/// Camera update response
#[derive(Debug, Serialize)]
pub struct UpdateCountResponse {
    /// Status: "ok"
    pub status: String,
    pub data: CameraReading,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cameras: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

/// POST /update_count
///
/// Receive data from a camera and store the latest count + location.
pub async fn update_count(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateCountRequest>,
) -> ApiResult<Json<UpdateCountResponse>> {
    validate_update(&req)?;

    let reading = CameraReading {
        people_count: req.people_count,
        latitude: req.latitude,
        longitude: req.longitude,
    };

    state.cameras.write().await.upsert(&req.camera_id, reading);

    tracing::debug!(
        camera_id = %req.camera_id,
        latitude = req.latitude,
        longitude = req.longitude,
        people_count = req.people_count,
        "Camera update"
    );

    Ok(Json(UpdateCountResponse {
        status: "ok".to_string(),
        data: reading,
    }))
}

/// GET /all_data
///
/// Return the latest data from all cameras.
pub async fn all_data(State(state): State<Arc<AppState>>) -> Json<Map<String, Value>> {
    Json(state.cameras.read().await.to_json())
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        cameras: state.cameras.read().await.len(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn validate_update(req: &UpdateCountRequest) -> ApiResult<()> {
    if req.camera_id.trim().is_empty() {
        return Err(ApiError::Validation("camera_id cannot be empty".to_string()));
    }

    if req.camera_id.len() > 100 {
        return Err(ApiError::Validation(
            "camera_id exceeds maximum length of 100 characters".to_string(),
        ));
    }

    if !req.latitude.is_finite() || !req.longitude.is_finite() {
        return Err(ApiError::Validation(
            "latitude and longitude must be finite numbers".to_string(),
        ));
    }

    Ok(())
}
