//! Sensor HTTP endpoints.
//!
//! - GET    /api/sensors?status=&search=&is_active=&page=
//! - GET    /api/sensors/markers?status=
//! - GET    /api/sensors/:id
//! - POST   /api/sensors
//! - PUT    /api/sensors/:id
//! - PATCH  /api/sensors/:id/status
//! - DELETE /api/sensors/:id

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use super::{ApiResponse, AppState, ListResponse, MessageResponse};
use crate::db::models::{PageRequest, SensorFilter, SortOrder};
use crate::errors::{AppError, AppJson, ErrorResponse};
use crate::helpers::{filter_param, search_param};
use crate::services::projection::{self, SensorDetail, SensorMarker, SensorRecord, SensorStats};
use crate::services::validation::{CreateSensorRequest, RecordReadingRequest, UpdateSensorRequest};
use crate::services::{map, sensors};

const MSG_CREATED: &str = "Sensor berhasil ditambahkan.";
const MSG_UPDATED: &str = "Sensor berhasil diperbarui.";
const MSG_DELETED: &str = "Sensor berhasil dihapus.";
const MSG_READING: &str = "Status sensor berhasil diperbarui.";

#[derive(Debug, Deserialize, IntoParams)]
pub struct SensorListQuery {
    /// safe, warning, danger or all
    pub status: Option<String>,
    /// Case-insensitive match on name, code or address
    pub search: Option<String>,
    /// Only active (true) or inactive (false) sensors
    pub is_active: Option<bool>,
    /// 1-based page number
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MarkerQuery {
    /// safe, warning, danger or all
    pub status: Option<String>,
}

/// Paginated sensor records, ordered by name.
#[utoipa::path(
    get,
    path = "/api/sensors",
    tag = "Sensors",
    params(SensorListQuery),
    responses(
        (status = 200, description = "One page of sensors plus active-set statistics", body = ListResponse<SensorRecord, SensorStats>),
    )
)]
pub async fn list_sensors(
    State(state): State<AppState>,
    Query(query): Query<SensorListQuery>,
) -> Result<Json<ListResponse<SensorRecord, SensorStats>>, AppError> {
    let filter = SensorFilter {
        status: filter_param(query.status),
        search: search_param(query.search),
        is_active: query.is_active,
        order: SortOrder::Name,
    };
    let request = PageRequest::new(query.page, state.page_size);
    let page = sensors::list(state.sensors.as_ref(), &filter, request).await?;
    let stats = sensors::statistics(state.sensors.as_ref()).await?;
    Ok(Json(ListResponse::new(
        page.map(|s| SensorRecord::from(&s)),
        stats,
    )))
}

/// Active sensors as map markers, ordered by id.
#[utoipa::path(
    get,
    path = "/api/sensors/markers",
    tag = "Sensors",
    params(MarkerQuery),
    responses(
        (status = 200, description = "Markers for active sensors", body = ApiResponse<Vec<SensorMarker>>),
    )
)]
pub async fn get_markers(
    State(state): State<AppState>,
    Query(query): Query<MarkerQuery>,
) -> Result<Json<ApiResponse<Vec<SensorMarker>>>, AppError> {
    let markers = map::markers(
        state.sensors.as_ref(),
        filter_param(query.status),
        None,
        Utc::now(),
    )
    .await?;
    Ok(Json(ApiResponse::counted(markers)))
}

/// Sensor record with its most recent readings.
#[utoipa::path(
    get,
    path = "/api/sensors/{id}",
    tag = "Sensors",
    params(
        ("id" = i64, Path, description = "Sensor ID"),
    ),
    responses(
        (status = 200, description = "Sensor with water_level_logs, newest first", body = ApiResponse<SensorDetail>),
        (status = 404, description = "Sensor not found", body = ErrorResponse),
    )
)]
pub async fn get_sensor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SensorDetail>>, AppError> {
    let detail = sensors::detail(state.sensors.as_ref(), id, state.sensor_log_limit).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// Create a sensor.
#[utoipa::path(
    post,
    path = "/api/sensors",
    tag = "Sensors",
    request_body = CreateSensorRequest,
    responses(
        (status = 201, description = "Sensor created", body = ApiResponse<SensorMarker>),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn create_sensor(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateSensorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SensorMarker>>), AppError> {
    let now = Utc::now();
    let sensor = sensors::create(state.sensors.as_ref(), req, now).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            MSG_CREATED,
            projection::sensor_marker(&sensor, now),
        )),
    ))
}

/// Update a sensor. Only the supplied fields change.
#[utoipa::path(
    put,
    path = "/api/sensors/{id}",
    tag = "Sensors",
    params(
        ("id" = i64, Path, description = "Sensor ID"),
    ),
    request_body = UpdateSensorRequest,
    responses(
        (status = 200, description = "Sensor updated", body = ApiResponse<SensorMarker>),
        (status = 404, description = "Sensor not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn update_sensor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdateSensorRequest>,
) -> Result<Json<ApiResponse<SensorMarker>>, AppError> {
    let now = Utc::now();
    let sensor = sensors::update(state.sensors.as_ref(), id, req, now).await?;
    Ok(Json(ApiResponse::with_message(
        MSG_UPDATED,
        projection::sensor_marker(&sensor, now),
    )))
}

/// Record a new water level reading.
///
/// Recomputes the status, stamps `last_reading_at` and appends one log row.
#[utoipa::path(
    patch,
    path = "/api/sensors/{id}/status",
    tag = "Sensors",
    params(
        ("id" = i64, Path, description = "Sensor ID"),
    ),
    request_body = RecordReadingRequest,
    responses(
        (status = 200, description = "Reading recorded", body = ApiResponse<SensorMarker>),
        (status = 404, description = "Sensor not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn record_reading(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<RecordReadingRequest>,
) -> Result<Json<ApiResponse<SensorMarker>>, AppError> {
    let now = Utc::now();
    let sensor = sensors::record_reading(state.sensors.as_ref(), id, req, now).await?;
    Ok(Json(ApiResponse::with_message(
        MSG_READING,
        projection::sensor_marker(&sensor, now),
    )))
}

/// Delete a sensor and its reading history.
#[utoipa::path(
    delete,
    path = "/api/sensors/{id}",
    tag = "Sensors",
    params(
        ("id" = i64, Path, description = "Sensor ID"),
    ),
    responses(
        (status = 200, description = "Sensor deleted", body = MessageResponse),
        (status = 404, description = "Sensor not found", body = ErrorResponse),
    )
)]
pub async fn delete_sensor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    sensors::delete(state.sensors.as_ref(), id).await?;
    Ok(Json(MessageResponse::new(MSG_DELETED)))
}
