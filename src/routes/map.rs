//! Map view endpoints.
//!
//! - GET /api/map/data?status=&risk_level=&search=
//! - GET /api/map/sensors?status=&search=
//! - GET /api/map/zones?risk_level=&search=
//! - GET /api/map/dashboard
//! - POST /api/map/view-state

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use super::{ApiResponse, AppState};
use crate::errors::{AppError, AppJson, ErrorResponse};
use crate::helpers::{filter_param, search_param};
use crate::services::map::{self, MapData, MapFilter};
use crate::services::projection::{DashboardSummary, SensorListItem, ZoneListItem};
use crate::services::view_state::{MapViewState, ViewTransition};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MapDataQuery {
    /// Sensor status: safe, warning, danger or all
    pub status: Option<String>,
    /// Zone risk level: low, medium, high or all
    pub risk_level: Option<String>,
    /// Matches sensor name, code or address and zone name or description
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SensorListQuery {
    /// safe, warning, danger or all
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ZoneListQuery {
    /// low, medium, high or all
    pub risk_level: Option<String>,
    /// Matches the zone name only
    pub search: Option<String>,
}

/// Filtered markers and polygons with global statistics.
#[utoipa::path(
    get,
    path = "/api/map/data",
    tag = "Map",
    params(MapDataQuery),
    responses(
        (status = 200, description = "Map data; stats also carry the filtered counts", body = ApiResponse<MapData>),
    )
)]
pub async fn get_map_data(
    State(state): State<AppState>,
    Query(query): Query<MapDataQuery>,
) -> Result<Json<ApiResponse<MapData>>, AppError> {
    let filter = MapFilter {
        status: filter_param(query.status),
        risk_level: filter_param(query.risk_level),
        search: search_param(query.search),
    };
    let data = map::filtered(
        state.sensors.as_ref(),
        state.zones.as_ref(),
        filter,
        Utc::now(),
    )
    .await?;
    Ok(Json(ApiResponse::ok(data)))
}

/// Sidebar list of active sensors, ordered by name.
#[utoipa::path(
    get,
    path = "/api/map/sensors",
    tag = "Map",
    params(SensorListQuery),
    responses(
        (status = 200, description = "Sensor sidebar entries", body = ApiResponse<Vec<SensorListItem>>),
    )
)]
pub async fn get_sensor_list(
    State(state): State<AppState>,
    Query(query): Query<SensorListQuery>,
) -> Result<Json<ApiResponse<Vec<SensorListItem>>>, AppError> {
    let items = map::sensor_list(
        state.sensors.as_ref(),
        filter_param(query.status),
        search_param(query.search),
    )
    .await?;
    Ok(Json(ApiResponse::counted(items)))
}

/// Sidebar list of active flood zones, ordered by name.
#[utoipa::path(
    get,
    path = "/api/map/zones",
    tag = "Map",
    params(ZoneListQuery),
    responses(
        (status = 200, description = "Zone sidebar entries", body = ApiResponse<Vec<ZoneListItem>>),
    )
)]
pub async fn get_zone_list(
    State(state): State<AppState>,
    Query(query): Query<ZoneListQuery>,
) -> Result<Json<ApiResponse<Vec<ZoneListItem>>>, AppError> {
    let items = map::zone_list(
        state.zones.as_ref(),
        filter_param(query.risk_level),
        search_param(query.search),
    )
    .await?;
    Ok(Json(ApiResponse::counted(items)))
}

/// Statistics plus sensors in danger and high-risk zones.
#[utoipa::path(
    get,
    path = "/api/map/dashboard",
    tag = "Map",
    responses(
        (status = 200, description = "Dashboard summary", body = ApiResponse<DashboardSummary>),
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardSummary>>, AppError> {
    let summary = map::dashboard(state.sensors.as_ref(), state.zones.as_ref()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// Fold map interactions into a view state.
#[utoipa::path(
    post,
    path = "/api/map/view-state",
    tag = "Map",
    request_body = ViewTransition,
    responses(
        (status = 200, description = "Resulting view state", body = ApiResponse<MapViewState>),
        (status = 422, description = "Unknown event or malformed state", body = ErrorResponse),
    )
)]
pub async fn reduce_view_state(
    AppJson(transition): AppJson<ViewTransition>,
) -> Json<ApiResponse<MapViewState>> {
    Json(ApiResponse::ok(transition.apply()))
}
