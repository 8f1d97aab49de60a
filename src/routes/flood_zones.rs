//! Flood zone HTTP endpoints.
//!
//! - GET    /api/flood-zones?risk_level=&search=&is_active=&page=
//! - GET    /api/flood-zones/polygons?risk_level=&search=
//! - GET    /api/flood-zones/:id
//! - POST   /api/flood-zones
//! - PUT    /api/flood-zones/:id
//! - DELETE /api/flood-zones/:id

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use super::{ApiResponse, AppState, ListResponse, MessageResponse};
use crate::db::models::{FloodZoneFilter, PageRequest, SortOrder};
use crate::errors::{AppError, AppJson, ErrorResponse};
use crate::helpers::{filter_param, search_param};
use crate::services::projection::{self, FloodZonePolygon, FloodZoneRecord, ZoneStats};
use crate::services::validation::{CreateFloodZoneRequest, UpdateFloodZoneRequest};
use crate::services::{flood_zones, map};

const MSG_CREATED: &str = "Zona banjir berhasil ditambahkan.";
const MSG_UPDATED: &str = "Zona banjir berhasil diperbarui.";
const MSG_DELETED: &str = "Zona banjir berhasil dihapus.";

#[derive(Debug, Deserialize, IntoParams)]
pub struct ZoneListQuery {
    /// low, medium, high or all
    pub risk_level: Option<String>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// 1-based page number
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PolygonQuery {
    /// low, medium, high or all
    pub risk_level: Option<String>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

/// Paginated flood zone records, ordered by name.
#[utoipa::path(
    get,
    path = "/api/flood-zones",
    tag = "Flood Zones",
    params(ZoneListQuery),
    responses(
        (status = 200, description = "One page of zones plus active-set statistics", body = ListResponse<FloodZoneRecord, ZoneStats>),
    )
)]
pub async fn list_zones(
    State(state): State<AppState>,
    Query(query): Query<ZoneListQuery>,
) -> Result<Json<ListResponse<FloodZoneRecord, ZoneStats>>, AppError> {
    let filter = FloodZoneFilter {
        risk_level: filter_param(query.risk_level),
        search: search_param(query.search),
        search_description: true,
        is_active: query.is_active,
        order: SortOrder::Name,
    };
    let request = PageRequest::new(query.page, state.page_size);
    let page = flood_zones::list(state.zones.as_ref(), &filter, request).await?;
    let stats = flood_zones::statistics(state.zones.as_ref()).await?;
    Ok(Json(ListResponse::new(
        page.map(|z| FloodZoneRecord::from(&z)),
        stats,
    )))
}

/// Active zones as map polygons, ordered by id.
#[utoipa::path(
    get,
    path = "/api/flood-zones/polygons",
    tag = "Flood Zones",
    params(PolygonQuery),
    responses(
        (status = 200, description = "Polygons for active zones", body = ApiResponse<Vec<FloodZonePolygon>>),
    )
)]
pub async fn get_polygons(
    State(state): State<AppState>,
    Query(query): Query<PolygonQuery>,
) -> Result<Json<ApiResponse<Vec<FloodZonePolygon>>>, AppError> {
    let polygons = map::polygons(
        state.zones.as_ref(),
        filter_param(query.risk_level),
        search_param(query.search),
    )
    .await?;
    Ok(Json(ApiResponse::counted(polygons)))
}

#[utoipa::path(
    get,
    path = "/api/flood-zones/{id}",
    tag = "Flood Zones",
    params(
        ("id" = i64, Path, description = "Flood zone ID"),
    ),
    responses(
        (status = 200, description = "Zone as a map polygon", body = ApiResponse<FloodZonePolygon>),
        (status = 404, description = "Flood zone not found", body = ErrorResponse),
    )
)]
pub async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FloodZonePolygon>>, AppError> {
    let zone = flood_zones::get(state.zones.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok(projection::zone_polygon(&zone))))
}

/// Create a flood zone. A missing colour defaults by risk level.
#[utoipa::path(
    post,
    path = "/api/flood-zones",
    tag = "Flood Zones",
    request_body = CreateFloodZoneRequest,
    responses(
        (status = 201, description = "Zone created", body = ApiResponse<FloodZonePolygon>),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn create_zone(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateFloodZoneRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FloodZonePolygon>>), AppError> {
    let zone = flood_zones::create(state.zones.as_ref(), req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            MSG_CREATED,
            projection::zone_polygon(&zone),
        )),
    ))
}

/// Update a flood zone. Only the supplied fields change.
#[utoipa::path(
    put,
    path = "/api/flood-zones/{id}",
    tag = "Flood Zones",
    params(
        ("id" = i64, Path, description = "Flood zone ID"),
    ),
    request_body = UpdateFloodZoneRequest,
    responses(
        (status = 200, description = "Zone updated", body = ApiResponse<FloodZonePolygon>),
        (status = 404, description = "Flood zone not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn update_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdateFloodZoneRequest>,
) -> Result<Json<ApiResponse<FloodZonePolygon>>, AppError> {
    let zone = flood_zones::update(state.zones.as_ref(), id, req).await?;
    Ok(Json(ApiResponse::with_message(
        MSG_UPDATED,
        projection::zone_polygon(&zone),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/flood-zones/{id}",
    tag = "Flood Zones",
    params(
        ("id" = i64, Path, description = "Flood zone ID"),
    ),
    responses(
        (status = 200, description = "Zone deleted", body = MessageResponse),
        (status = 404, description = "Flood zone not found", body = ErrorResponse),
    )
)]
pub async fn delete_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    flood_zones::delete(state.zones.as_ref(), id).await?;
    Ok(Json(MessageResponse::new(MSG_DELETED)))
}
