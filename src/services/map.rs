//! Map-wide views combining sensors and flood zones.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::{FloodZoneFilter, SensorFilter, SortOrder};
use crate::db::repository::{FloodZoneRepository, SensorRepository};
use crate::errors::AppError;
use crate::services::classification::{RiskLevel, Status};
use crate::services::geometry::{LatLng, MapBounds};
use crate::services::projection::{
    self, DashboardSummary, FloodZonePolygon, MapStats, SensorListItem, SensorMarker,
    ZoneListItem,
};

/// Markers, polygons and statistics for one map view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MapData {
    pub markers: Vec<SensorMarker>,
    pub polygons: Vec<FloodZonePolygon>,
    pub stats: MapStats,
}

/// Everything the map page needs on first load.
#[derive(Debug, Clone, Serialize)]
pub struct InitialMap {
    pub data: MapData,
    pub center: LatLng,
    pub bounds: MapBounds,
}

/// Filters accepted by the map endpoints. `None` means no filter.
#[derive(Debug, Clone, Default)]
pub struct MapFilter {
    pub status: Option<String>,
    pub risk_level: Option<String>,
    pub search: Option<String>,
}

fn marker_filter(status: Option<String>, search: Option<String>) -> SensorFilter {
    SensorFilter {
        status,
        search,
        ..SensorFilter::active()
    }
}

fn polygon_filter(risk_level: Option<String>, search: Option<String>) -> FloodZoneFilter {
    FloodZoneFilter {
        risk_level,
        search,
        search_description: true,
        ..FloodZoneFilter::active()
    }
}

/// Active sensors as markers, ordered by id.
pub async fn markers(
    sensors: &dyn SensorRepository,
    status: Option<String>,
    search: Option<String>,
    now: DateTime<Utc>,
) -> Result<Vec<SensorMarker>, AppError> {
    let rows = sensors
        .find_filtered(&marker_filter(status, search))
        .await?;
    Ok(rows
        .iter()
        .map(|s| projection::sensor_marker(s, now))
        .collect())
}

/// Active zones as polygons, ordered by id.
pub async fn polygons(
    zones: &dyn FloodZoneRepository,
    risk_level: Option<String>,
    search: Option<String>,
) -> Result<Vec<FloodZonePolygon>, AppError> {
    let rows = zones
        .find_filtered(&polygon_filter(risk_level, search))
        .await?;
    Ok(rows.iter().map(projection::zone_polygon).collect())
}

/// Global statistics over active sensors and zones.
pub async fn statistics(
    sensors: &dyn SensorRepository,
    zones: &dyn FloodZoneRepository,
) -> Result<MapStats, AppError> {
    let sensor_rows = sensors.find_filtered(&SensorFilter::active()).await?;
    let zone_rows = zones.find_filtered(&FloodZoneFilter::active()).await?;
    Ok(projection::map_stats(
        projection::sensor_stats(&sensor_rows),
        projection::zone_stats(&zone_rows),
    ))
}

/// Filtered markers and polygons. Stats stay global and gain the filtered
/// counts.
pub async fn filtered(
    sensors: &dyn SensorRepository,
    zones: &dyn FloodZoneRepository,
    filter: MapFilter,
    now: DateTime<Utc>,
) -> Result<MapData, AppError> {
    let markers = markers(sensors, filter.status, filter.search.clone(), now).await?;
    let polygons = polygons(zones, filter.risk_level, filter.search).await?;
    let mut stats = statistics(sensors, zones).await?;
    stats.filtered_sensors = Some(markers.len());
    stats.filtered_zones = Some(polygons.len());

    Ok(MapData {
        markers,
        polygons,
        stats,
    })
}

/// Unfiltered map data plus the derived center and viewport.
pub async fn initial(
    sensors: &dyn SensorRepository,
    zones: &dyn FloodZoneRepository,
    now: DateTime<Utc>,
) -> Result<InitialMap, AppError> {
    let markers = markers(sensors, None, None, now).await?;
    let polygons = polygons(zones, None, None).await?;
    let stats = statistics(sensors, zones).await?;
    let center = projection::center_of(&markers);
    let bounds = projection::bounds_of(&markers, &polygons);

    Ok(InitialMap {
        data: MapData {
            markers,
            polygons,
            stats,
        },
        center,
        bounds,
    })
}

/// Sidebar sensor list, ordered by name.
pub async fn sensor_list(
    sensors: &dyn SensorRepository,
    status: Option<String>,
    search: Option<String>,
) -> Result<Vec<SensorListItem>, AppError> {
    let filter = SensorFilter {
        order: SortOrder::Name,
        ..marker_filter(status, search)
    };
    let rows = sensors.find_filtered(&filter).await?;
    Ok(rows.iter().map(projection::sensor_list_item).collect())
}

/// Sidebar zone list, ordered by name. Search covers the name only.
pub async fn zone_list(
    zones: &dyn FloodZoneRepository,
    risk_level: Option<String>,
    search: Option<String>,
) -> Result<Vec<ZoneListItem>, AppError> {
    let filter = FloodZoneFilter {
        search_description: false,
        order: SortOrder::Name,
        ..polygon_filter(risk_level, search)
    };
    let rows = zones.find_filtered(&filter).await?;
    Ok(rows.iter().map(projection::zone_list_item).collect())
}

/// Statistics plus danger sensors and high-risk zones.
pub async fn dashboard(
    sensors: &dyn SensorRepository,
    zones: &dyn FloodZoneRepository,
) -> Result<DashboardSummary, AppError> {
    let stats = statistics(sensors, zones).await?;

    let danger_filter = SensorFilter {
        status: Some(Status::Danger.as_str().to_string()),
        order: SortOrder::Name,
        ..SensorFilter::active()
    };
    let high_filter = FloodZoneFilter {
        risk_level: Some(RiskLevel::High.as_str().to_string()),
        order: SortOrder::Name,
        ..FloodZoneFilter::active()
    };
    let danger = sensors.find_filtered(&danger_filter).await?;
    let high = zones.find_filtered(&high_filter).await?;

    Ok(projection::dashboard(stats, &danger, &high))
}
