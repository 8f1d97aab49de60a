//! Map projections: turn stored sensors and zones into the shapes the map
//! client renders, and aggregate statistics across them.
//!
//! Everything here is pure. Time-dependent output takes `now` explicitly.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::{FloodZone, Sensor, WaterLevelLog};
use crate::helpers::{dec_to_f64, time_ago};
use crate::services::classification::{
    risk_color, risk_label, risk_opacity, status_color, status_label, RiskLevel, Status,
};
use crate::services::geometry::{self, Bounds, Coordinate, LatLng, MapBounds};

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn position(sensor: &Sensor) -> LatLng {
    LatLng {
        lat: dec_to_f64(sensor.latitude),
        lng: dec_to_f64(sensor.longitude),
    }
}

// ---------------------------------------------------------------------------
// Map shapes
// ---------------------------------------------------------------------------

/// A sensor as drawn on the map.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorMarker {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub position: LatLng,
    /// safe, warning or danger
    pub status: String,
    /// Indonesian display label (e.g. "Siaga")
    pub status_label: String,
    /// Hex colour for the status
    pub status_color: String,
    /// Water level in cm
    pub water_level: f64,
    pub address: Option<String>,
    pub description: Option<String>,
    /// ISO 8601, null when no reading has been taken
    pub last_reading_at: Option<String>,
    /// Relative time, e.g. "5 minutes ago"
    pub last_reading_at_formatted: Option<String>,
}

/// A flood zone as drawn on the map.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloodZonePolygon {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// `[lat, lng]` vertices in stored order
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<Coordinate>,
    pub risk_level: String,
    pub risk_label: String,
    pub risk_color: String,
    /// Fill colour, custom or risk-level default
    pub color: String,
    pub opacity: f64,
    pub bounds: Bounds,
}

/// Sidebar entry for a sensor.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorListItem {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub status: String,
    pub status_label: String,
    pub status_color: String,
    pub water_level: f64,
    pub address: Option<String>,
    pub position: LatLng,
}

/// Sidebar entry for a flood zone.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneListItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub risk_level: String,
    pub risk_label: String,
    pub risk_color: String,
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<Coordinate>,
    pub bounds: Bounds,
}

pub fn sensor_marker(sensor: &Sensor, now: DateTime<Utc>) -> SensorMarker {
    SensorMarker {
        id: sensor.id,
        name: sensor.name.clone(),
        code: sensor.code.clone(),
        position: position(sensor),
        status: sensor.status.clone(),
        status_label: status_label(&sensor.status).to_string(),
        status_color: status_color(&sensor.status).to_string(),
        water_level: dec_to_f64(sensor.water_level),
        address: sensor.address.clone(),
        description: sensor.description.clone(),
        last_reading_at: sensor.last_reading_at.map(iso),
        last_reading_at_formatted: sensor.last_reading_at.map(|at| time_ago(at, now)),
    }
}

pub fn zone_polygon(zone: &FloodZone) -> FloodZonePolygon {
    FloodZonePolygon {
        id: zone.id,
        name: zone.name.clone(),
        description: zone.description.clone(),
        coordinates: zone.coordinates.0.clone(),
        risk_level: zone.risk_level.clone(),
        risk_label: risk_label(&zone.risk_level).to_string(),
        risk_color: risk_color(&zone.risk_level).to_string(),
        color: zone.color.clone(),
        opacity: risk_opacity(&zone.risk_level),
        bounds: geometry::summarize_bounds(&zone.coordinates),
    }
}

pub fn sensor_list_item(sensor: &Sensor) -> SensorListItem {
    SensorListItem {
        id: sensor.id,
        name: sensor.name.clone(),
        code: sensor.code.clone(),
        status: sensor.status.clone(),
        status_label: status_label(&sensor.status).to_string(),
        status_color: status_color(&sensor.status).to_string(),
        water_level: dec_to_f64(sensor.water_level),
        address: sensor.address.clone(),
        position: position(sensor),
    }
}

pub fn zone_list_item(zone: &FloodZone) -> ZoneListItem {
    ZoneListItem {
        id: zone.id,
        name: zone.name.clone(),
        description: zone.description.clone(),
        risk_level: zone.risk_level.clone(),
        risk_label: risk_label(&zone.risk_level).to_string(),
        risk_color: risk_color(&zone.risk_level).to_string(),
        coordinates: zone.coordinates.0.clone(),
        bounds: geometry::summarize_bounds(&zone.coordinates),
    }
}

/// Mean position of the markers, or the default center when there are none.
pub fn center_of(markers: &[SensorMarker]) -> LatLng {
    let positions: Vec<LatLng> = markers.iter().map(|m| m.position).collect();
    geometry::map_center(&positions)
}

/// Viewport covering every marker and every polygon vertex.
pub fn bounds_of(markers: &[SensorMarker], polygons: &[FloodZonePolygon]) -> MapBounds {
    let sensor_points = markers.iter().map(|m| m.position);
    let zone_points = polygons
        .iter()
        .flat_map(|p| p.coordinates.iter().copied().map(LatLng::from));
    geometry::viewport_bounds(sensor_points.chain(zone_points))
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SensorStats {
    pub total: usize,
    pub safe: usize,
    pub warning: usize,
    pub danger: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ZoneStats {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Combined counts shown on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapStats {
    pub total_sensors: usize,
    pub safe_sensors: usize,
    pub warning_sensors: usize,
    pub danger_sensors: usize,
    pub total_zones: usize,
    pub high_risk_zones: usize,
    pub medium_risk_zones: usize,
    pub low_risk_zones: usize,
    /// Markers matching the request's filters (filtered views only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_sensors: Option<usize>,
    /// Polygons matching the request's filters (filtered views only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_zones: Option<usize>,
}

/// Count sensors by status. Rows with an unrecognised status only count
/// towards the total.
pub fn sensor_stats(sensors: &[Sensor]) -> SensorStats {
    sensors
        .iter()
        .fold(SensorStats::default(), |mut acc, s| {
            acc.total += 1;
            match s.status.parse::<Status>() {
                Ok(Status::Safe) => acc.safe += 1,
                Ok(Status::Warning) => acc.warning += 1,
                Ok(Status::Danger) => acc.danger += 1,
                Err(_) => {}
            }
            acc
        })
}

pub fn zone_stats(zones: &[FloodZone]) -> ZoneStats {
    zones.iter().fold(ZoneStats::default(), |mut acc, z| {
        acc.total += 1;
        match z.risk_level.parse::<RiskLevel>() {
            Ok(RiskLevel::Low) => acc.low += 1,
            Ok(RiskLevel::Medium) => acc.medium += 1,
            Ok(RiskLevel::High) => acc.high += 1,
            Err(_) => {}
        }
        acc
    })
}

pub fn map_stats(sensors: SensorStats, zones: ZoneStats) -> MapStats {
    MapStats {
        total_sensors: sensors.total,
        safe_sensors: sensors.safe,
        warning_sensors: sensors.warning,
        danger_sensors: sensors.danger,
        total_zones: zones.total,
        high_risk_zones: zones.high,
        medium_risk_zones: zones.medium,
        low_risk_zones: zones.low,
        filtered_sensors: None,
        filtered_zones: None,
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorAlert {
    pub id: i64,
    pub name: String,
    pub water_level: f64,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ZoneAlert {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alerts {
    pub danger_sensors: Vec<SensorAlert>,
    pub high_risk_zones: Vec<ZoneAlert>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stats: MapStats,
    pub alerts: Alerts,
    /// True when any active sensor is in danger or any active zone is high risk
    pub has_alerts: bool,
}

/// Build the dashboard from the active danger sensors and high-risk zones.
pub fn dashboard(
    stats: MapStats,
    danger_sensors: &[Sensor],
    high_risk_zones: &[FloodZone],
) -> DashboardSummary {
    let danger_sensors: Vec<SensorAlert> = danger_sensors
        .iter()
        .map(|s| SensorAlert {
            id: s.id,
            name: s.name.clone(),
            water_level: dec_to_f64(s.water_level),
            address: s.address.clone(),
        })
        .collect();
    let high_risk_zones: Vec<ZoneAlert> = high_risk_zones
        .iter()
        .map(|z| ZoneAlert {
            id: z.id,
            name: z.name.clone(),
            description: z.description.clone(),
        })
        .collect();
    let has_alerts = !danger_sensors.is_empty() || !high_risk_zones.is_empty();

    DashboardSummary {
        stats,
        alerts: Alerts {
            danger_sensors,
            high_risk_zones,
        },
        has_alerts,
    }
}

// ---------------------------------------------------------------------------
// CRUD records
// ---------------------------------------------------------------------------

/// A sensor row as returned by the CRUD endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SensorRecord {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub water_level: f64,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub last_reading_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Sensor> for SensorRecord {
    fn from(s: &Sensor) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            code: s.code.clone(),
            latitude: dec_to_f64(s.latitude),
            longitude: dec_to_f64(s.longitude),
            status: s.status.clone(),
            water_level: dec_to_f64(s.water_level),
            address: s.address.clone(),
            description: s.description.clone(),
            is_active: s.is_active,
            last_reading_at: s.last_reading_at.map(iso),
            created_at: iso(s.created_at),
            updated_at: iso(s.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaterLevelLogRecord {
    pub id: i64,
    pub sensor_id: i64,
    pub water_level: f64,
    pub status: String,
    pub recorded_at: String,
}

impl From<&WaterLevelLog> for WaterLevelLogRecord {
    fn from(l: &WaterLevelLog) -> Self {
        Self {
            id: l.id,
            sensor_id: l.sensor_id,
            water_level: dec_to_f64(l.water_level),
            status: l.status.clone(),
            recorded_at: iso(l.recorded_at),
        }
    }
}

/// Sensor record plus its most recent readings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SensorDetail {
    #[serde(flatten)]
    pub sensor: SensorRecord,
    /// Newest first
    pub water_level_logs: Vec<WaterLevelLogRecord>,
}

/// A flood zone row as returned by the CRUD list endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FloodZoneRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<Coordinate>,
    pub risk_level: String,
    pub color: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&FloodZone> for FloodZoneRecord {
    fn from(z: &FloodZone) -> Self {
        Self {
            id: z.id,
            name: z.name.clone(),
            description: z.description.clone(),
            coordinates: z.coordinates.0.clone(),
            risk_level: z.risk_level.clone(),
            color: z.color.clone(),
            is_active: z.is_active,
            created_at: iso(z.created_at),
            updated_at: iso(z.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use sqlx::types::Json;
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 16, 8, 0, 0).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sensor(id: i64, status: &str, level: &str, lat: &str, lng: &str) -> Sensor {
        Sensor {
            id,
            name: format!("Sensor {}", id),
            code: format!("SNS-{:03}", id),
            latitude: Decimal::from_str(lat).unwrap(),
            longitude: Decimal::from_str(lng).unwrap(),
            status: status.to_string(),
            water_level: Decimal::from_str(level).unwrap(),
            address: Some("Jakarta".to_string()),
            description: None,
            is_active: true,
            last_reading_at: Some(now() - Duration::minutes(5)),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn zone(id: i64, risk: &str, coords: Vec<Coordinate>) -> FloodZone {
        FloodZone {
            id,
            name: format!("Zona {}", id),
            description: Some("Rawan banjir".to_string()),
            coordinates: Json(coords),
            risk_level: risk.to_string(),
            color: "#123456".to_string(),
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn square(lat: f64, lng: f64) -> Vec<Coordinate> {
        vec![
            Coordinate(lat, lng),
            Coordinate(lat, lng + 0.01),
            Coordinate(lat - 0.01, lng + 0.01),
            Coordinate(lat - 0.01, lng),
        ]
    }

    #[test]
    fn test_sensor_marker_shape() {
        let s = sensor(1, "warning", "75.50", "-6.20950000", "106.85030000");
        let m = sensor_marker(&s, now());
        assert!(close(m.position.lat, -6.2095));
        assert!(close(m.position.lng, 106.8503));
        assert_eq!(m.water_level, 75.5);
        assert_eq!(m.status_label, "Siaga");
        assert_eq!(m.status_color, "#eab308");
        assert_eq!(m.last_reading_at.as_deref(), Some("2025-12-16T07:55:00.000000Z"));
        assert_eq!(m.last_reading_at_formatted.as_deref(), Some("5 minutes ago"));

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["statusLabel"], "Siaga");
        assert!(json["position"]["lat"].is_f64());
        assert!(json.get("lastReadingAtFormatted").is_some());
    }

    #[test]
    fn test_marker_without_reading() {
        let mut s = sensor(1, "safe", "0", "-6.2", "106.8");
        s.last_reading_at = None;
        let json = serde_json::to_value(sensor_marker(&s, now())).unwrap();
        assert!(json["lastReadingAt"].is_null());
        assert!(json["lastReadingAtFormatted"].is_null());
    }

    #[test]
    fn test_unknown_status_falls_back() {
        let s = sensor(1, "offline", "0", "-6.2", "106.8");
        let m = sensor_marker(&s, now());
        assert_eq!(m.status_color, "#6b7280");
        assert_eq!(m.status_label, "Tidak Diketahui");
    }

    #[test]
    fn test_zone_polygon_shape() {
        let z = zone(3, "high", square(-6.22, 106.86));
        let p = zone_polygon(&z);
        assert_eq!(p.risk_label, "Tinggi");
        assert_eq!(p.risk_color, "#ef4444");
        assert_eq!(p.color, "#123456");
        assert_eq!(p.opacity, 0.5);
        assert_eq!(p.coordinates, square(-6.22, 106.86));
        assert_eq!(p.bounds.north, -6.22);
        assert_eq!(p.bounds.west, 106.86);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["coordinates"][0], serde_json::json!([-6.22, 106.86]));
        assert_eq!(json["riskLevel"], "high");
    }

    #[test]
    fn test_stats_count_by_status_and_risk() {
        let sensors = vec![
            sensor(1, "safe", "10", "-6.2", "106.8"),
            sensor(2, "danger", "150", "-6.2", "106.8"),
            sensor(3, "danger", "130", "-6.2", "106.8"),
            sensor(4, "warning", "60", "-6.2", "106.8"),
        ];
        assert_eq!(
            sensor_stats(&sensors),
            SensorStats {
                total: 4,
                safe: 1,
                warning: 1,
                danger: 2
            }
        );

        let zones = vec![
            zone(1, "high", square(-6.2, 106.8)),
            zone(2, "low", square(-6.2, 106.8)),
        ];
        let z = zone_stats(&zones);
        assert_eq!((z.total, z.high, z.medium, z.low), (2, 1, 0, 1));

        let json = serde_json::to_value(map_stats(sensor_stats(&sensors), z)).unwrap();
        assert_eq!(json["dangerSensors"], 2);
        assert_eq!(json["highRiskZones"], 1);
        assert!(json.get("filteredSensors").is_none());
    }

    #[test]
    fn test_dashboard_has_alerts() {
        let stats = MapStats::default();
        let quiet = dashboard(stats, &[], &[]);
        assert!(!quiet.has_alerts);

        let danger = vec![sensor(2, "danger", "150", "-6.2", "106.8")];
        let d = dashboard(stats, &danger, &[]);
        assert!(d.has_alerts);
        assert_eq!(d.alerts.danger_sensors[0].water_level, 150.0);

        let high = vec![zone(1, "high", square(-6.2, 106.8))];
        let d = dashboard(stats, &[], &high);
        assert!(d.has_alerts);

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["hasAlerts"], true);
        assert_eq!(json["alerts"]["highRiskZones"][0]["description"], "Rawan banjir");
    }

    #[test]
    fn test_center_and_bounds() {
        let markers = vec![
            sensor_marker(&sensor(1, "safe", "0", "-6.2", "106.8"), now()),
            sensor_marker(&sensor(2, "safe", "0", "-6.4", "106.9"), now()),
        ];
        let c = center_of(&markers);
        assert!(close(c.lat, -6.3));
        assert!(close(c.lng, 106.85));

        let polygons = vec![zone_polygon(&zone(1, "low", square(-6.1, 107.1)))];
        let b = bounds_of(&markers, &polygons);
        assert!(close(b.north_east.lat, -6.1));
        assert!(close(b.north_east.lng, 107.11));
        assert!(close(b.south_west.lat, -6.4));
        assert!(close(b.south_west.lng, 106.8));
    }

    #[test]
    fn test_empty_map_uses_defaults() {
        assert_eq!(center_of(&[]), geometry::DEFAULT_CENTER);
        assert_eq!(bounds_of(&[], &[]), geometry::DEFAULT_VIEWPORT);
    }

    #[test]
    fn test_sensor_detail_flattens_record() {
        let s = sensor(7, "danger", "125.00", "-6.2", "106.8");
        let log = WaterLevelLog {
            id: 1,
            sensor_id: 7,
            water_level: Decimal::from_str("125.00").unwrap(),
            status: "danger".to_string(),
            recorded_at: now(),
            created_at: now(),
        };
        let detail = SensorDetail {
            sensor: SensorRecord::from(&s),
            water_level_logs: vec![WaterLevelLogRecord::from(&log)],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["water_level"], 125.0);
        assert_eq!(json["water_level_logs"][0]["status"], "danger");
    }
}
