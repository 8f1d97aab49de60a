use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::services::classification::{RiskLevel, Status};
use crate::services::geometry::Coordinate;

/// A water-level monitoring point.
///
/// `status` is stored as text and only recomputed when the water level is
/// written, so it can lag behind other edits.
#[derive(Debug, Clone, FromRow)]
pub struct Sensor {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub status: String,
    /// Water level in cm, two decimal places.
    pub water_level: Decimal,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recorded reading. Append-only; removed only with its sensor.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // created_at populated by FromRow, not exposed
pub struct WaterLevelLog {
    pub id: i64,
    pub sensor_id: i64,
    pub water_level: Decimal,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A flood-risk polygon.
#[derive(Debug, Clone, FromRow)]
pub struct FloodZone {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Ordered `[lat, lng]` vertices, stored as JSONB.
    pub coordinates: Json<Vec<Coordinate>>,
    pub risk_level: String,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Write inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSensor {
    pub name: String,
    pub code: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub status: Status,
    pub water_level: Decimal,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// Partial sensor update. `None` leaves a column untouched; for nullable
/// text columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct SensorChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub status: Option<Status>,
    pub water_level: Option<Decimal>,
    pub address: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// A new reading: updates the sensor and appends one log row.
#[derive(Debug, Clone, Copy)]
pub struct NewReading {
    pub water_level: Decimal,
    pub status: Status,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFloodZone {
    pub name: String,
    pub description: Option<String>,
    pub coordinates: Vec<Coordinate>,
    pub risk_level: RiskLevel,
    pub color: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FloodZoneChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub coordinates: Option<Vec<Coordinate>>,
    pub risk_level: Option<RiskLevel>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Query filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Insertion order (map projections).
    #[default]
    Id,
    /// Alphabetical (lists).
    Name,
}

/// Sensor query. Search is a case-insensitive substring over
/// name, code and address.
#[derive(Debug, Clone, Default)]
pub struct SensorFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub order: SortOrder,
}

impl SensorFilter {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }

    /// In-memory equivalent of the SQL filter.
    #[cfg(test)]
    pub fn matches(&self, sensor: &Sensor) -> bool {
        if let Some(active) = self.is_active {
            if sensor.is_active != active {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &sensor.status != status {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                contains_ci(&sensor.name, term)
                    || contains_ci(&sensor.code, term)
                    || sensor
                        .address
                        .as_deref()
                        .is_some_and(|a| contains_ci(a, term))
            }
            None => true,
        }
    }
}

/// Flood zone query. Search always covers the name; `search_description`
/// extends it to the description.
#[derive(Debug, Clone, Default)]
pub struct FloodZoneFilter {
    pub risk_level: Option<String>,
    pub search: Option<String>,
    pub search_description: bool,
    pub is_active: Option<bool>,
    pub order: SortOrder,
}

impl FloodZoneFilter {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn matches(&self, zone: &FloodZone) -> bool {
        if let Some(active) = self.is_active {
            if zone.is_active != active {
                return false;
            }
        }
        if let Some(risk) = &self.risk_level {
            if &zone.risk_level != risk {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                contains_ci(&zone.name, term)
                    || (self.search_description
                        && zone
                            .description
                            .as_deref()
                            .is_some_and(|d| contains_ci(d, term)))
            }
            None => true,
        }
    }
}

#[cfg(test)]
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of rows plus the unpaginated row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u32 {
        let per_page = i64::from(self.request.per_page);
        let pages = (self.total + per_page - 1) / per_page;
        pages.max(1) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sensor(name: &str, code: &str, address: Option<&str>, status: &str) -> Sensor {
        Sensor {
            id: 1,
            name: name.to_string(),
            code: code.to_string(),
            latitude: Decimal::from_str("-6.2").unwrap(),
            longitude: Decimal::from_str("106.8").unwrap(),
            status: status.to_string(),
            water_level: Decimal::ZERO,
            address: address.map(String::from),
            description: None,
            is_active: true,
            last_reading_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sensor_search_is_case_insensitive_over_name_code_address() {
        let filter = SensorFilter {
            search: Some("jakarta".to_string()),
            ..SensorFilter::default()
        };
        assert!(filter.matches(&sensor("Sensor Jakarta", "A-1", None, "safe")));
        assert!(filter.matches(&sensor("X", "JAKARTA-01", None, "safe")));
        assert!(filter.matches(&sensor("X", "B-2", Some("Jakarta Utara"), "safe")));
        assert!(!filter.matches(&sensor("Sensor Bandung", "BDG-1", Some("Bandung"), "safe")));
    }

    #[test]
    fn test_sensor_status_and_active_filters() {
        let mut s = sensor("A", "A", None, "danger");
        let filter = SensorFilter {
            status: Some("danger".to_string()),
            ..SensorFilter::active()
        };
        assert!(filter.matches(&s));
        s.is_active = false;
        assert!(!filter.matches(&s));
        s.is_active = true;
        s.status = "safe".to_string();
        assert!(!filter.matches(&s));
    }

    #[test]
    fn test_page_request_clamps() {
        let p = PageRequest::new(Some(0), 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 1);
        let p = PageRequest::new(Some(3), 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_last_page() {
        let page = |total| Page::<()> {
            items: vec![],
            total,
            request: PageRequest::new(None, 10),
        };
        assert_eq!(page(0).last_page(), 1);
        assert_eq!(page(10).last_page(), 1);
        assert_eq!(page(11).last_page(), 2);
    }
}
