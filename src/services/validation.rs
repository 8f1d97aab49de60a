//! Request payloads and their boundary validation.
//!
//! Every rule is checked and all failures are collected into a
//! field → messages map (returned as a 422). Messages are Indonesian, like
//! the rest of the user-facing text.
//!
//! String inputs are trimmed and empty strings count as absent.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;

use crate::db::models::{FloodZoneChanges, NewFloodZone, NewSensor, SensorChanges};
use crate::helpers::{coordinate_to_decimal, dec_to_f64, water_level_to_decimal};
use crate::services::classification::{classify, default_zone_color, RiskLevel, Status};
use crate::services::geometry::Coordinate;

/// Minimum number of vertices in a zone polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

const NAME_MAX: usize = 255;
const CODE_MAX: usize = 50;
const ADDRESS_MAX: usize = 500;
const DESCRIPTION_MAX: usize = 1000;
/// Largest level a NUMERIC(8,2) column holds.
pub const WATER_LEVEL_MAX: f64 = 999_999.99;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    // Literal pattern; cannot fail to compile.
    Regex::new(r"^#[a-fA-F0-9]{6}$").unwrap()
});

pub const MSG_CODE_TAKEN: &str = "Kode sensor sudah digunakan.";

// ---------------------------------------------------------------------------
// Error collection
// ---------------------------------------------------------------------------

/// Field → messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// First message, used as the response's top-level message.
    pub fn summary(&self) -> String {
        self.0
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "Data yang diberikan tidak valid.".to_string())
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateSensorRequest {
    /// Display name (required)
    pub name: Option<String>,
    /// Unique short code (required)
    pub code: Option<String>,
    /// Latitude in [-90, 90] (required)
    pub latitude: Option<f64>,
    /// Longitude in [-180, 180] (required)
    pub longitude: Option<f64>,
    /// Initial status; ignored when `water_level` is given
    pub status: Option<String>,
    /// Initial water level in cm, 0 to 999999.99
    pub water_level: Option<f64>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSensorRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Written as-is unless `water_level` is also given
    pub status: Option<String>,
    /// Recomputes `status` when present
    pub water_level: Option<f64>,
    /// `null` clears the address
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecordReadingRequest {
    /// New water level in cm, 0 to 999999.99 (required)
    pub water_level: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateFloodZoneRequest {
    /// Zone name (required)
    pub name: Option<String>,
    pub description: Option<String>,
    /// At least three `[lat, lng]` pairs (required)
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub coordinates: Option<serde_json::Value>,
    /// One of low, medium, high (required)
    pub risk_level: Option<String>,
    /// `#RRGGBB`; defaults by risk level
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateFloodZoneRequest {
    pub name: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// Omit to keep the current polygon
    #[schema(value_type = Option<Vec<Vec<f64>>>)]
    pub coordinates: Option<serde_json::Value>,
    pub risk_level: Option<String>,
    /// `#RRGGBB`; when omitted and `risk_level` changes, reset to its default
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn max_len(errs: &mut ValidationErrors, field: &str, value: &str, max: usize, message: &str) {
    if value.chars().count() > max {
        errs.add(field, message);
    }
}

fn required_text(
    errs: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: usize,
    required_msg: &str,
    max_msg: &str,
) -> Option<String> {
    match clean(value) {
        Some(v) => {
            max_len(errs, field, &v, max, max_msg);
            Some(v)
        }
        None => {
            errs.add(field, required_msg);
            None
        }
    }
}

fn optional_text(
    errs: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: usize,
    max_msg: &str,
) -> Option<String> {
    let v = clean(value)?;
    max_len(errs, field, &v, max, max_msg);
    Some(v)
}

fn check_range(errs: &mut ValidationErrors, field: &str, v: f64, limit: f64, message: &str) -> bool {
    if v.is_finite() && (-limit..=limit).contains(&v) {
        true
    } else {
        errs.add(field, message);
        false
    }
}

fn check_latitude(errs: &mut ValidationErrors, field: &str, v: f64) -> bool {
    check_range(errs, field, v, 90.0, "Latitude harus antara -90 dan 90.")
}

fn check_longitude(errs: &mut ValidationErrors, field: &str, v: f64) -> bool {
    check_range(errs, field, v, 180.0, "Longitude harus antara -180 dan 180.")
}

/// Range-check a level and round it to column scale.
fn check_water_level(errs: &mut ValidationErrors, v: f64) -> Option<Decimal> {
    if !v.is_finite() || v < 0.0 {
        errs.add("water_level", "Ketinggian air tidak boleh negatif.");
        return None;
    }
    let level = if v > WATER_LEVEL_MAX {
        None
    } else {
        water_level_to_decimal(v)
    };
    if level.is_none() {
        errs.add("water_level", "Ketinggian air maksimal 999999.99 cm.");
    }
    level
}

fn parse_status(errs: &mut ValidationErrors, raw: Option<String>) -> Option<Status> {
    let raw = clean(raw)?;
    match raw.parse::<Status>() {
        Ok(s) => Some(s),
        Err(_) => {
            errs.add("status", "Status harus safe, warning, atau danger.");
            None
        }
    }
}

fn parse_risk_level(errs: &mut ValidationErrors, raw: Option<String>, required: bool) -> Option<RiskLevel> {
    let Some(raw) = clean(raw) else {
        if required {
            errs.add("risk_level", "Tingkat risiko harus dipilih.");
        }
        return None;
    };
    match raw.parse::<RiskLevel>() {
        Ok(r) => Some(r),
        Err(_) => {
            errs.add("risk_level", "Tingkat risiko harus low, medium, atau high.");
            None
        }
    }
}

fn parse_color(errs: &mut ValidationErrors, raw: Option<String>) -> Option<String> {
    let raw = clean(raw)?;
    if HEX_COLOR.is_match(&raw) {
        Some(raw)
    } else {
        errs.add("color", "Format warna harus berupa kode hex (contoh: #ff0000).");
        None
    }
}

/// Validate a polygon: an array of at least three `[lat, lng]` number pairs
/// inside global latitude/longitude bounds.
pub fn parse_coordinates(
    errs: &mut ValidationErrors,
    raw: Option<serde_json::Value>,
    required: bool,
) -> Option<Vec<Coordinate>> {
    let raw = match raw {
        Some(serde_json::Value::Null) | None => {
            if required {
                errs.add("coordinates", "Koordinat polygon harus diisi.");
            }
            return None;
        }
        Some(v) => v,
    };

    let Some(points) = raw.as_array() else {
        errs.add("coordinates", "Koordinat harus berupa array.");
        return None;
    };

    if points.len() < MIN_POLYGON_POINTS {
        errs.add(
            "coordinates",
            "Polygon harus memiliki minimal 3 titik koordinat.",
        );
    }

    let mut coords = Vec::with_capacity(points.len());
    let mut ok = true;
    for (i, point) in points.iter().enumerate() {
        let field = format!("coordinates.{}", i);
        let pair = point.as_array().filter(|p| p.len() == 2);
        let Some(pair) = pair else {
            errs.add(field, "Setiap titik koordinat harus berupa pasangan [lat, lng].");
            ok = false;
            continue;
        };
        match (pair[0].as_f64(), pair[1].as_f64()) {
            (Some(lat), Some(lng)) => {
                let lat_ok = check_latitude(errs, &format!("{}.0", field), lat);
                let lng_ok = check_longitude(errs, &format!("{}.1", field), lng);
                if lat_ok && lng_ok {
                    coords.push(Coordinate(lat, lng));
                } else {
                    ok = false;
                }
            }
            _ => {
                errs.add(field, "Koordinat harus berupa angka.");
                ok = false;
            }
        }
    }

    if ok && coords.len() >= MIN_POLYGON_POINTS {
        Some(coords)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Payload → write input
// ---------------------------------------------------------------------------

/// Validate a create-sensor payload. Code uniqueness is checked by the caller.
///
/// When a water level is supplied the status is derived from it and the
/// reading time is set to `now`; otherwise the supplied status (or `safe`)
/// is kept with a zero level.
pub fn sensor_create(
    req: CreateSensorRequest,
    now: DateTime<Utc>,
    errs: &mut ValidationErrors,
) -> Option<NewSensor> {
    let name = required_text(
        errs,
        "name",
        req.name,
        NAME_MAX,
        "Nama sensor harus diisi.",
        "Nama sensor maksimal 255 karakter.",
    );
    let code = required_text(
        errs,
        "code",
        req.code,
        CODE_MAX,
        "Kode sensor harus diisi.",
        "Kode sensor maksimal 50 karakter.",
    );

    let latitude = match req.latitude {
        Some(v) => check_latitude(errs, "latitude", v).then(|| coordinate_to_decimal(v)).flatten(),
        None => {
            errs.add("latitude", "Latitude harus diisi.");
            None
        }
    };
    let longitude = match req.longitude {
        Some(v) => check_longitude(errs, "longitude", v).then(|| coordinate_to_decimal(v)).flatten(),
        None => {
            errs.add("longitude", "Longitude harus diisi.");
            None
        }
    };

    let status = parse_status(errs, req.status);
    let water_level = req.water_level.and_then(|v| check_water_level(errs, v));

    let address = optional_text(errs, "address", req.address, ADDRESS_MAX, "Alamat maksimal 500 karakter.");
    let description = optional_text(
        errs,
        "description",
        req.description,
        DESCRIPTION_MAX,
        "Deskripsi maksimal 1000 karakter.",
    );

    if !errs.is_empty() {
        return None;
    }

    let (status, water_level, last_reading_at) = match water_level {
        Some(level) => (classify(dec_to_f64(level)), level, Some(now)),
        None => (
            status.unwrap_or(Status::Safe),
            Decimal::ZERO,
            None,
        ),
    };

    Some(NewSensor {
        name: name?,
        code: code?,
        latitude: latitude?,
        longitude: longitude?,
        status,
        water_level,
        address,
        description,
        is_active: req.is_active.unwrap_or(true),
        last_reading_at,
    })
}

/// Validate a partial sensor update.
///
/// Status is recomputed only when the payload carries a water level; an
/// update touching other fields leaves the stored status as it was.
pub fn sensor_update(
    req: UpdateSensorRequest,
    now: DateTime<Utc>,
    errs: &mut ValidationErrors,
) -> Option<SensorChanges> {
    let mut changes = SensorChanges::default();

    if req.name.is_some() {
        changes.name = required_text(
            errs,
            "name",
            req.name,
            NAME_MAX,
            "Nama sensor harus diisi.",
            "Nama sensor maksimal 255 karakter.",
        );
    }
    if req.code.is_some() {
        changes.code = required_text(
            errs,
            "code",
            req.code,
            CODE_MAX,
            "Kode sensor harus diisi.",
            "Kode sensor maksimal 50 karakter.",
        );
    }
    if let Some(v) = req.latitude {
        if check_latitude(errs, "latitude", v) {
            changes.latitude = coordinate_to_decimal(v);
        }
    }
    if let Some(v) = req.longitude {
        if check_longitude(errs, "longitude", v) {
            changes.longitude = coordinate_to_decimal(v);
        }
    }

    changes.status = parse_status(errs, req.status);

    if let Some(v) = req.water_level {
        if let Some(level) = check_water_level(errs, v) {
            changes.water_level = Some(level);
            changes.status = Some(classify(dec_to_f64(level)));
            changes.last_reading_at = Some(now);
        }
    }

    if let Some(address) = req.address {
        changes.address = Some(optional_text(
            errs,
            "address",
            address,
            ADDRESS_MAX,
            "Alamat maksimal 500 karakter.",
        ));
    }
    if let Some(description) = req.description {
        changes.description = Some(optional_text(
            errs,
            "description",
            description,
            DESCRIPTION_MAX,
            "Deskripsi maksimal 1000 karakter.",
        ));
    }
    changes.is_active = req.is_active;

    errs.is_empty().then_some(changes)
}

/// Validate a new reading and return the level rounded to column scale.
pub fn reading(req: RecordReadingRequest, errs: &mut ValidationErrors) -> Option<Decimal> {
    match req.water_level {
        Some(v) => check_water_level(errs, v),
        None => {
            errs.add("water_level", "Ketinggian air harus diisi.");
            None
        }
    }
}

/// Validate a create-zone payload. A missing colour defaults by risk level.
pub fn zone_create(req: CreateFloodZoneRequest, errs: &mut ValidationErrors) -> Option<NewFloodZone> {
    let name = required_text(
        errs,
        "name",
        req.name,
        NAME_MAX,
        "Nama zona harus diisi.",
        "Nama zona maksimal 255 karakter.",
    );
    let description = optional_text(
        errs,
        "description",
        req.description,
        DESCRIPTION_MAX,
        "Deskripsi maksimal 1000 karakter.",
    );
    let coordinates = parse_coordinates(errs, req.coordinates, true);
    let risk_level = parse_risk_level(errs, req.risk_level, true);
    let color = parse_color(errs, req.color);

    if !errs.is_empty() {
        return None;
    }

    let risk_level = risk_level?;
    Some(NewFloodZone {
        name: name?,
        description,
        coordinates: coordinates?,
        risk_level,
        color: color.unwrap_or_else(|| default_zone_color(Some(risk_level.as_str())).to_string()),
        is_active: req.is_active.unwrap_or(true),
    })
}

/// Validate a partial zone update. Changing the risk level without a colour
/// resets the colour to that level's default.
pub fn zone_update(req: UpdateFloodZoneRequest, errs: &mut ValidationErrors) -> Option<FloodZoneChanges> {
    let mut changes = FloodZoneChanges::default();

    if req.name.is_some() {
        changes.name = required_text(
            errs,
            "name",
            req.name,
            NAME_MAX,
            "Nama zona harus diisi.",
            "Nama zona maksimal 255 karakter.",
        );
    }
    if let Some(description) = req.description {
        changes.description = Some(optional_text(
            errs,
            "description",
            description,
            DESCRIPTION_MAX,
            "Deskripsi maksimal 1000 karakter.",
        ));
    }
    changes.coordinates = parse_coordinates(errs, req.coordinates, false);
    if req.risk_level.is_some() {
        changes.risk_level = parse_risk_level(errs, req.risk_level, true);
    }
    changes.color = parse_color(errs, req.color);
    if changes.color.is_none() {
        changes.color = changes
            .risk_level
            .map(|r| default_zone_color(Some(r.as_str())).to_string());
    }
    changes.is_active = req.is_active;

    errs.is_empty().then_some(changes)
}
