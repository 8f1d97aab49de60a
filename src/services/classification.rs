//! Sensor status and zone risk classification.
//!
//! Status is derived from a water-level reading with fixed, inclusive upper
//! thresholds. Risk level is assigned to a zone by hand and only carries
//! presentation metadata. Both map onto the same three colours but have
//! their own labels; zones additionally get a polygon fill opacity.
//!
//! Stored rows keep status and risk level as text, so the lookups below
//! accept raw strings and fall back to a neutral grey / "Tidak Diketahui"
//! for anything unrecognised.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upper bound (inclusive, cm) of the `safe` band.
pub const SAFE_MAX_CM: f64 = 50.0;
/// Upper bound (inclusive, cm) of the `warning` band.
pub const WARNING_MAX_CM: f64 = 100.0;

pub const COLOR_GREEN: &str = "#22c55e";
pub const COLOR_YELLOW: &str = "#eab308";
pub const COLOR_RED: &str = "#ef4444";
pub const COLOR_UNKNOWN: &str = "#6b7280";
pub const LABEL_UNKNOWN: &str = "Tidak Diketahui";

/// Fill opacity used when a zone's risk level is unrecognised.
const OPACITY_UNKNOWN: f64 = 0.3;

/// Sensor status derived from the latest water level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Safe,
    Warning,
    Danger,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Safe => "safe",
            Status::Warning => "warning",
            Status::Danger => "danger",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Status::Safe => COLOR_GREEN,
            Status::Warning => COLOR_YELLOW,
            Status::Danger => COLOR_RED,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Safe => "Aman",
            Status::Warning => "Siaga",
            Status::Danger => "Bahaya",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Status::Safe),
            "warning" => Ok(Status::Warning),
            "danger" => Ok(Status::Danger),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Flood zone risk level, assigned when the zone is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::Low => COLOR_GREEN,
            RiskLevel::Medium => COLOR_YELLOW,
            RiskLevel::High => COLOR_RED,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Rendah",
            RiskLevel::Medium => "Sedang",
            RiskLevel::High => "Tinggi",
        }
    }

    pub fn opacity(self) -> f64 {
        match self {
            RiskLevel::Low => 0.3,
            RiskLevel::Medium => 0.4,
            RiskLevel::High => 0.5,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

/// Classify a water level (cm) into a sensor status.
///
/// Input is expected to be a finite, non-negative number; that is enforced
/// at the request boundary, not here.
pub fn classify(water_level_cm: f64) -> Status {
    if water_level_cm <= SAFE_MAX_CM {
        Status::Safe
    } else if water_level_cm <= WARNING_MAX_CM {
        Status::Warning
    } else {
        Status::Danger
    }
}

pub fn status_color(raw: &str) -> &'static str {
    raw.parse::<Status>().map(Status::color).unwrap_or(COLOR_UNKNOWN)
}

pub fn status_label(raw: &str) -> &'static str {
    raw.parse::<Status>().map(Status::label).unwrap_or(LABEL_UNKNOWN)
}

pub fn risk_color(raw: &str) -> &'static str {
    raw.parse::<RiskLevel>()
        .map(RiskLevel::color)
        .unwrap_or(COLOR_UNKNOWN)
}

pub fn risk_label(raw: &str) -> &'static str {
    raw.parse::<RiskLevel>()
        .map(RiskLevel::label)
        .unwrap_or(LABEL_UNKNOWN)
}

pub fn risk_opacity(raw: &str) -> f64 {
    raw.parse::<RiskLevel>()
        .map(RiskLevel::opacity)
        .unwrap_or(OPACITY_UNKNOWN)
}

/// Colour assigned to a zone when none is supplied.
///
/// Missing or unrecognised risk levels get red.
pub fn default_zone_color(risk_level: Option<&str>) -> &'static str {
    match risk_level.and_then(|r| r.parse::<RiskLevel>().ok()) {
        Some(level) => level.color(),
        None => COLOR_RED,
    }
}
