//! Shared helpers: Decimal ↔ f64 conversion and human-friendly timestamps.
//!
//! Decimal columns have fixed scales (coordinates 8 places, water level 2
//! places). Incoming f64 values are rounded to the column scale before they
//! are written so that what we classify is what we store.
//!
//! Values a Decimal cannot hold (NaN, ±Inf, magnitudes past ~7.9e28) convert
//! to `None`; callers decide whether that is a validation or internal error.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Scale of the latitude/longitude columns.
pub(crate) const COORDINATE_SCALE: u32 = 8;
/// Scale of the water level columns.
pub(crate) const WATER_LEVEL_SCALE: u32 = 2;

/// Convert an f64 to Decimal rounded half-away-from-zero to `scale` places.
pub(crate) fn f64_to_decimal_scaled(v: f64, scale: u32) -> Option<Decimal> {
    if !v.is_finite() {
        tracing::warn!("f64_to_decimal_scaled received non-finite value {}", v);
        return None;
    }
    match Decimal::from_f64(v) {
        Some(d) => Some(d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)),
        None => {
            tracing::warn!("f64_to_decimal_scaled cannot represent {}", v);
            None
        }
    }
}

pub(crate) fn coordinate_to_decimal(v: f64) -> Option<Decimal> {
    f64_to_decimal_scaled(v, COORDINATE_SCALE)
}

pub(crate) fn water_level_to_decimal(v: f64) -> Option<Decimal> {
    f64_to_decimal_scaled(v, WATER_LEVEL_SCALE)
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Relative description of `at` as seen from `now`, e.g. "5 minutes ago".
///
/// Units step up at 60 seconds, 60 minutes, 24 hours, 7 days, 4 weeks (to
/// months, 30-day) and 12 months. Future instants read "... from now".
pub(crate) fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();

    let (count, unit) = if secs < 60 {
        (secs, "second")
    } else if secs < 3_600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3_600, "hour")
    } else if secs < 7 * 86_400 {
        (secs / 86_400, "day")
    } else if secs < 30 * 86_400 {
        (secs / (7 * 86_400), "week")
    } else if secs < 365 * 86_400 {
        ((secs / (30 * 86_400)).max(1), "month")
    } else {
        (secs / (365 * 86_400), "year")
    };

    let plural = if count == 1 { "" } else { "s" };
    let suffix = if future { "from now" } else { "ago" };
    format!("{} {}{} {}", count, unit, plural, suffix)
}

/// Normalize an optional query filter. Blank values and `all` mean no filter.
pub(crate) fn filter_param(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Normalize an optional search term. Blank means no search.
pub(crate) fn search_param(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Escape text for use inside a double-quoted HTML attribute.
pub(crate) fn escape_html_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
