//! CF-convention time decoding (`"<unit> since <reference>"`).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const REFERENCE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn seconds_per(unit: &str) -> Option<f64> {
    match unit.to_lowercase().trim_end_matches('s') {
        "second" | "sec" => Some(1.0),
        "minute" | "min" => Some(60.0),
        "hour" | "hr" => Some(3600.0),
        "day" => Some(86_400.0),
        _ => None,
    }
}

fn parse_reference(reference: &str) -> Option<NaiveDateTime> {
    let reference = reference
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();
    REFERENCE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(reference, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Decode one time value given its CF `units` attribute.
pub fn decode(value: f64, units: &str) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let (unit, reference) = units.split_once(" since ")?;
    let factor = seconds_per(unit.trim())?;
    let base = parse_reference(reference)?;
    let millis = (value * factor * 1000.0).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    let offset = Duration::try_milliseconds(millis as i64)?;
    let instant = base.checked_add_signed(offset)?;
    Some(DateTime::from_naive_utc_and_offset(instant, Utc))
}
