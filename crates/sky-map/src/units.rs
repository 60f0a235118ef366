//! Temperature unit handling.

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert Kelvin values to °C. NaN stays NaN.
pub fn kelvin_to_celsius(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v - KELVIN_OFFSET).collect()
}

/// Whether a CF `units` attribute denotes Kelvin.
pub fn is_kelvin(units: &str) -> bool {
    matches!(
        units.trim().to_lowercase().as_str(),
        "k" | "kelvin" | "kelvins" | "degk" | "deg_k" | "degrees_k"
    )
}
