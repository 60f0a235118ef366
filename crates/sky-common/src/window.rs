//! Longitude/latitude windows, including windows that cross the date line.

use serde::{Deserialize, Serialize};

/// A geographic selection window in degrees.
///
/// Longitudes are compared on the `[0, 360)` circle. When `lon_min > lon_max`
/// after normalization the window wraps through the seam and covers
/// `[lon_min, 360) ∪ [0, lon_max]`. A longitude span of 360° or more covers
/// every meridian. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLatWindow {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl LonLatWindow {
    /// Create a validated window.
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self, WindowError> {
        let window = Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        };
        window.validate()?;
        Ok(window)
    }

    /// Window covering the whole sphere.
    pub fn global() -> Self {
        Self {
            lon_min: 0.0,
            lon_max: 360.0,
            lat_min: -90.0,
            lat_max: 90.0,
        }
    }

    /// Parse "lon_min,lon_max,lat_min,lat_max".
    pub fn from_arg_string(s: &str) -> Result<Self, WindowError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(WindowError::InvalidFormat(s.to_string()));
        }

        let mut bounds = [0.0f64; 4];
        for (slot, part) in bounds.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| WindowError::InvalidNumber(part.to_string()))?;
        }

        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }

    /// Check the bounds are finite and the latitude range is well formed.
    pub fn validate(&self) -> Result<(), WindowError> {
        let all = [self.lon_min, self.lon_max, self.lat_min, self.lat_max];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(WindowError::Malformed(format!(
                "non-finite bound in {:?}",
                all
            )));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err(WindowError::Malformed(format!(
                "latitude range [{}, {}] outside [-90, 90]",
                self.lat_min, self.lat_max
            )));
        }
        if self.lat_min > self.lat_max {
            return Err(WindowError::Malformed(format!(
                "lat_min {} greater than lat_max {}",
                self.lat_min, self.lat_max
            )));
        }
        Ok(())
    }

    /// True when every meridian is inside the window.
    pub fn covers_all_longitudes(&self) -> bool {
        self.lon_max - self.lon_min >= 360.0
    }

    /// True when the window crosses the 0°/360° seam.
    pub fn wraps_date_line(&self) -> bool {
        !self.covers_all_longitudes()
            && normalize_lon(self.lon_min) > normalize_lon(self.lon_max)
    }

    /// Check a longitude against the window's longitude range.
    pub fn contains_lon(&self, lon: f64) -> bool {
        if self.covers_all_longitudes() {
            return lon.is_finite();
        }
        let lon = normalize_lon(lon);
        let lo = normalize_lon(self.lon_min);
        let hi = normalize_lon(self.lon_max);
        if lo <= hi {
            lon >= lo && lon <= hi
        } else {
            lon >= lo || lon <= hi
        }
    }

    /// Check a latitude against the window's latitude range.
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }

    /// Check if a point is contained within this window.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }
}

/// Map a longitude in degrees onto `[0, 360)`.
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowError {
    #[error("Invalid window format: {0}. Expected 'lon_min,lon_max,lat_min,lat_max'")]
    InvalidFormat(String),

    #[error("Invalid number in window: {0}")]
    InvalidNumber(String),

    #[error("Malformed window: {0}")]
    Malformed(String),
}
