//! Synthetic ocean-field generators.
//!
//! These generators create predictable, verifiable data patterns that look
//! enough like satellite SST / SSH products to exercise the binning code.

/// Fill value used by swath products for missing coordinates.
pub const COORD_FILL_VALUE: f64 = -9.969_209_968_386_869e36;

/// Cell-centered axis from `min` to `max` with the given step.
///
/// The first value is `min + step / 2`, so a 2° axis over `[-10, 10]`
/// yields `-9, -7, ..., 9`.
pub fn create_axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let n = ((max - min) / step).round() as usize;
    (0..n).map(|i| min + step * (i as f64 + 0.5)).collect()
}

/// SST in °C as a smooth function of position.
///
/// Warm at the equator (28 °C), cooling towards the poles, with a small
/// zonal ripple so neighbouring columns are distinguishable.
pub fn sst_celsius(lat: f64, lon: f64) -> f64 {
    28.0 - 0.3 * lat.abs() + 0.5 * lon.to_radians().sin()
}

/// Row-major SST grid (latitude rows, longitude columns) in °C.
pub fn create_sst_grid(lat: &[f64], lon: &[f64]) -> Vec<f64> {
    let mut data = Vec::with_capacity(lat.len() * lon.len());
    for &la in lat {
        for &lo in lon {
            data.push(sst_celsius(la, lo));
        }
    }
    data
}

/// Same as [`create_sst_grid`] but in Kelvin.
pub fn create_sst_grid_kelvin(lat: &[f64], lon: &[f64]) -> Vec<f64> {
    create_sst_grid(lat, lon)
        .into_iter()
        .map(|c| c + 273.15)
        .collect()
}

/// Row-major grid where every value is `row * 1000 + col`.
///
/// Makes it easy to check which input sample landed where.
pub fn create_index_grid(rows: usize, cols: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push((row * 1000 + col) as f64);
        }
    }
    data
}

/// Set NaN at the given `(row, col)` positions of a row-major grid.
pub fn with_nans(mut data: Vec<f64>, cols: usize, positions: &[(usize, usize)]) -> Vec<f64> {
    for &(row, col) in positions {
        if let Some(v) = data.get_mut(row * cols + col) {
            *v = f64::NAN;
        }
    }
    data
}

/// A skewed swath of 2-D coordinates, as a satellite track would produce.
///
/// Rows advance northwards by `spacing_deg`; each row is shifted east by
/// `0.3 * spacing_deg` relative to the previous one. Returns row-major
/// `(lat, lon)` arrays of length `rows * cols`.
pub fn create_swath(
    rows: usize,
    cols: usize,
    center_lat: f64,
    center_lon: f64,
    spacing_deg: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut lat = Vec::with_capacity(rows * cols);
    let mut lon = Vec::with_capacity(rows * cols);
    let half_r = rows as f64 / 2.0;
    let half_c = cols as f64 / 2.0;
    for r in 0..rows {
        for c in 0..cols {
            let dr = r as f64 - half_r;
            let dc = c as f64 - half_c;
            lat.push(center_lat + dr * spacing_deg);
            lon.push(center_lon + dc * spacing_deg + dr * 0.3 * spacing_deg);
        }
    }
    (lat, lon)
}

/// Replace coordinates at the given flat indices with [`COORD_FILL_VALUE`].
pub fn with_coord_fill(mut coords: Vec<f64>, indices: &[usize]) -> Vec<f64> {
    for &i in indices {
        if let Some(v) = coords.get_mut(i) {
            *v = COORD_FILL_VALUE;
        }
    }
    coords
}

/// Quality levels cycling through `0..=max_level`, deterministic.
pub fn create_quality_levels(n: usize, max_level: i32) -> Vec<i32> {
    (0..n).map(|i| (i as i32) % (max_level + 1)).collect()
}
