//! Quality-control masks for satellite L2/L3 products.
//!
//! A mask is `true` where a sample is unusable. It is the union of three
//! tests: the value is NaN, the quality flag fails the threshold, or the
//! value lies outside the physical bounds.

use serde::{Deserialize, Serialize};
use sky_map::units::KELVIN_OFFSET;

use crate::error::{FieldIoError, FieldIoResult};

/// Default name of the per-sample quality flag variable.
pub const QUALITY_VARIABLE: &str = "quality_level";

/// Quality-control policy for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityControl {
    /// Variable holding the quality flags.
    pub flag_variable: String,

    /// Flag threshold. `None` disables the flag test.
    pub threshold: Option<f64>,

    /// When true flags above `threshold` are bad, otherwise flags below it.
    pub higher_is_worse: bool,

    /// Valid `(lower, upper]` range in the field's own units.
    pub value_bounds: Option<(f64, f64)>,
}

impl QualityControl {
    /// SST in °C: flags above 2 are bad, valid range (−2, 33].
    pub fn sst_celsius() -> Self {
        Self {
            flag_variable: QUALITY_VARIABLE.to_string(),
            threshold: Some(2.0),
            higher_is_worse: true,
            value_bounds: Some((-2.0, 33.0)),
        }
    }

    /// [`QualityControl::sst_celsius`] with bounds expressed in Kelvin.
    pub fn sst_kelvin() -> Self {
        Self {
            value_bounds: Some((-2.0 + KELVIN_OFFSET, 33.0 + KELVIN_OFFSET)),
            ..Self::sst_celsius()
        }
    }

    /// GHRSST preset for a sensor name, matched case-insensitively.
    ///
    /// AMSR2 rejects quality levels below 2; VIIRS and AHI reject levels
    /// below 5.
    pub fn for_sensor(sensor: &str) -> Option<Self> {
        let threshold = match sensor.trim().to_uppercase().as_str() {
            "AMSR2" => 2.0,
            "VIIRS" | "AHI" => 5.0,
            _ => return None,
        };
        Some(Self {
            flag_variable: QUALITY_VARIABLE.to_string(),
            threshold: Some(threshold),
            higher_is_worse: false,
            value_bounds: None,
        })
    }

    fn flag_is_bad(&self, flag: f64) -> bool {
        match self.threshold {
            // a missing flag never vouches for a sample
            Some(_) if flag.is_nan() => true,
            Some(t) if self.higher_is_worse => flag > t,
            Some(t) => flag < t,
            None => false,
        }
    }

    fn value_is_bad(&self, value: f64) -> bool {
        match self.value_bounds {
            Some((lo, hi)) => value <= lo || value > hi,
            None => false,
        }
    }

    /// Build the mask for `values`, with optional per-sample `flags`.
    pub fn build_mask(&self, values: &[f64], flags: Option<&[f64]>) -> FieldIoResult<Vec<bool>> {
        if let Some(flags) = flags {
            if flags.len() != values.len() {
                return Err(FieldIoError::invalid_format(format!(
                    "{} has {} entries for {} values",
                    self.flag_variable,
                    flags.len(),
                    values.len()
                )));
            }
        }

        Ok(values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                v.is_nan()
                    || flags.map(|f| self.flag_is_bad(f[i])).unwrap_or(false)
                    || self.value_is_bad(v)
            })
            .collect())
    }
}
