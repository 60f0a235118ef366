//! Configuration for sky-map construction.

use pixelization::{Nside, MAX_NSIDE};
use serde::{Deserialize, Serialize};

use crate::binning::Stat;

/// Default sample count at which binning switches to the rayon path.
pub const DEFAULT_PARALLEL_MIN_SAMPLES: usize = 65_536;

/// Coordinates below this value are treated as fill values in swath files.
pub const DEFAULT_COORD_SENTINEL: f64 = -1e10;

/// Configuration for building sky maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMapConfig {
    /// Statistic used when a request does not name one.
    pub default_stat: Stat,

    /// Inputs with fewer samples than this are binned on the calling thread.
    pub parallel_min_samples: usize,

    /// 2-D coordinate values below this threshold become NaN.
    pub coord_sentinel: f64,

    /// Upper bound for an nside derived from coordinate spacing or a hint.
    pub max_nside: u32,
}

impl Default for SkyMapConfig {
    fn default() -> Self {
        Self {
            default_stat: Stat::Mean,
            parallel_min_samples: DEFAULT_PARALLEL_MIN_SAMPLES,
            coord_sentinel: DEFAULT_COORD_SENTINEL,
            max_nside: 8192,
        }
    }
}

impl SkyMapConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SKYMAP_DEFAULT_STAT") {
            if let Ok(stat) = val.parse() {
                config.default_stat = stat;
            }
        }

        if let Ok(val) = std::env::var("SKYMAP_PARALLEL_MIN_SAMPLES") {
            if let Ok(n) = val.parse() {
                config.parallel_min_samples = n;
            }
        }

        if let Ok(val) = std::env::var("SKYMAP_COORD_SENTINEL") {
            if let Ok(v) = val.parse() {
                config.coord_sentinel = v;
            }
        }

        if let Ok(val) = std::env::var("SKYMAP_MAX_NSIDE") {
            if let Ok(n) = val.parse() {
                config.max_nside = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.parallel_min_samples == 0 {
            return Err("parallel_min_samples must be > 0".to_string());
        }

        if !self.coord_sentinel.is_finite() {
            return Err("coord_sentinel must be finite".to_string());
        }

        if self.max_nside == 0 || !self.max_nside.is_power_of_two() || self.max_nside > MAX_NSIDE {
            return Err(format!(
                "max_nside must be a power of two in [1, {}]",
                MAX_NSIDE
            ));
        }

        Ok(())
    }

    /// `max_nside` as a validated resolution.
    pub fn max_nside(&self) -> Result<Nside, String> {
        Nside::new(self.max_nside).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SkyMapConfig::default();
        assert_eq!(config.default_stat, Stat::Mean);
        assert_eq!(config.parallel_min_samples, 65_536);
        assert_eq!(config.coord_sentinel, -1e10);
        assert_eq!(config.max_nside, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SkyMapConfig::default();
        config.parallel_min_samples = 0;
        assert!(config.validate().is_err());

        config = SkyMapConfig::default();
        config.coord_sentinel = f64::NAN;
        assert!(config.validate().is_err());

        config = SkyMapConfig::default();
        config.max_nside = 1000;
        assert!(config.validate().is_err());
        assert!(config.max_nside().is_err());

        config.max_nside = 1 << 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = SkyMapConfig {
            default_stat: Stat::Median,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"median\""));
        let back: SkyMapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
