//! Common test fixtures for sky-map tests.

/// Common windows as `(lon_min, lon_max, lat_min, lat_max)`.
pub mod windows {
    /// Whole sphere
    pub const GLOBAL: (f64, f64, f64, f64) = (0.0, 360.0, -90.0, 90.0);

    /// Philippine Sea box used for merged SSH products
    pub const PHILIPPINE_SEA: (f64, f64, f64, f64) = (127.0, 134.0, 18.0, 23.0);

    /// Crosses the 0°/360° seam (Gulf of Guinea)
    pub const GUINEA_WRAP: (f64, f64, f64, f64) = (350.0, 10.0, -10.0, 10.0);

    /// Far from the other windows
    pub const SOUTH_PACIFIC: (f64, f64, f64, f64) = (200.0, 230.0, -40.0, -20.0);
}

/// Common regular lat/lon grids.
pub mod grids {
    /// Regular grid specification with cell-centered axes.
    #[derive(Debug, Clone, Copy)]
    pub struct RegularGrid {
        pub lat_min: f64,
        pub lat_max: f64,
        pub lon_min: f64,
        pub lon_max: f64,
        pub step: f64,
    }

    impl RegularGrid {
        /// Latitude axis.
        pub fn lat(&self) -> Vec<f64> {
            crate::create_axis(self.lat_min, self.lat_max, self.step)
        }

        /// Longitude axis.
        pub fn lon(&self) -> Vec<f64> {
            crate::create_axis(self.lon_min, self.lon_max, self.step)
        }

        /// Total number of grid points.
        pub fn size(&self) -> usize {
            self.lat().len() * self.lon().len()
        }
    }

    /// Global 2° grid (90 x 180)
    pub const GLOBAL_2DEG: RegularGrid = RegularGrid {
        lat_min: -90.0,
        lat_max: 90.0,
        lon_min: 0.0,
        lon_max: 360.0,
        step: 2.0,
    };

    /// Regional 0.125° grid over the Philippine Sea, like DUACS L4 SSH
    pub const PHILIPPINE_SEA_0P125: RegularGrid = RegularGrid {
        lat_min: 18.0,
        lat_max: 23.0,
        lon_min: 127.0,
        lon_max: 134.0,
        step: 0.125,
    };
}
