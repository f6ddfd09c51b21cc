//! Common test fixtures for subsetting tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in CMIP5-style climate model output.

/// Common area selections as `(west, south, east, north)`.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Northern Europe, the usual example subset
    pub const NORTHERN_EUROPE: (f64, f64, f64, f64) = (0.0, 49.0, 10.0, 65.0);

    /// Europe using negative longitudes
    pub const EUROPE: (f64, f64, f64, f64) = (-15.0, 35.0, 45.0, 72.0);

    /// Crosses the anti-meridian (west > east)
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);

    /// Southern hemisphere box given north-first
    pub const INVERTED_LAT: (f64, f64, f64, f64) = (100.0, -10.0, 150.0, -40.0);
}

/// Common grid specifications for testing.
pub mod grid {
    use crate::generators::regular_axis;

    /// HadGEM2-ES atmosphere grid (1.25 x 1.875 degrees, 0 to 360 longitudes)
    pub const HADGEM2_ES: GridSpec = GridSpec {
        lat_count: 145,
        lon_count: 192,
        lat_start: -90.0,
        lon_start: 0.0,
        lat_step: 1.25,
        lon_step: 1.875,
    };

    /// Coarse 10-degree grid on -180 to 180 longitudes
    pub const COARSE_10DEG: GridSpec = GridSpec {
        lat_count: 19,
        lon_count: 36,
        lat_start: -90.0,
        lon_start: -180.0,
        lat_step: 10.0,
        lon_step: 10.0,
    };

    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub lat_count: usize,
        pub lon_count: usize,
        pub lat_start: f64,
        pub lon_start: f64,
        pub lat_step: f64,
        pub lon_step: f64,
    }

    impl GridSpec {
        /// Returns the number of cells per time step.
        pub fn size(&self) -> usize {
            self.lat_count * self.lon_count
        }

        /// Latitude coordinate values, ascending.
        pub fn lat(&self) -> Vec<f64> {
            regular_axis(self.lat_start, self.lat_step, self.lat_count)
        }

        /// Longitude coordinate values, ascending.
        pub fn lon(&self) -> Vec<f64> {
            regular_axis(self.lon_start, self.lon_step, self.lon_count)
        }

        /// Bytes of one float32 time step.
        pub fn step_bytes(&self) -> u64 {
            (self.size() * 4) as u64
        }
    }
}

/// Common time values for testing.
pub mod time {
    /// First value of the HadGEM2-ES rcp85 monthly series (360-day calendar)
    pub const RCP85_FIRST: &str = "2005-12-16";

    /// A request start that falls between months of a monthly series
    pub const BETWEEN_MONTHS: &str = "2005-12-01";

    /// End of a typical request range
    pub const RANGE_END: &str = "2030-12-01";

    /// Year-only selector expanding to the whole year
    pub const YEAR_ONLY: &str = "2050";
}

/// Global attributes of model output.
pub mod attributes {
    use serde_json::{json, Map, Value};

    /// CMIP5 global attributes for one ensemble member.
    pub fn cmip5(model_id: &str, experiment_id: &str, frequency: &str) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("project_id".into(), json!("CMIP5"));
        attrs.insert("institute_id".into(), json!("MOHC"));
        attrs.insert("model_id".into(), json!(model_id));
        attrs.insert("experiment_id".into(), json!(experiment_id));
        attrs.insert("frequency".into(), json!(frequency));
        attrs.insert("realization".into(), json!(1));
        attrs.insert("initialization_method".into(), json!(1));
        attrs.insert("physics_version".into(), json!(1));
        attrs
    }

    /// Attributes of the HadGEM2-ES rcp85 monthly run.
    pub fn hadgem2_rcp85_mon() -> Map<String, Value> {
        cmip5("HadGEM2-ES", "rcp85", "mon")
    }

    /// Variable attributes of near-surface air temperature.
    pub fn tas() -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("standard_name".into(), json!("air_temperature"));
        attrs.insert("units".into(), json!("K"));
        attrs.insert("cell_methods".into(), json!("time: mean"));
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_size() {
        assert_eq!(grid::HADGEM2_ES.size(), 145 * 192);
        assert_eq!(grid::HADGEM2_ES.step_bytes(), 145 * 192 * 4);
    }

    #[test]
    fn test_grid_spec_axes() {
        let lon = grid::HADGEM2_ES.lon();
        assert_eq!(lon[0], 0.0);
        assert_eq!(lon[191], 358.125);
        let lat = grid::COARSE_10DEG.lat();
        assert_eq!(lat.first(), Some(&-90.0));
        assert_eq!(lat.last(), Some(&90.0));
    }

    #[test]
    fn test_cmip5_attributes() {
        let attrs = attributes::hadgem2_rcp85_mon();
        assert_eq!(attrs["model_id"], "HadGEM2-ES");
        assert_eq!(attrs["realization"], 1);
    }
}
