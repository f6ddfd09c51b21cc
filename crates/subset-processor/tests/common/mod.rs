//! Dataset builders shared by the integration tests.

use subset_processor::{Calendar, Dataset, TimeCoordinate, Variable};
use test_utils::grid::GridSpec;
use test_utils::{
    attributes, create_constant_cube, create_index_cube, create_temperature_cube, daily_times,
    monthly_times,
};

/// HadGEM2-ES resolution over a window around northern Europe.
pub const EUROPE_WINDOW: GridSpec = GridSpec {
    lat_count: 25,
    lon_count: 17,
    lat_start: 40.0,
    lon_start: 0.0,
    lat_step: 1.25,
    lon_step: 1.875,
};

/// A 360-day monthly `tas` series with mid-month (day 16) time values.
///
/// Cell `(t, y, x)` holds its flat index, so slices can be verified.
#[allow(dead_code)]
pub fn monthly_tas(grid: &GridSpec, year: i32, month: u32, steps: usize) -> Dataset {
    let time = TimeCoordinate::new(
        Calendar::Day360,
        monthly_times(Calendar::Day360, year, month, 16, steps),
    )
    .expect("Failed to build time axis");
    let tas = Variable::new(
        "tas",
        &["time", "lat", "lon"],
        vec![steps, grid.lat_count, grid.lon_count],
        create_index_cube(steps, grid.lat_count, grid.lon_count),
    )
    .expect("Failed to build tas")
    .with_attributes(attributes::tas());

    Dataset::new(
        Some(time),
        grid.lat(),
        grid.lon(),
        vec![tas],
        attributes::hadgem2_rcp85_mon(),
    )
    .expect("Failed to build dataset")
}

/// Like [`monthly_tas`] with realistic temperatures and an orography field
/// without a time dimension.
#[allow(dead_code)]
pub fn monthly_tas_with_orog(grid: &GridSpec, year: i32, month: u32, steps: usize) -> Dataset {
    let lat = grid.lat();
    let time = TimeCoordinate::new(
        Calendar::Day360,
        monthly_times(Calendar::Day360, year, month, 16, steps),
    )
    .expect("Failed to build time axis");
    let tas = Variable::new(
        "tas",
        &["time", "lat", "lon"],
        vec![steps, grid.lat_count, grid.lon_count],
        create_temperature_cube(steps, &lat, grid.lon_count),
    )
    .expect("Failed to build tas")
    .with_attributes(attributes::tas());
    let orog = Variable::new(
        "orog",
        &["lat", "lon"],
        vec![grid.lat_count, grid.lon_count],
        vec![100.0f64; grid.size()],
    )
    .expect("Failed to build orog");

    Dataset::new(
        Some(time),
        lat,
        grid.lon(),
        vec![tas, orog],
        attributes::hadgem2_rcp85_mon(),
    )
    .expect("Failed to build dataset")
}

/// A 2001-2200 series split into two parts of 100 years, in reverse order.
#[allow(dead_code)]
pub fn two_century_parts(grid: &GridSpec) -> Vec<Dataset> {
    vec![
        monthly_tas(grid, 2101, 1, 1200),
        monthly_tas(grid, 2001, 1, 1200),
    ]
}

/// A daily series at noon holding `value` everywhere.
#[allow(dead_code)]
pub fn daily_constant(
    grid: &GridSpec,
    calendar: Calendar,
    (year, month, day): (i32, u32, u32),
    steps: usize,
    value: f32,
) -> Dataset {
    let time = TimeCoordinate::new(calendar, daily_times(calendar, year, month, day, steps))
        .expect("Failed to build time axis");
    let tas = Variable::new(
        "tas",
        &["time", "lat", "lon"],
        vec![steps, grid.lat_count, grid.lon_count],
        create_constant_cube(steps, grid.lat_count, grid.lon_count, value),
    )
    .expect("Failed to build tas")
    .with_attributes(attributes::tas());

    let attrs = attributes::cmip5("HadGEM2-ES", "rcp85", "day");
    Dataset::new(Some(time), grid.lat(), grid.lon(), vec![tas], attrs)
        .expect("Failed to build dataset")
}
