//! Test data generators for synthetic climate model output.
//!
//! These generators create predictable, verifiable coordinate axes and
//! data cubes that can be used across the test suite.

use subset_common::{Calendar, CfDatetime};

/// Creates a monthly time axis on `day` of each month.
///
/// # Arguments
///
/// * `calendar` - Calendar of the generated values
/// * `year`, `month` - First month of the series
/// * `day` - Day of month of every value
/// * `count` - Number of months
///
/// # Example
///
/// ```
/// use subset_common::Calendar;
/// use test_utils::monthly_times;
///
/// let times = monthly_times(Calendar::Day360, 2005, 12, 16, 3);
/// assert_eq!(times[2].format_iso(), "2006-02-16T00:00:00");
/// ```
pub fn monthly_times(
    calendar: Calendar,
    year: i32,
    month: u32,
    day: u32,
    count: usize,
) -> Vec<CfDatetime> {
    let first = (year as i64) * 12 + (month as i64 - 1);
    (0..count as i64)
        .map(|i| {
            let m = first + i;
            CfDatetime::from_ymd(calendar, m.div_euclid(12) as i32, (m.rem_euclid(12) + 1) as u32, day)
                .expect("generated monthly date is valid in its calendar")
        })
        .collect()
}

/// Creates a daily time axis at noon, starting at the given date.
pub fn daily_times(calendar: Calendar, year: i32, month: u32, day: u32, count: usize) -> Vec<CfDatetime> {
    let start = CfDatetime::new(calendar, year, month, day, 12, 0, 0, 0)
        .expect("start date is valid in its calendar");
    (0..count as i64)
        .map(|i| {
            start
                .checked_add_micros(i * 86_400_000_000)
                .expect("daily time stays in range")
        })
        .collect()
}

/// Creates an evenly spaced coordinate axis.
///
/// # Example
///
/// ```
/// use test_utils::regular_axis;
///
/// assert_eq!(regular_axis(0.0, 1.875, 3), vec![0.0, 1.875, 3.75]);
/// ```
pub fn regular_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Creates a `(time, lat, lon)` cube whose value is its flat index.
///
/// This makes it easy to verify that slicing picked the right cells:
/// the cell `(t, y, x)` holds `(t * height + y) * width + x`. Exact for
/// cubes below 2^24 elements.
pub fn create_index_cube(steps: usize, height: usize, width: usize) -> Vec<f32> {
    (0..steps * height * width).map(|i| i as f32).collect()
}

/// Creates a `(time, lat, lon)` cube with near-surface temperature in Kelvin.
///
/// Values follow a latitude gradient (warm equator, cold poles) plus a
/// yearly cycle over 12 steps, and stay within 220K to 310K.
pub fn create_temperature_cube(steps: usize, lat: &[f64], width: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(steps * lat.len() * width);
    for step in 0..steps {
        let season = ((step % 12) as f64 / 12.0 * std::f64::consts::TAU).cos();
        for &y in lat {
            let base = 300.0 - 70.0 * (y.to_radians().sin().powi(2));
            let value = base - 5.0 * season * y.to_radians().sin();
            for _ in 0..width {
                data.push(value as f32);
            }
        }
    }
    data
}

/// Creates a cube filled with a constant value.
pub fn create_constant_cube(steps: usize, height: usize, width: usize, value: f32) -> Vec<f32> {
    vec![value; steps * height * width]
}
