//! Calendar-aware nearest-time resolution.
//!
//! User supplied dates are bound to the dataset's own calendar and snapped
//! to the closest value on the time axis.

use serde::{Deserialize, Serialize};
use subset_common::{Calendar, CfDatetime, SubsetError, SubsetResult, TimeBound};
use tracing::debug;

use crate::dataset::{Dataset, TIME_DIM};

/// Which end of a time range a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    /// Partial dates expand to the start of their period.
    Start,
    /// Partial dates expand to the end of their period.
    End,
}

/// A requested instant together with the coordinate value it was snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnappedTime {
    /// The instant derived from the request.
    pub requested: CfDatetime,
    /// The closest value on the dataset's time axis.
    pub resolved: CfDatetime,
    /// Position of `resolved` on the time axis.
    pub index: usize,
}

impl SnappedTime {
    /// True when the request already named a coordinate value.
    pub fn is_exact(&self) -> bool {
        self.requested == self.resolved
    }
}

/// Calendar of the dataset, read from its first time value.
///
/// Datasets without time information use the standard calendar.
pub fn dataset_calendar(ds: &Dataset) -> Calendar {
    match ds.time() {
        Some(time) => time.first().map_or(time.calendar(), CfDatetime::calendar),
        None => Calendar::Standard,
    }
}

/// Index of the value closest to `target`. Ties go to the earliest index.
pub fn nearest_index(values: &[CfDatetime], target: &CfDatetime) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, value) in values.iter().enumerate() {
        let Some(diff) = value.abs_diff_micros(target) else {
            continue;
        };
        if best.map_or(true, |(_, d)| diff < d) {
            best = Some((i, diff));
        }
    }
    best.map(|(i, _)| i)
}

/// Snap an ISO-8601-like string to the closest time value of `ds`.
///
/// Missing components are filled with the start of the period, so
/// `"2050"` is snapped from `2050-01-01T00:00:00`.
pub fn get_nearest_time(ds: &Dataset, time: &str) -> SubsetResult<SnappedTime> {
    let bound = TimeBound::parse(time).map_err(|e| SubsetError::from_time(TIME_DIM, e))?;
    resolve_bound(ds, &bound, BoundSide::Start)
}

/// Snap one end of a time range to the dataset's time axis.
pub fn resolve_bound(
    ds: &Dataset,
    bound: &TimeBound,
    side: BoundSide,
) -> SubsetResult<SnappedTime> {
    let time = ds
        .time()
        .ok_or_else(|| SubsetError::MissingCoordinate(TIME_DIM.to_string()))?;

    let calendar = dataset_calendar(ds);
    let requested = match side {
        BoundSide::Start => bound.lower(calendar),
        BoundSide::End => bound.upper(calendar),
    }
    .map_err(|e| SubsetError::from_time(TIME_DIM, e))?;

    let index = nearest_index(time.values(), &requested).ok_or_else(|| {
        SubsetError::NoDataAvailable("the dataset's time axis is empty".to_string())
    })?;
    let resolved = time.values()[index];

    if requested != resolved {
        debug!(
            requested = %requested,
            resolved = %resolved,
            calendar = %calendar,
            "Snapped time bound to nearest coordinate value"
        );
    }

    Ok(SnappedTime {
        requested,
        resolved,
        index,
    })
}
