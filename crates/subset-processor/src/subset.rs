//! Spatial and temporal subsetting.
//!
//! Coordinates are monotonic, so every selection is one contiguous index
//! range per dimension and the result is computed with a single gather.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use subset_common::{CfDatetime, SubsetError, SubsetResult, TimeBound};
use tracing::debug;

use crate::dataset::{Dataset, DimSelection, LAT_DIM, LON_DIM, TIME_DIM};

/// Bounds for [`subset_bbox`]. Every field is optional; an absent bound
/// keeps the full extent of that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetArgs {
    /// Inclusive start. A partial date starts at the beginning of its period.
    pub start_date: Option<TimeBound>,
    /// Inclusive end. A partial date ends at the end of its period.
    pub end_date: Option<TimeBound>,
    /// `(west, east)` in degrees.
    pub lon_bnds: Option<(f64, f64)>,
    /// Latitude range in degrees, in either order.
    pub lat_bnds: Option<(f64, f64)>,
    /// Return an error instead of an empty dataset.
    pub fail_on_empty: bool,
}

impl SubsetArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and set both time bounds.
    pub fn with_dates(mut self, start: &str, end: &str) -> SubsetResult<Self> {
        let parse = |s: &str| TimeBound::parse(s).map_err(|e| SubsetError::from_time(TIME_DIM, e));
        self.start_date = Some(parse(start)?);
        self.end_date = Some(parse(end)?);
        Ok(self)
    }

    pub fn with_lon_bnds(mut self, west: f64, east: f64) -> Self {
        self.lon_bnds = Some((west, east));
        self
    }

    pub fn with_lat_bnds(mut self, south: f64, north: f64) -> Self {
        self.lat_bnds = Some((south, north));
        self
    }

    pub fn with_fail_on_empty(mut self, fail_on_empty: bool) -> Self {
        self.fail_on_empty = fail_on_empty;
        self
    }
}

/// Subset `ds` to the box and time window in `args`, inclusive on every edge.
///
/// A box that does not intersect the grid gives an empty dataset unless
/// `args.fail_on_empty` is set.
pub fn subset_bbox(ds: &Dataset, args: &SubsetArgs) -> SubsetResult<Dataset> {
    let lon = match args.lon_bnds {
        Some((west, east)) => {
            let (west, east) = align_longitudes(ds.lon(), west, east)?;
            Some(index_range(ds.lon(), west, east))
        }
        None => None,
    };

    let lat = args.lat_bnds.map(|(a, b)| index_range(ds.lat(), a.min(b), a.max(b)));

    let time = time_range(ds, args.start_date.as_ref(), args.end_date.as_ref())?;

    let selection = DimSelection { time, lat, lon };
    let result = ds.isel(&selection);
    debug!(
        time_steps = result.time_len(),
        lat = result.lat().len(),
        lon = result.lon().len(),
        "Subset dataset"
    );

    if args.fail_on_empty && result.is_empty() {
        return Err(SubsetError::NoDataAvailable(format!(
            "selection {:?} does not intersect the dataset",
            selection
        )));
    }
    Ok(result)
}

/// Subset `ds` along time only.
pub fn subset_time(
    ds: &Dataset,
    start: Option<&TimeBound>,
    end: Option<&TimeBound>,
) -> SubsetResult<Dataset> {
    let time = time_range(ds, start, end)?;
    Ok(ds.isel(&DimSelection {
        time,
        ..Default::default()
    }))
}

/// Index range on the time axis for the given bounds, `None` when neither is set.
fn time_range(
    ds: &Dataset,
    start: Option<&TimeBound>,
    end: Option<&TimeBound>,
) -> SubsetResult<Option<Range<usize>>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    let time = ds
        .time()
        .ok_or_else(|| SubsetError::MissingCoordinate(TIME_DIM.to_string()))?;
    let calendar = time.calendar();

    let lower = start
        .map(|b| b.lower(calendar))
        .transpose()
        .map_err(|e| SubsetError::from_time(TIME_DIM, e))?;
    let upper = end
        .map(|b| b.upper(calendar))
        .transpose()
        .map_err(|e| SubsetError::from_time(TIME_DIM, e))?;

    if let (Some(lower), Some(upper)) = (&lower, &upper) {
        if lower > upper {
            return Err(SubsetError::invalid_parameter(
                TIME_DIM,
                format!("start {} is after end {}", lower, upper),
            ));
        }
    }

    let inside = |t: &CfDatetime| {
        lower.as_ref().map_or(true, |l| t >= l) && upper.as_ref().map_or(true, |u| t <= u)
    };
    let values = time.values();
    let first = values.iter().position(inside);
    let range = match first {
        Some(first) => {
            let last = values.iter().rposition(inside).unwrap_or(first);
            first..last + 1
        }
        None => 0..0,
    };
    Ok(Some(range))
}

/// Contiguous index range of the values of a monotonic coordinate within `[lo, hi]`.
fn index_range(coord: &[f64], lo: f64, hi: f64) -> Range<usize> {
    let inside = |v: &f64| *v >= lo && *v <= hi;
    match coord.iter().position(inside) {
        Some(first) => {
            let last = coord.iter().rposition(inside).unwrap_or(first);
            first..last + 1
        }
        None => 0..0,
    }
}

/// Move a longitude box into the convention of the grid.
///
/// A 0..360 grid accepts boxes given entirely in negative longitudes and a
/// -180..180 grid accepts boxes given entirely above 180. Boxes that would
/// wrap around the grid's seam are rejected.
fn align_longitudes(grid: &[f64], west: f64, east: f64) -> SubsetResult<(f64, f64)> {
    if west > east {
        return Err(SubsetError::unsupported(
            "area",
            format!(
                "west ({}) is east of east ({}); boxes crossing the anti-meridian are not supported",
                west, east
            ),
        ));
    }

    let grid_min = grid.iter().copied().fold(f64::INFINITY, f64::min);
    let grid_max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if grid.is_empty() {
        return Ok((west, east));
    }

    let straddles = |seam: f64| west < seam && east > seam;

    if grid_min >= 0.0 && grid_max > 180.0 {
        if east < 0.0 {
            debug!(west, east, "Shifting longitudes by +360 to match a 0..360 grid");
            return Ok((west + 360.0, east + 360.0));
        }
        if straddles(0.0) {
            return Err(SubsetError::unsupported(
                LON_DIM,
                format!(
                    "longitudes ({}, {}) wrap around 0 on a 0..360 grid",
                    west, east
                ),
            ));
        }
    } else if grid_min < 0.0 && grid_max <= 180.0 {
        if west > 180.0 {
            debug!(west, east, "Shifting longitudes by -360 to match a -180..180 grid");
            return Ok((west - 360.0, east - 360.0));
        }
        if straddles(180.0) {
            return Err(SubsetError::unsupported(
                LON_DIM,
                format!(
                    "longitudes ({}, {}) wrap around 180 on a -180..180 grid",
                    west, east
                ),
            ));
        }
    }

    Ok((west, east))
}
