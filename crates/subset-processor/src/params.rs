//! Selection parameters and their normalization.
//!
//! Callers describe a selection either with raw values (strings and
//! numbers as typed by a user) or with already validated parameter
//! objects. [`map_params`] turns either form into [`ResolvedBounds`]:
//! time bounds snapped to the dataset and ordered spatial bounds.

use serde::{Deserialize, Serialize};
use subset_common::{AreaValue, BoundingBox, SubsetError, SubsetResult, TimeBound};
use tracing::debug;

use crate::config::SelectorPolicy;
use crate::dataset::{Dataset, TIME_DIM};
use crate::resolver::{resolve_bound, BoundSide, SnappedTime};
use crate::subset::SubsetArgs;

/// A selector given either as raw user input or as a validated parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector<R, V> {
    RawRange(R),
    ValidatedRange(V),
}

/// Time selector: `(start, end)` strings or a [`TimeParameter`].
pub type TimeSelector = Selector<(String, String), TimeParameter>;

/// Area selector: west, south, east, north values or an [`AreaParameter`].
pub type AreaSelector = Selector<Vec<AreaValue>, AreaParameter>;

/// Level selector: lower and upper values or a [`LevelParameter`].
pub type LevelSelector = Selector<Vec<AreaValue>, LevelParameter>;

/// A validated time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeParameter {
    pub start: TimeBound,
    pub end: TimeBound,
}

impl TimeParameter {
    /// Parse both endpoints. Both must be present.
    pub fn parse(start: &str, end: &str) -> SubsetResult<Self> {
        if start.trim().is_empty() || end.trim().is_empty() {
            return Err(SubsetError::invalid_parameter(
                TIME_DIM,
                format!("both start and end are required, got ({:?}, {:?})", start, end),
            ));
        }
        Ok(Self {
            start: TimeBound::parse(start).map_err(|e| SubsetError::from_time(TIME_DIM, e))?,
            end: TimeBound::parse(end).map_err(|e| SubsetError::from_time(TIME_DIM, e))?,
        })
    }

    pub fn new(start: impl Into<TimeBound>, end: impl Into<TimeBound>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A validated bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaParameter {
    pub bbox: BoundingBox,
}

impl AreaParameter {
    /// Parse exactly four values in west, south, east, north order.
    pub fn parse(values: &[AreaValue]) -> SubsetResult<Self> {
        let bbox = BoundingBox::from_values(values).map_err(SubsetError::from_bbox)?;
        Ok(Self { bbox })
    }

    /// Parse a `"west,south,east,north"` string.
    pub fn from_csv(s: &str) -> SubsetResult<Self> {
        let bbox = BoundingBox::from_csv(s).map_err(SubsetError::from_bbox)?;
        Ok(Self { bbox })
    }
}

impl From<BoundingBox> for AreaParameter {
    fn from(bbox: BoundingBox) -> Self {
        Self { bbox }
    }
}

/// A vertical range. Parsed and validated but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParameter {
    pub lower: f64,
    pub upper: f64,
}

impl LevelParameter {
    pub fn parse(values: &[AreaValue]) -> SubsetResult<Self> {
        if values.len() != 2 {
            return Err(SubsetError::invalid_parameter(
                "level",
                format!("expected 2 values, got {}", values.len()),
            ));
        }
        let mut bounds = [0.0; 2];
        for (slot, value) in bounds.iter_mut().zip(values) {
            *slot = value.to_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                SubsetError::invalid_parameter("level", format!("not a number: {}", value))
            })?;
        }
        Ok(Self {
            lower: bounds[0],
            upper: bounds[1],
        })
    }
}

/// The optional selectors of one subsetting request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub time: Option<TimeSelector>,
    pub area: Option<AreaSelector>,
    pub level: Option<LevelSelector>,
}

impl SelectionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a raw `(start, end)` time range.
    pub fn with_time(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.time = Some(Selector::RawRange((start.into(), end.into())));
        self
    }

    /// Select a raw west, south, east, north area.
    pub fn with_area<V: Into<AreaValue>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.area = Some(Selector::RawRange(values.into_iter().map(Into::into).collect()));
        self
    }

    /// Select a raw level range.
    pub fn with_level<V: Into<AreaValue>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.level = Some(Selector::RawRange(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_time_parameter(mut self, time: TimeParameter) -> Self {
        self.time = Some(Selector::ValidatedRange(time));
        self
    }

    pub fn with_area_parameter(mut self, area: AreaParameter) -> Self {
        self.area = Some(Selector::ValidatedRange(area));
        self
    }

    pub fn with_level_parameter(mut self, level: LevelParameter) -> Self {
        self.level = Some(Selector::ValidatedRange(level));
        self
    }

    /// True when no selector is present.
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.area.is_none() && self.level.is_none()
    }
}

/// Canonical bounds for one subsetting call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBounds {
    pub start_date: Option<SnappedTime>,
    pub end_date: Option<SnappedTime>,
    /// `(west, east)`.
    pub lon_bnds: Option<(f64, f64)>,
    /// `(min, max)` latitude.
    pub lat_bnds: Option<(f64, f64)>,
}

impl ResolvedBounds {
    /// Arguments for the subsetter, using the snapped time values.
    pub fn to_subset_args(&self) -> SubsetArgs {
        SubsetArgs {
            start_date: self.start_date.map(|t| TimeBound::Instant(t.resolved)),
            end_date: self.end_date.map(|t| TimeBound::Instant(t.resolved)),
            lon_bnds: self.lon_bnds,
            lat_bnds: self.lat_bnds,
            fail_on_empty: false,
        }
    }
}

/// Validate a request and resolve it against `ds`.
///
/// Every selector is validated before any time snapping happens, so a
/// malformed area is reported even when the time range is fine and
/// nothing is read from the dataset for a rejected request.
pub fn map_params(
    ds: &Dataset,
    request: &SelectionRequest,
    policy: SelectorPolicy,
) -> SubsetResult<ResolvedBounds> {
    if request.is_empty() && policy == SelectorPolicy::Strict {
        return Err(SubsetError::MissingParameter(
            "at least one of time, area or level".to_string(),
        ));
    }

    let time = match &request.time {
        Some(Selector::RawRange((start, end))) => Some(TimeParameter::parse(start, end)?),
        Some(Selector::ValidatedRange(time)) => Some(time.clone()),
        None => None,
    };

    let area = match &request.area {
        Some(Selector::RawRange(values)) => Some(AreaParameter::parse(values)?),
        Some(Selector::ValidatedRange(area)) => Some(*area),
        None => None,
    };
    if let Some(area) = &area {
        if area.bbox.crosses_antimeridian() {
            return Err(SubsetError::unsupported(
                "area",
                format!(
                    "west ({}) is east of east ({}); boxes crossing the anti-meridian are not supported",
                    area.bbox.west, area.bbox.east
                ),
            ));
        }
    }

    let level = match &request.level {
        Some(Selector::RawRange(values)) => Some(LevelParameter::parse(values)?),
        Some(Selector::ValidatedRange(level)) => Some(*level),
        None => None,
    };
    if let Some(level) = level {
        debug!(
            lower = level.lower,
            upper = level.upper,
            "Level selection is not applied"
        );
    }

    let mut bounds = ResolvedBounds::default();
    if let Some(time) = time {
        bounds.start_date = Some(resolve_bound(ds, &time.start, BoundSide::Start)?);
        bounds.end_date = Some(resolve_bound(ds, &time.end, BoundSide::End)?);
    }
    if let Some(area) = area {
        bounds.lon_bnds = Some(area.bbox.lon_bnds());
        bounds.lat_bnds = Some(area.bbox.lat_bnds());
    }

    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attributes, TimeCoordinate};
    use subset_common::{Calendar, CfDatetime};

    /// Monthly 360-day series from 2005-12-16 to 2030-11-16.
    fn cmip5_like() -> Dataset {
        let values = (0..300)
            .map(|i| {
                let months = 11 + i;
                let (year, month) = (2005 + months / 12, (months % 12 + 1) as u32);
                CfDatetime::from_ymd(Calendar::Day360, year, month, 16).unwrap()
            })
            .collect();
        let time = TimeCoordinate::new(Calendar::Day360, values).unwrap();
        Dataset::new(Some(time), vec![0.0], vec![0.0], vec![], Attributes::new()).unwrap()
    }

    #[test]
    fn test_map_params() {
        let ds = cmip5_like();
        let request = SelectionRequest::new()
            .with_time("1999-01-01T00:00:00", "2100-12-30T00:00:00")
            .with_area([-5.0, 49.0, 10.0, 65.0]);

        let args = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap();

        let start = args.start_date.unwrap();
        let end = args.end_date.unwrap();
        assert_eq!(start.resolved.format_iso(), "2005-12-16T00:00:00");
        assert_eq!(end.resolved.format_iso(), "2030-11-16T00:00:00");
        assert_eq!(args.lon_bnds, Some((-5.0, 10.0)));
        assert_eq!(args.lat_bnds, Some((49.0, 65.0)));
    }

    #[test]
    fn test_map_params_partial_dates() {
        let ds = cmip5_like();
        let request = SelectionRequest::new().with_time("1999-01-01", "2100-12");
        let args = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap();
        assert_eq!(args.start_date.unwrap().resolved.format_iso(), "2005-12-16T00:00:00");
        assert_eq!(args.end_date.unwrap().resolved.format_iso(), "2030-11-16T00:00:00");
    }

    #[test]
    fn test_map_params_invalid_time() {
        let ds = cmip5_like();
        let request = SelectionRequest::new().with_time("", "2100");
        let err = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap_err();
        assert_eq!(err.exception_code(), "InvalidParameterValue");
    }

    #[test]
    fn test_map_params_invalid_area() {
        let ds = cmip5_like();

        let short = SelectionRequest::new().with_area([0, 10, 50]);
        assert!(matches!(
            map_params(&ds, &short, SelectorPolicy::Relaxed),
            Err(SubsetError::InvalidParameter { .. })
        ));

        let words = SelectionRequest::new().with_area(vec![
            AreaValue::from("zero"),
            AreaValue::from(49.0),
            AreaValue::from(10.0),
            AreaValue::from(65.0),
        ]);
        assert!(matches!(
            map_params(&ds, &words, SelectorPolicy::Relaxed),
            Err(SubsetError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_map_params_numeric_strings() {
        let ds = cmip5_like();
        let request = SelectionRequest::new().with_area(["0", "10", "50", "60"]);
        let args = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap();
        assert_eq!(args.lon_bnds, Some((0.0, 50.0)));
        assert_eq!(args.lat_bnds, Some((10.0, 60.0)));
        assert!(args.start_date.is_none());
    }

    #[test]
    fn test_map_params_area_checked_before_time() {
        // A bad area must fail even though the time range would need the time axis.
        let ds = Dataset::new(None, vec![0.0], vec![0.0], vec![], Attributes::new()).unwrap();
        let request = SelectionRequest::new()
            .with_time("2000", "2001")
            .with_area(["zero", "1", "2", "3"]);
        assert!(matches!(
            map_params(&ds, &request, SelectorPolicy::Relaxed),
            Err(SubsetError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_map_params_antimeridian_rejected() {
        let ds = cmip5_like();
        let request = SelectionRequest::new().with_area([170.0, -10.0, -170.0, 10.0]);
        let err = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap_err();
        assert!(matches!(err, SubsetError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_map_params_level_is_inert() {
        let ds = cmip5_like();
        let request = SelectionRequest::new().with_level([1000.0, 850.0]);
        assert_eq!(
            map_params(&ds, &request, SelectorPolicy::Strict).unwrap(),
            ResolvedBounds::default()
        );

        let bad = SelectionRequest::new().with_level(["high", "low"]);
        assert!(map_params(&ds, &bad, SelectorPolicy::Relaxed).is_err());
    }

    #[test]
    fn test_selector_policy() {
        let ds = cmip5_like();
        let empty = SelectionRequest::new();

        assert_eq!(
            map_params(&ds, &empty, SelectorPolicy::Relaxed).unwrap(),
            ResolvedBounds::default()
        );
        let err = map_params(&ds, &empty, SelectorPolicy::Strict).unwrap_err();
        assert_eq!(err.exception_code(), "MissingParameterValue");
    }

    #[test]
    fn test_validated_range() {
        let ds = cmip5_like();
        let exact = ds.time().unwrap().values()[24];
        let request = SelectionRequest::new()
            .with_time_parameter(TimeParameter::new(exact, exact))
            .with_area_parameter(BoundingBox::new(0.0, 65.0, 10.0, 49.0).into());

        let args = map_params(&ds, &request, SelectorPolicy::Relaxed).unwrap();
        assert!(args.start_date.unwrap().is_exact());
        assert_eq!(args.end_date.unwrap().index, 24);
        assert_eq!(args.lat_bnds, Some((49.0, 65.0)));
    }
}
