//! In-memory gridded dataset model.
//!
//! A [`Dataset`] holds an optional calendar-aware time axis, regular
//! latitude/longitude axes and a set of row-major variables. Datasets are
//! immutable once built; subsetting produces new datasets.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use subset_common::{Calendar, CfDatetime, PartialDate, SubsetError, SubsetResult};

/// Free-form attributes attached to datasets and variables.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

pub const TIME_DIM: &str = "time";
pub const LAT_DIM: &str = "lat";
pub const LON_DIM: &str = "lon";

/// Element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
    Float64,
}

impl DataType {
    /// Width of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

/// Row-major element storage of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl VariableData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
        }
    }

    /// Values widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Float64(v) => v.clone(),
        }
    }

    fn gather(&self, shape: &[usize], ranges: &[Range<usize>]) -> Self {
        match self {
            Self::Float32(v) => Self::Float32(gather(v, shape, ranges)),
            Self::Float64(v) => Self::Float64(gather(v, shape, ranges)),
        }
    }

    fn concat(parts: &[&VariableData]) -> SubsetResult<Self> {
        match parts.first() {
            Some(VariableData::Float32(_)) => {
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        VariableData::Float32(v) => out.extend_from_slice(v),
                        _ => return Err(SubsetError::invalid_dataset("mixed data types across parts")),
                    }
                }
                Ok(Self::Float32(out))
            }
            Some(VariableData::Float64(_)) => {
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        VariableData::Float64(v) => out.extend_from_slice(v),
                        _ => return Err(SubsetError::invalid_dataset("mixed data types across parts")),
                    }
                }
                Ok(Self::Float64(out))
            }
            None => Err(SubsetError::invalid_dataset("nothing to concatenate")),
        }
    }
}

impl From<Vec<f32>> for VariableData {
    fn from(v: Vec<f32>) -> Self {
        Self::Float32(v)
    }
}

impl From<Vec<f64>> for VariableData {
    fn from(v: Vec<f64>) -> Self {
        Self::Float64(v)
    }
}

/// Copy the hyper-rectangle `ranges` out of a row-major array of `shape`.
fn gather<T: Copy>(data: &[T], shape: &[usize], ranges: &[Range<usize>]) -> Vec<T> {
    let out_len: usize = ranges.iter().map(|r| r.len()).product();
    let mut out = Vec::with_capacity(out_len);
    if out_len == 0 {
        return out;
    }

    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }

    // The innermost axis is copied as one contiguous run.
    let Some(inner) = ranges.last() else {
        out.push(data[0]);
        return out;
    };
    let outer = &ranges[..ranges.len() - 1];
    let mut counter: Vec<usize> = outer.iter().map(|r| r.start).collect();

    loop {
        let base: usize = counter
            .iter()
            .zip(&strides)
            .map(|(&i, &stride)| i * stride)
            .sum();
        out.extend_from_slice(&data[base + inner.start..base + inner.end]);

        let mut axis = outer.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < outer[axis].end {
                break;
            }
            counter[axis] = outer[axis].start;
        }
    }
}

/// A named array over some of the dataset's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    dims: Vec<String>,
    shape: Vec<usize>,
    data: VariableData,
    attributes: Attributes,
}

impl Variable {
    /// Create a variable, checking that the data fills the shape exactly.
    pub fn new(
        name: impl Into<String>,
        dims: &[&str],
        shape: Vec<usize>,
        data: impl Into<VariableData>,
    ) -> SubsetResult<Self> {
        let name = name.into();
        let data = data.into();

        if dims.len() != shape.len() {
            return Err(SubsetError::invalid_dataset(format!(
                "variable '{}' has {} dimensions but a shape of rank {}",
                name,
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(SubsetError::invalid_dataset(format!(
                "variable '{}' has {} values, shape {:?} needs {}",
                name,
                data.len(),
                shape,
                expected
            )));
        }

        Ok(Self {
            name,
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape,
            data,
            attributes: Attributes::new(),
        })
    }

    /// Attach attributes (units, long_name...).
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &VariableData {
        &self.data
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of a dimension in this variable's shape.
    pub fn dim_index(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dim_index(dim).is_some()
    }

    /// Cell-boundary variables such as `time_bnds` or `lat_bounds`.
    pub fn is_bounds(&self) -> bool {
        self.name.ends_with("_bnds") || self.name.ends_with("_bounds")
    }

    fn select(&self, selection: &DimSelection) -> Self {
        let ranges: Vec<Range<usize>> = self
            .dims
            .iter()
            .zip(&self.shape)
            .map(|(dim, &len)| selection.range_for(dim).unwrap_or(0..len))
            .collect();
        let shape = ranges.iter().map(|r| r.len()).collect();
        Self {
            name: self.name.clone(),
            dims: self.dims.clone(),
            data: self.data.gather(&self.shape, &ranges),
            shape,
            attributes: self.attributes.clone(),
        }
    }
}

/// Index ranges along the named dimensions; unnamed dimensions are kept whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimSelection {
    pub time: Option<Range<usize>>,
    pub lat: Option<Range<usize>>,
    pub lon: Option<Range<usize>>,
}

impl DimSelection {
    fn range_for(&self, dim: &str) -> Option<Range<usize>> {
        match dim {
            TIME_DIM => self.time.clone(),
            LAT_DIM => self.lat.clone(),
            LON_DIM => self.lon.clone(),
            _ => None,
        }
    }
}

/// A calendar-aware time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCoordinate {
    values: Vec<CfDatetime>,
    calendar: Calendar,
}

impl TimeCoordinate {
    /// Create a time axis. Every value must use `calendar` and the values
    /// must not decrease.
    pub fn new(calendar: Calendar, values: Vec<CfDatetime>) -> SubsetResult<Self> {
        if let Some(bad) = values.iter().find(|t| t.calendar() != calendar) {
            return Err(SubsetError::invalid_dataset(format!(
                "time value {} uses the {} calendar, axis uses {}",
                bad,
                bad.calendar(),
                calendar
            )));
        }
        if let Some(pair) = values.windows(2).find(|w| w[1] < w[0]) {
            return Err(SubsetError::invalid_dataset(format!(
                "time axis is not monotonic: {} follows {}",
                pair[1], pair[0]
            )));
        }
        Ok(Self { values, calendar })
    }

    /// Decode CF-encoded offsets such as `days since 1850-01-01`.
    ///
    /// A missing calendar attribute means `standard`.
    pub fn from_cf(values: &[f64], units: &str, calendar: Option<&str>) -> SubsetResult<Self> {
        let calendar = match calendar {
            Some(name) => Calendar::from_cf_name(name).ok_or_else(|| {
                SubsetError::invalid_dataset(format!("unknown calendar '{}'", name))
            })?,
            None => Calendar::Standard,
        };
        let (unit_micros, epoch) = parse_cf_units(units, calendar)?;
        let out_of_range = |v: f64| {
            SubsetError::invalid_dataset(format!("time value {} '{}' is out of range", v, units))
        };

        let decoded = values
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    return Err(SubsetError::invalid_dataset(format!(
                        "non-finite time value {}",
                        v
                    )));
                }
                let offset = (v * unit_micros as f64).round();
                // `as` saturates, so range-check before converting.
                if offset.abs() >= i64::MAX as f64 {
                    return Err(out_of_range(v));
                }
                epoch
                    .checked_add_micros(offset as i64)
                    .ok_or_else(|| out_of_range(v))
            })
            .collect::<SubsetResult<Vec<_>>>()?;

        Self::new(calendar, decoded)
    }

    /// Encode as CF offsets in `units`.
    pub fn to_cf(&self, units: &str) -> SubsetResult<Vec<f64>> {
        let (unit_micros, epoch) = parse_cf_units(units, self.calendar)?;
        let origin = epoch.timestamp_micros();
        Ok(self
            .values
            .iter()
            .map(|t| (t.timestamp_micros() - origin) as f64 / unit_micros as f64)
            .collect())
    }

    pub fn values(&self) -> &[CfDatetime] {
        &self.values
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<&CfDatetime> {
        self.values.first()
    }

    pub fn last(&self) -> Option<&CfDatetime> {
        self.values.last()
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            values: self.values[range].to_vec(),
            calendar: self.calendar,
        }
    }
}

/// Split CF time units into the unit length in microseconds and the epoch.
fn parse_cf_units(units: &str, calendar: Calendar) -> SubsetResult<(i64, CfDatetime)> {
    let invalid = || SubsetError::invalid_dataset(format!("unsupported time units '{}'", units));

    let (unit, epoch) = units.trim().split_once(" since ").ok_or_else(invalid)?;
    let unit_micros: i64 = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 86_400_000_000,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000_000,
        "minutes" | "minute" | "mins" | "min" => 60_000_000,
        "seconds" | "second" | "secs" | "sec" | "s" => 1_000_000,
        _ => return Err(invalid()),
    };

    let epoch = PartialDate::parse(&pad_epoch(epoch.trim()))
        .and_then(|p| p.start_in(calendar))
        .map_err(|e| SubsetError::invalid_dataset(format!("bad epoch in '{}': {}", units, e)))?;

    Ok((unit_micros, epoch))
}

/// CF epochs are often written without zero padding (`1850-1-1 0:0:0`).
fn pad_epoch(epoch: &str) -> String {
    let mut parts = epoch.splitn(2, |c: char| c == ' ' || c == 'T');
    let date = parts.next().unwrap_or_default();
    let time = parts.next().map(|t| t.trim().trim_end_matches('Z'));

    let mut date_fields = date.split('-');
    let year = date_fields.next().unwrap_or_default();
    let mut out = format!("{:0>4}", year);
    for field in date_fields {
        out.push('-');
        out.push_str(&format!("{:0>2}", field));
    }

    if let Some(time) = time.filter(|t| !t.is_empty()) {
        let (hms, fraction) = match time.split_once('.') {
            Some((hms, fraction)) => (hms, Some(fraction)),
            None => (time, None),
        };
        let padded: Vec<String> = hms.split(':').map(|f| format!("{:0>2}", f)).collect();
        out.push('T');
        out.push_str(&padded.join(":"));
        if let Some(fraction) = fraction {
            out.push('.');
            out.push_str(fraction);
        }
    }
    out
}

/// A gridded dataset: coordinates, variables and global attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    time: Option<TimeCoordinate>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    variables: Vec<Variable>,
    attributes: Attributes,
}

impl Dataset {
    /// Build a dataset, checking coordinates and variable shapes.
    pub fn new(
        time: Option<TimeCoordinate>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        variables: Vec<Variable>,
        attributes: Attributes,
    ) -> SubsetResult<Self> {
        check_monotonic(LAT_DIM, &lat)?;
        check_monotonic(LON_DIM, &lon)?;

        let mut other_dims: HashMap<&str, usize> = HashMap::new();
        for var in &variables {
            if variables.iter().filter(|v| v.name == var.name).count() > 1 {
                return Err(SubsetError::invalid_dataset(format!(
                    "duplicate variable '{}'",
                    var.name
                )));
            }
            for (dim, &len) in var.dims.iter().zip(&var.shape) {
                let expected = match dim.as_str() {
                    TIME_DIM => match &time {
                        Some(t) => t.len(),
                        None => {
                            return Err(SubsetError::invalid_dataset(format!(
                                "variable '{}' uses the time dimension but the dataset has no time axis",
                                var.name
                            )))
                        }
                    },
                    LAT_DIM => lat.len(),
                    LON_DIM => lon.len(),
                    other => *other_dims.entry(other).or_insert(len),
                };
                if len != expected {
                    return Err(SubsetError::invalid_dataset(format!(
                        "variable '{}' has {} entries along '{}', expected {}",
                        var.name, len, dim, expected
                    )));
                }
            }
        }

        Ok(Self {
            time,
            lat,
            lon,
            variables,
            attributes,
        })
    }

    pub fn time(&self) -> Option<&TimeCoordinate> {
        self.time.as_ref()
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// String-valued global attribute.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Number of time steps, zero without a time axis.
    pub fn time_len(&self) -> usize {
        self.time.as_ref().map_or(0, TimeCoordinate::len)
    }

    /// Calendar of the time axis; `standard` when there is none.
    pub fn calendar(&self) -> Calendar {
        self.time
            .as_ref()
            .map_or(Calendar::Standard, TimeCoordinate::calendar)
    }

    /// First and last time values.
    pub fn time_extent(&self) -> Option<(CfDatetime, CfDatetime)> {
        let time = self.time.as_ref()?;
        Some((*time.first()?, *time.last()?))
    }

    /// The data variable with the most elements, ignoring bounds variables.
    /// Ties go to the variable declared first.
    pub fn main_variable(&self) -> Option<&Variable> {
        let mut best: Option<&Variable> = None;
        for var in self.variables.iter().filter(|v| !v.is_bounds()) {
            if best.map_or(true, |b| var.len() > b.len()) {
                best = Some(var);
            }
        }
        best
    }

    /// True when the main variable holds no values.
    pub fn is_empty(&self) -> bool {
        self.main_variable().map_or(true, Variable::is_empty)
    }

    /// Select index ranges along time, lat and lon.
    pub fn isel(&self, selection: &DimSelection) -> Self {
        Self {
            time: match (&self.time, &selection.time) {
                (Some(t), Some(range)) => Some(t.slice(range.clone())),
                (t, _) => t.clone(),
            },
            lat: match &selection.lat {
                Some(range) => self.lat[range.clone()].to_vec(),
                None => self.lat.clone(),
            },
            lon: match &selection.lon {
                Some(range) => self.lon[range.clone()].to_vec(),
                None => self.lon.clone(),
            },
            variables: self.variables.iter().map(|v| v.select(selection)).collect(),
            attributes: self.attributes.clone(),
        }
    }

    /// Slice along the time axis.
    pub fn slice_time(&self, range: Range<usize>) -> Self {
        self.isel(&DimSelection {
            time: Some(range),
            ..Default::default()
        })
    }

    /// Join the parts of a multi-file time series into one dataset.
    ///
    /// Parts are ordered by their first time value. They must share the
    /// calendar, the spatial grid and the variable layout, and every
    /// time-dependent variable must have time as its leading dimension.
    pub fn concat_time(mut parts: Vec<Dataset>) -> SubsetResult<Dataset> {
        if parts.len() <= 1 {
            return parts
                .pop()
                .ok_or_else(|| SubsetError::invalid_dataset("no datasets to combine"));
        }

        let mut keyed = Vec::with_capacity(parts.len());
        for part in parts {
            let first = part
                .time
                .as_ref()
                .and_then(|t| t.first().copied())
                .ok_or_else(|| SubsetError::MissingCoordinate(TIME_DIM.to_string()))?;
            keyed.push((first.timestamp_micros(), part));
        }
        keyed.sort_by_key(|(key, _)| *key);
        let parts: Vec<Dataset> = keyed.into_iter().map(|(_, part)| part).collect();

        let head = &parts[0];
        let calendar = head.calendar();
        for part in &parts[1..] {
            if part.calendar() != calendar {
                return Err(SubsetError::invalid_dataset(format!(
                    "cannot combine {} and {} calendars",
                    calendar,
                    part.calendar()
                )));
            }
            if part.lat != head.lat || part.lon != head.lon {
                return Err(SubsetError::invalid_dataset("parts have different spatial grids"));
            }
            let same_layout = part.variables.len() == head.variables.len()
                && part
                    .variables
                    .iter()
                    .zip(&head.variables)
                    .all(|(a, b)| a.name == b.name && a.dims == b.dims);
            if !same_layout {
                return Err(SubsetError::invalid_dataset("parts have different variables"));
            }
        }

        let values: Vec<CfDatetime> = parts
            .iter()
            .filter_map(|p| p.time.as_ref())
            .flat_map(|t| t.values.iter().copied())
            .collect();
        let time = TimeCoordinate::new(calendar, values)?;

        let mut variables = Vec::with_capacity(head.variables.len());
        for (i, var) in head.variables.iter().enumerate() {
            match var.dim_index(TIME_DIM) {
                Some(0) => {
                    let datas: Vec<&VariableData> =
                        parts.iter().map(|p| &p.variables[i].data).collect();
                    let mut shape = var.shape.clone();
                    shape[0] = time.len();
                    variables.push(Variable {
                        name: var.name.clone(),
                        dims: var.dims.clone(),
                        shape,
                        data: VariableData::concat(&datas)?,
                        attributes: var.attributes.clone(),
                    });
                }
                Some(_) => {
                    return Err(SubsetError::invalid_dataset(format!(
                        "variable '{}' must have time as its first dimension to be combined",
                        var.name
                    )))
                }
                None => variables.push(var.clone()),
            }
        }

        Dataset::new(
            Some(time),
            head.lat.clone(),
            head.lon.clone(),
            variables,
            head.attributes.clone(),
        )
    }
}

fn check_monotonic(name: &str, values: &[f64]) -> SubsetResult<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(SubsetError::invalid_dataset(format!(
            "'{}' coordinate contains non-finite values",
            name
        )));
    }
    let ascending = values.windows(2).all(|w| w[0] < w[1]);
    let descending = values.windows(2).all(|w| w[0] > w[1]);
    if ascending || descending {
        Ok(())
    } else {
        Err(SubsetError::invalid_dataset(format!(
            "'{}' coordinate is not strictly monotonic",
            name
        )))
    }
}
