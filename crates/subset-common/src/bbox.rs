//! Bounding box types and parsing.

use serde::{Deserialize, Serialize};

/// One coordinate of an area request: a number, or a string holding one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AreaValue {
    Number(f64),
    Text(String),
}

impl AreaValue {
    /// Coerce to `f64`, as a numeric literal or a trimmed numeric string.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for AreaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<f64> for AreaValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for AreaValue {
    fn from(v: i32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for AreaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AreaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A geographic bounding box in degrees: west, south, east, north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Build a box from exactly four values in west, south, east, north order.
    pub fn from_values(values: &[AreaValue]) -> Result<Self, BboxParseError> {
        if values.len() != 4 {
            return Err(BboxParseError::WrongLength(values.len()));
        }

        let mut coords = [0.0; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = value
                .to_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| BboxParseError::InvalidNumber(value.to_string()))?;
        }

        Ok(Self::new(coords[0], coords[1], coords[2], coords[3]))
    }

    /// Parse a comma separated string: "west,south,east,north"
    pub fn from_csv(s: &str) -> Result<Self, BboxParseError> {
        let values: Vec<AreaValue> = s.split(',').map(AreaValue::from).collect();
        if values.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }
        Self::from_values(&values)
    }

    /// Longitude bounds as `(west, east)`.
    pub fn lon_bnds(&self) -> (f64, f64) {
        (self.west, self.east)
    }

    /// Latitude bounds ordered so that the first value is the smaller one.
    pub fn lat_bnds(&self) -> (f64, f64) {
        if self.south <= self.north {
            (self.south, self.north)
        } else {
            (self.north, self.south)
        }
    }

    /// A box whose west edge lies east of its east edge wraps across the anti-meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if this bbox intersects another (edges touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.east < other.west
            || self.west > other.east
            || self.north < other.south
            || self.south > other.north)
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid area format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Area must have exactly 4 values, got {0}")]
    WrongLength(usize),

    #[error("Invalid number in area: {0}")]
    InvalidNumber(String),
}
