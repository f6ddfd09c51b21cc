//! Common types and utilities shared across the climate-subset crates.

pub mod bbox;
pub mod calendar;
pub mod error;
pub mod time;

pub use bbox::{AreaValue, BboxParseError, BoundingBox};
pub use calendar::Calendar;
pub use error::{SubsetError, SubsetResult};
pub use time::{CfDatetime, DatePrecision, PartialDate, TimeBound, TimeParseError, TimeRange};
