//! Calendar-aware time handling for climate data.
//!
//! [`CfDatetime`] is an instant in one of the CF calendars. [`PartialDate`]
//! is what users type: anything from `"2050"` to `"2050-02-05T12:00:00"`.
//! A partial date names a period (a year, a month, a day...), and
//! [`TimeBound`] decides whether a selection bound is that period or an
//! exact instant.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Years beyond this distance from year 0 are rejected so that
/// microsecond timestamps always fit in an `i64`.
pub const MAX_ABS_YEAR: i32 = 100_000;

/// Day numbers past this bound are out of range in every calendar.
const MAX_SHIFT_DAYS: u64 = 2 * 366 * MAX_ABS_YEAR as u64;

/// An instant in a CF calendar, with microsecond resolution.
///
/// Instants are only ordered against instants of the same calendar;
/// `partial_cmp` returns `None` across calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfDatetime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    microsecond: u32,
    calendar: Calendar,
}

impl CfDatetime {
    /// Create an instant, validating every field against the calendar.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        calendar: Calendar,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        microsecond: u32,
    ) -> Result<Self, TimeParseError> {
        if year.unsigned_abs() > MAX_ABS_YEAR as u32 || !calendar.is_valid_date(year, month, day) {
            return Err(TimeParseError::InvalidDate {
                value: format!("{:04}-{:02}-{:02}", year, month, day),
                calendar,
            });
        }
        if hour > 23 || minute > 59 || second > 59 || microsecond > 999_999 {
            return Err(TimeParseError::InvalidFormat(format!(
                "{:02}:{:02}:{:02}.{:06}",
                hour, minute, second, microsecond
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
            calendar,
        })
    }

    /// Create an instant at midnight of the given date.
    pub fn from_ymd(calendar: Calendar, year: i32, month: u32, day: u32) -> Result<Self, TimeParseError> {
        Self::new(calendar, year, month, day, 0, 0, 0, 0)
    }

    /// Rebuild an instant from a microsecond count produced by [`CfDatetime::timestamp_micros`].
    pub fn from_timestamp_micros(calendar: Calendar, micros: i64) -> Self {
        let days = micros.div_euclid(MICROS_PER_DAY);
        let rest = micros.rem_euclid(MICROS_PER_DAY);
        let (year, month, day) = calendar.date_from_day_number(days);
        let seconds = rest / MICROS_PER_SECOND;
        Self {
            year,
            month,
            day,
            hour: (seconds / 3600) as u32,
            minute: (seconds % 3600 / 60) as u32,
            second: (seconds % 60) as u32,
            microsecond: (rest % MICROS_PER_SECOND) as u32,
            calendar,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn microsecond(&self) -> u32 {
        self.microsecond
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Microseconds since the calendar's day-number origin.
    pub fn timestamp_micros(&self) -> i64 {
        let days = self.calendar.day_number(self.year, self.month, self.day);
        let seconds = (self.hour * 3600 + self.minute * 60 + self.second) as i64;
        days * MICROS_PER_DAY + seconds * MICROS_PER_SECOND + self.microsecond as i64
    }

    /// Shift this instant by a signed number of microseconds.
    ///
    /// Returns `None` when the result overflows or lands more than
    /// [`MAX_ABS_YEAR`] years from year 0.
    pub fn checked_add_micros(&self, micros: i64) -> Option<Self> {
        let shifted = self.timestamp_micros().checked_add(micros)?;
        // Keeps the year arithmetic of the day-number conversion within i32.
        if shifted.div_euclid(MICROS_PER_DAY).unsigned_abs() > MAX_SHIFT_DAYS {
            return None;
        }
        let t = Self::from_timestamp_micros(self.calendar, shifted);
        (t.year.unsigned_abs() <= MAX_ABS_YEAR as u32).then_some(t)
    }

    /// Absolute distance in microseconds, or `None` across calendars.
    pub fn abs_diff_micros(&self, other: &CfDatetime) -> Option<u64> {
        if self.calendar != other.calendar {
            return None;
        }
        Some(self.timestamp_micros().abs_diff(other.timestamp_micros()))
    }

    /// ISO-8601 representation without fractional seconds: `2005-12-16T00:00:00`.
    pub fn format_iso(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }

    /// Compact date used in file names: `20051216`.
    pub fn format_compact_date(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    fn sort_key(&self) -> (i32, u32, u32, u32, u32, u32, u32) {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.microsecond,
        )
    }
}

impl PartialOrd for CfDatetime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.calendar != other.calendar {
            return None;
        }
        Some(self.sort_key().cmp(&other.sort_key()))
    }
}

impl std::fmt::Display for CfDatetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_iso())?;
        if self.microsecond > 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// Precision of a parsed [`PartialDate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// A possibly incomplete ISO-8601 date/time string, parsed but not yet
/// bound to a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub microsecond: Option<u32>,
}

impl PartialDate {
    /// Parse an ISO-8601-like string.
    ///
    /// Supports:
    /// - Year: `2050`
    /// - Year-month: `2050-02`
    /// - Date: `2050-02-05`
    /// - Date and time: `2050-02-05T12`, `2050-02-05T12:30`, `2050-02-05T12:30:00`
    /// - Fractional seconds and a trailing `Z`: `2050-02-05T12:30:00.5Z`
    /// - A space instead of `T`: `2050-02-05 12:30:00`
    ///
    /// Day-of-month is only range-checked here (1-31); calendar-specific
    /// validity is checked when the date is bound to a calendar.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let invalid = || TimeParseError::InvalidFormat(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (date_part, time_part) = match trimmed.find(&['T', ' '][..]) {
            Some(pos) => (&trimmed[..pos], Some(&trimmed[pos + 1..])),
            None => (trimmed, None),
        };

        let date_fields: Vec<&str> = date_part.split('-').collect();
        if date_fields.len() > 3 || date_fields[0].len() != 4 {
            return Err(invalid());
        }
        let year = parse_field(date_fields[0], 4, 0..=9999).ok_or_else(invalid)? as i32;
        let month = date_fields
            .get(1)
            .map(|f| parse_field(f, 2, 1..=12).ok_or_else(invalid))
            .transpose()?;
        let day = date_fields
            .get(2)
            .map(|f| parse_field(f, 2, 1..=31).ok_or_else(invalid))
            .transpose()?;

        let mut date = Self {
            year,
            month,
            day,
            hour: None,
            minute: None,
            second: None,
            microsecond: None,
        };

        let Some(time_part) = time_part else {
            return Ok(date);
        };
        if day.is_none() || time_part.is_empty() {
            return Err(invalid());
        }

        let (hms, fraction) = match time_part.split_once('.') {
            Some((hms, fraction)) => (hms, Some(fraction)),
            None => (time_part, None),
        };
        let time_fields: Vec<&str> = hms.split(':').collect();
        if time_fields.len() > 3 {
            return Err(invalid());
        }
        date.hour = Some(parse_field(time_fields[0], 2, 0..=23).ok_or_else(invalid)?);
        date.minute = time_fields
            .get(1)
            .map(|f| parse_field(f, 2, 0..=59).ok_or_else(invalid))
            .transpose()?;
        date.second = time_fields
            .get(2)
            .map(|f| parse_field(f, 2, 0..=59).ok_or_else(invalid))
            .transpose()?;

        if let Some(fraction) = fraction {
            if date.second.is_none()
                || fraction.is_empty()
                || fraction.len() > 6
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            let padded = format!("{:0<6}", fraction);
            date.microsecond = padded.parse().ok();
        }

        Ok(date)
    }

    /// The finest component present in the string.
    pub fn precision(&self) -> DatePrecision {
        if self.second.is_some() {
            DatePrecision::Second
        } else if self.minute.is_some() {
            DatePrecision::Minute
        } else if self.hour.is_some() {
            DatePrecision::Hour
        } else if self.day.is_some() {
            DatePrecision::Day
        } else if self.month.is_some() {
            DatePrecision::Month
        } else {
            DatePrecision::Year
        }
    }

    /// First instant of the period named by this date, in `calendar`.
    pub fn start_in(&self, calendar: Calendar) -> Result<CfDatetime, TimeParseError> {
        CfDatetime::new(
            calendar,
            self.year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.microsecond.unwrap_or(0),
        )
    }

    /// Last instant of the period named by this date, in `calendar`.
    ///
    /// `"2050"` in a `360_day` calendar ends at `2050-12-30T23:59:59.999999`.
    pub fn end_in(&self, calendar: Calendar) -> Result<CfDatetime, TimeParseError> {
        let month = self.month.unwrap_or(12);
        let day = match self.day {
            Some(day) => day,
            None => calendar.days_in_month(self.year, month),
        };
        let microsecond = match (self.second, self.microsecond) {
            (Some(_), Some(us)) => us,
            (Some(_), None) => 0,
            _ => 999_999,
        };
        CfDatetime::new(
            calendar,
            self.year,
            month,
            day,
            self.hour.unwrap_or(23),
            self.minute.unwrap_or(59),
            self.second.unwrap_or(59),
            microsecond,
        )
    }
}

impl std::str::FromStr for PartialDate {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_field(field: &str, width: usize, range: std::ops::RangeInclusive<u32>) -> Option<u32> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok().filter(|v| range.contains(v))
}

/// One end of a time selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeBound {
    /// An exact instant, typically a coordinate value of the dataset.
    Instant(CfDatetime),
    /// A partial date; the bound covers the whole period it names.
    Period(PartialDate),
}

impl TimeBound {
    /// Parse a user string as a period bound.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        PartialDate::parse(s).map(Self::Period)
    }

    /// Lowest instant admitted by this bound when used as a range start.
    pub fn lower(&self, calendar: Calendar) -> Result<CfDatetime, TimeParseError> {
        match self {
            Self::Instant(t) => check_calendar(t, calendar),
            Self::Period(p) => p.start_in(calendar),
        }
    }

    /// Highest instant admitted by this bound when used as a range end.
    pub fn upper(&self, calendar: Calendar) -> Result<CfDatetime, TimeParseError> {
        match self {
            Self::Instant(t) => check_calendar(t, calendar),
            Self::Period(p) => p.end_in(calendar),
        }
    }
}

impl From<CfDatetime> for TimeBound {
    fn from(t: CfDatetime) -> Self {
        Self::Instant(t)
    }
}

impl From<PartialDate> for TimeBound {
    fn from(p: PartialDate) -> Self {
        Self::Period(p)
    }
}

fn check_calendar(t: &CfDatetime, calendar: Calendar) -> Result<CfDatetime, TimeParseError> {
    if t.calendar() != calendar {
        return Err(TimeParseError::CalendarMismatch {
            expected: calendar,
            found: t.calendar(),
        });
    }
    Ok(*t)
}

/// An inclusive time range within one calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: CfDatetime,
    pub end: CfDatetime,
}

impl TimeRange {
    pub fn new(start: CfDatetime, end: CfDatetime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: &CfDatetime) -> bool {
        t >= &self.start && t <= &self.end
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Date {value} does not exist in the {calendar} calendar")]
    InvalidDate { value: String, calendar: Calendar },

    #[error("Time is in the {found} calendar, expected {expected}")]
    CalendarMismatch { expected: Calendar, found: Calendar },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_datetime() {
        let p = PartialDate::parse("2005-01-01T00:00:00").unwrap();
        assert_eq!(p.year, 2005);
        assert_eq!(p.month, Some(1));
        assert_eq!(p.second, Some(0));
        assert_eq!(p.precision(), DatePrecision::Second);
    }

    #[test]
    fn test_parse_partial_dates() {
        assert_eq!(PartialDate::parse("2050").unwrap().precision(), DatePrecision::Year);
        assert_eq!(PartialDate::parse("2100-12").unwrap().precision(), DatePrecision::Month);
        assert_eq!(PartialDate::parse("2050-02-05").unwrap().precision(), DatePrecision::Day);
        assert_eq!(PartialDate::parse("2050-02-05 06").unwrap().precision(), DatePrecision::Hour);
    }

    #[test]
    fn test_parse_fraction_and_zulu() {
        let p = PartialDate::parse("2024-01-15T12:00:00.25Z").unwrap();
        assert_eq!(p.microsecond, Some(250_000));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "yesterday", "maybe tomorrow", "2020-13", "20-01-01", "2020-01-01T", "2020-01-01T25:00:00"] {
            assert!(PartialDate::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_day_31_rejected_in_360_day_calendar() {
        let p = PartialDate::parse("2020-01-31").unwrap();
        assert!(matches!(
            p.start_in(Calendar::Day360),
            Err(TimeParseError::InvalidDate { .. })
        ));
        assert!(p.start_in(Calendar::Standard).is_ok());
    }

    #[test]
    fn test_period_bounds() {
        let p = PartialDate::parse("2050").unwrap();
        let start = p.start_in(Calendar::Day360).unwrap();
        let end = p.end_in(Calendar::Day360).unwrap();
        assert_eq!(start.format_iso(), "2050-01-01T00:00:00");
        assert_eq!(end.format_iso(), "2050-12-30T23:59:59");
        assert_eq!(end.microsecond(), 999_999);

        let feb = PartialDate::parse("2024-02").unwrap();
        assert_eq!(feb.end_in(Calendar::Standard).unwrap().day(), 29);
        assert_eq!(feb.end_in(Calendar::NoLeap).unwrap().day(), 28);
    }

    #[test]
    fn test_ordering_within_calendar_only() {
        let a = CfDatetime::from_ymd(Calendar::Day360, 2005, 12, 16).unwrap();
        let b = CfDatetime::from_ymd(Calendar::Day360, 2006, 1, 16).unwrap();
        let c = CfDatetime::from_ymd(Calendar::NoLeap, 2006, 1, 16).unwrap();
        assert!(a < b);
        assert_eq!(a.partial_cmp(&c), None);
        assert_eq!(a.abs_diff_micros(&b), Some(30 * MICROS_PER_DAY as u64));
        assert_eq!(a.abs_diff_micros(&c), None);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let t = CfDatetime::new(Calendar::NoLeap, 1999, 3, 1, 12, 30, 15, 42).unwrap();
        let back = CfDatetime::from_timestamp_micros(Calendar::NoLeap, t.timestamp_micros());
        assert_eq!(t, back);
        assert_eq!(t.checked_add_micros(-MICROS_PER_DAY).unwrap().day(), 28);
    }

    #[test]
    fn test_shift_out_of_range() {
        let t = CfDatetime::from_ymd(Calendar::Day360, 2000, 1, 1).unwrap();
        assert_eq!(t.checked_add_micros(i64::MAX), None);
        assert_eq!(t.checked_add_micros(i64::MIN), None);
        // 200 000 years of 360 days
        assert_eq!(t.checked_add_micros(200_000 * 360 * MICROS_PER_DAY), None);
        let far = t.checked_add_micros(90_000 * 360 * MICROS_PER_DAY).unwrap();
        assert_eq!(far.year(), 92_000);
    }

    #[test]
    fn test_year_limit() {
        assert!(CfDatetime::from_ymd(Calendar::NoLeap, MAX_ABS_YEAR, 1, 1).is_ok());
        assert!(matches!(
            CfDatetime::from_ymd(Calendar::NoLeap, MAX_ABS_YEAR + 1, 1, 1),
            Err(TimeParseError::InvalidDate { .. })
        ));
        assert!(CfDatetime::from_ymd(Calendar::Standard, i32::MIN, 1, 1).is_err());
    }

    #[test]
    fn test_time_bound_calendar_mismatch() {
        let t = CfDatetime::from_ymd(Calendar::NoLeap, 2000, 1, 1).unwrap();
        let bound = TimeBound::Instant(t);
        assert!(bound.lower(Calendar::NoLeap).is_ok());
        assert!(matches!(
            bound.upper(Calendar::Day360),
            Err(TimeParseError::CalendarMismatch { .. })
        ));
    }

    #[test]
    fn test_time_range_contains() {
        let start = CfDatetime::from_ymd(Calendar::Day360, 2050, 1, 1).unwrap();
        let end = CfDatetime::from_ymd(Calendar::Day360, 2050, 12, 30).unwrap();
        let range = TimeRange::new(start, end);
        assert!(range.contains(&CfDatetime::from_ymd(Calendar::Day360, 2050, 6, 16).unwrap()));
        assert!(!range.contains(&CfDatetime::from_ymd(Calendar::Day360, 2051, 1, 16).unwrap()));
    }
}
