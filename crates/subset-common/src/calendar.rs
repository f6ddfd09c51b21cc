//! CF calendar conventions.
//!
//! Climate model output uses a handful of calendars that differ in leap-year
//! rules and month lengths. Every calendar here maps a date to a day number
//! so instants of the same calendar can be ordered and subtracted.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Julian day number of 1582-10-15, the first day of the Gregorian reform.
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Offset between chrono's days-from-CE (0001-01-01 = 1) and the Julian day number.
const CE_TO_JDN: i64 = 1_721_425;

/// Cumulative day count at the start of each month in a 365-day year.
const CUMULATIVE_DAYS_365: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Cumulative day count at the start of each month in a 366-day year.
const CUMULATIVE_DAYS_366: [u32; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// A CF-conventions calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    /// Mixed Julian/Gregorian calendar (`standard`, `gregorian`).
    #[default]
    Standard,
    /// Gregorian rules extended backwards in time.
    ProlepticGregorian,
    /// Julian rules: every fourth year is a leap year.
    Julian,
    /// Every year has 365 days (`noleap`, `365_day`).
    NoLeap,
    /// Every year has 366 days (`all_leap`, `366_day`).
    AllLeap,
    /// Twelve months of thirty days (`360_day`).
    Day360,
}

impl Calendar {
    /// Parse a CF `calendar` attribute (case-insensitive).
    pub fn from_cf_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" | "gregorian" => Some(Self::Standard),
            "proleptic_gregorian" => Some(Self::ProlepticGregorian),
            "julian" => Some(Self::Julian),
            "noleap" | "no_leap" | "365_day" => Some(Self::NoLeap),
            "all_leap" | "366_day" => Some(Self::AllLeap),
            "360_day" => Some(Self::Day360),
            _ => None,
        }
    }

    /// The canonical CF name of this calendar.
    pub fn cf_name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ProlepticGregorian => "proleptic_gregorian",
            Self::Julian => "julian",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
        }
    }

    /// Whether `year` is a leap year in this calendar.
    ///
    /// Always false for calendars without leap years, including `360_day`.
    pub fn is_leap_year(&self, year: i32) -> bool {
        let julian_leap = year.rem_euclid(4) == 0;
        let gregorian_leap = julian_leap && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0);
        match self {
            Self::Standard => {
                if year < 1583 {
                    julian_leap
                } else {
                    gregorian_leap
                }
            }
            Self::ProlepticGregorian => gregorian_leap,
            Self::Julian => julian_leap,
            Self::AllLeap => true,
            Self::NoLeap | Self::Day360 => false,
        }
    }

    /// Number of days in the given month (1-based).
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        if *self == Self::Day360 {
            return 30;
        }
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }

    /// Number of days in the given year.
    pub fn days_in_year(&self, year: i32) -> u32 {
        match self {
            Self::Day360 => 360,
            Self::NoLeap => 365,
            Self::AllLeap => 366,
            Self::Standard if year == 1582 => 355,
            _ if self.is_leap_year(year) => 366,
            _ => 365,
        }
    }

    /// Whether the date exists in this calendar.
    ///
    /// In the `standard` calendar the ten days skipped by the Gregorian
    /// reform (1582-10-05 to 1582-10-14) do not exist.
    pub fn is_valid_date(&self, year: i32, month: u32, day: u32) -> bool {
        if !(1..=12).contains(&month) || day == 0 || day > self.days_in_month(year, month) {
            return false;
        }
        !(*self == Self::Standard && year == 1582 && month == 10 && (5..=14).contains(&day))
    }

    /// Day number of a valid date.
    ///
    /// Gregorian and Julian based calendars count Julian days; fixed-length
    /// calendars count days from 0001-01-01. Numbers are only comparable
    /// within one calendar.
    pub fn day_number(&self, year: i32, month: u32, day: u32) -> i64 {
        match self {
            Self::Standard => {
                let jdn = gregorian_to_jdn(year, month, day);
                if jdn >= GREGORIAN_REFORM_JDN {
                    jdn
                } else {
                    julian_to_jdn(year, month, day)
                }
            }
            Self::ProlepticGregorian => gregorian_to_jdn(year, month, day),
            Self::Julian => julian_to_jdn(year, month, day),
            Self::NoLeap => {
                fixed_year_day_number(365, year, CUMULATIVE_DAYS_365[month as usize - 1] + day - 1)
            }
            Self::AllLeap => {
                fixed_year_day_number(366, year, CUMULATIVE_DAYS_366[month as usize - 1] + day - 1)
            }
            Self::Day360 => fixed_year_day_number(360, year, (month - 1) * 30 + day - 1),
        }
    }

    /// Inverse of [`Calendar::day_number`].
    pub fn date_from_day_number(&self, days: i64) -> (i32, u32, u32) {
        match self {
            Self::Standard => {
                if days >= GREGORIAN_REFORM_JDN {
                    jdn_to_gregorian(days)
                } else {
                    jdn_to_julian(days)
                }
            }
            Self::ProlepticGregorian => jdn_to_gregorian(days),
            Self::Julian => jdn_to_julian(days),
            Self::NoLeap => {
                let (year, doy) = split_fixed_year(365, days);
                month_from_cumulative(&CUMULATIVE_DAYS_365, year, doy)
            }
            Self::AllLeap => {
                let (year, doy) = split_fixed_year(366, days);
                month_from_cumulative(&CUMULATIVE_DAYS_366, year, doy)
            }
            Self::Day360 => {
                let (year, doy) = split_fixed_year(360, days);
                (year, doy / 30 + 1, doy % 30 + 1)
            }
        }
    }
}

impl std::fmt::Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cf_name())
    }
}

fn fixed_year_day_number(year_length: i64, year: i32, day_of_year: u32) -> i64 {
    (year as i64 - 1) * year_length + day_of_year as i64
}

fn split_fixed_year(year_length: i64, days: i64) -> (i32, u32) {
    let year = days.div_euclid(year_length) + 1;
    let doy = days.rem_euclid(year_length);
    (year as i32, doy as u32)
}

fn month_from_cumulative(table: &[u32; 12], year: i32, day_of_year: u32) -> (i32, u32, u32) {
    let month_index = table.iter().rposition(|&start| start <= day_of_year).unwrap_or(0);
    (year, month_index as u32 + 1, day_of_year - table[month_index] + 1)
}

fn gregorian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date.num_days_from_ce() as i64 + CE_TO_JDN,
        // Out of chrono's range; fall back to the arithmetic formula.
        None => {
            let a = (14 - month as i64) / 12;
            let y = year as i64 + 4800 - a;
            let m = month as i64 + 12 * a - 3;
            day as i64 + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - y.div_euclid(100)
                + y.div_euclid(400)
                - 32045
        }
    }
}

fn jdn_to_gregorian(jdn: i64) -> (i32, u32, u32) {
    if let Ok(days) = i32::try_from(jdn - CE_TO_JDN) {
        if let Some(date) = NaiveDate::from_num_days_from_ce_opt(days) {
            return (date.year(), date.month(), date.day());
        }
    }
    let a = jdn + 32044;
    let b = (4 * a + 3).div_euclid(146_097);
    let c = a - (146_097 * b).div_euclid(4);
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2).div_euclid(153);
    let day = e - (153 * m + 2).div_euclid(5) + 1;
    let month = m + 3 - 12 * m.div_euclid(10);
    let year = 100 * b + d - 4800 + m.div_euclid(10);
    (year as i32, month as u32, day as u32)
}

fn julian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - month as i64) / 12;
    let y = year as i64 + 4800 - a;
    let m = month as i64 + 12 * a - 3;
    day as i64 + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

fn jdn_to_julian(jdn: i64) -> (i32, u32, u32) {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2).div_euclid(153);
    let day = e - (153 * m + 2).div_euclid(5) + 1;
    let month = m + 3 - 12 * m.div_euclid(10);
    let year = d - 4800 + m.div_euclid(10);
    (year as i32, month as u32, day as u32)
}
