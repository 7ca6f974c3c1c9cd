//! Hour-resolution timestamps as used by the HYCOM subsetting service.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::{Error, Result};

/// Hours of the day at which 3-hourly output exists.
pub const MODEL_HOURS: [u32; 8] = [0, 3, 6, 9, 12, 15, 18, 21];

/// Spacing between model outputs, in hours.
pub const STEP_HOURS: i64 = 3;

/// A `YYYYMMDDHH` instant.
///
/// Field order matters: the derived ordering compares year, month, day and
/// hour in that sequence, which is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl Timestamp {
    /// Builds a timestamp from literal parts. Only used for static tables, so
    /// the parts are not validated here.
    pub const fn ymdh(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
        }
    }

    /// Parses a range start; a bare `YYYYMMDD` starts at hour 00.
    pub fn parse_start(s: &str) -> Result<Self> {
        Self::parse_with_default_hour(s, 0)
    }

    /// Parses a range end; a bare `YYYYMMDD` ends at hour 21.
    pub fn parse_end(s: &str) -> Result<Self> {
        Self::parse_with_default_hour(s, 21)
    }

    fn parse_with_default_hour(s: &str, default_hour: u32) -> Result<Self> {
        let invalid = || Error::InvalidTime(s.to_string());

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour = match s.len() {
            8 => default_hour,
            10 => s[8..10].parse::<u32>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        let date = NaiveDate::parse_from_str(&s[..8], "%Y%m%d").map_err(|_| invalid())?;
        let datetime = date.and_hms_opt(hour, 0, 0).ok_or_else(invalid)?;

        Ok(Self::from_datetime(datetime))
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
        }
    }

    pub fn to_datetime(self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, 0, 0))
            .ok_or_else(|| Error::InvalidTime(self.to_string()))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// `(month, day, hour)`, compared when yearly files do not start on
    /// January 1st.
    pub fn month_day_hour(&self) -> (u32, u32, u32) {
        (self.month, self.day, self.hour)
    }

    /// True when the hour is one of the 3-hourly output hours.
    pub fn is_model_hour(&self) -> bool {
        MODEL_HOURS.contains(&self.hour)
    }

    /// Whole hours from `self` to `later`.
    pub fn hours_until(self, later: Timestamp) -> Result<i64> {
        Ok((later.to_datetime()? - self.to_datetime()?).num_hours())
    }

    /// Time token expected by the subsetting service, with the colons
    /// already percent-encoded.
    pub fn query_token(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}%3A00%3A00Z",
            self.year, self.month, self.day, self.hour
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// Every `step_hours`-spaced timestamp from `start` up to and including `end`.
pub fn time_steps(start: Timestamp, end: Timestamp, step_hours: i64) -> Result<Vec<Timestamp>> {
    let step = Duration::hours(step_hours.max(1));
    let end = end.to_datetime()?;

    let mut current = start.to_datetime()?;
    let mut steps = Vec::new();
    while current <= end {
        steps.push(Timestamp::from_datetime(current));
        current += step;
    }

    Ok(steps)
}

// -- Tests -------------------------------------------------------------------
