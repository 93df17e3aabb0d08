mod consts;
mod engine;
mod prelude;
mod region;
mod rules;
mod types;

pub use consts::*;
pub use engine::{follow_up, parse_date, FollowUp, FollowUpError, FollowUpRequest};
pub use region::{AgeBracket, Region, UnknownAgeBracket, UnknownRegion};
pub use rules::{RuleKind, RuleTable, RuleTableError, ValidityPeriod};
pub use types::{Day, Month, Year};

use crate::prelude::*;
use std::str::FromStr;

/// A calendar date with no time component.
///
/// Displays (and serializes) in US `MM/DD/YYYY` form. Ordering is
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "{month}/{day}/{year}")]
pub struct CalendarDate {
    year:  Year,
    month: Month,
    day:   Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ParseError {
    #[display(fmt = "Invalid date format: {_0}")]
    InvalidFormat(String),
    #[display(fmt = "Invalid year: {} (must be 1-{})", "_0", MAX_YEAR)]
    InvalidYear(u16),
    #[display(fmt = "Invalid month: {} (must be 1-{})", "_0", MAX_MONTH)]
    InvalidMonth(u8),
    #[display(fmt = "Invalid day {day} for month {year}-{month:02}")]
    InvalidDay { month: u8, day: u8, year: u16 },
    #[display(fmt = "Empty date string")]
    EmptyInput,
}

impl std::error::Error for ParseError {}

impl CalendarDate {
    /// Creates a date from validated components
    pub const fn new(year: Year, month: Month, day: Day) -> Self {
        Self { year, month, day }
    }

    /// Creates a date from raw components, validating each one
    ///
    /// # Errors
    /// Returns the `ParseError` for the first invalid component.
    pub fn from_ymd(year: u16, month: u8, day: u8) -> Result<Self, ParseError> {
        let year = Year::new(year)?;
        let month = Month::new(month)?;
        let day = Day::new(day, year, month)?;
        Ok(Self { year, month, day })
    }

    /// Creates a date, resolving a day past the end of the month to the
    /// month's last day (Feb 29 in a non-leap year becomes Feb 28).
    ///
    /// # Errors
    /// Returns `ParseError::InvalidDay` if `day` is 0.
    pub fn clamped(year: Year, month: Month, day: u8) -> Result<Self, ParseError> {
        let day = Day::clamped(day, year, month)?;
        Ok(Self { year, month, day })
    }

    pub const fn year(&self) -> Year {
        self.year
    }

    pub const fn month(&self) -> Month {
        self.month
    }

    pub const fn day(&self) -> Day {
        self.day
    }

    /// Same month and day, `years` later. Clamps Feb 29 onto Feb 28 when the
    /// target year is not a leap year.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidYear` if the result would pass `MAX_YEAR`.
    pub fn add_years(self, years: u16) -> Result<Self, ParseError> {
        let year = self.year.checked_add(years)?;
        Self::clamped(year, self.month, self.day.get())
    }

    /// Calendar month subtraction. The day of month is kept where the target
    /// month has it and clamped to the month's last day otherwise.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidYear(0)` if the result would precede year 1.
    pub fn sub_months(self, months: u8) -> Result<Self, ParseError> {
        let elapsed = u32::from(self.year.get()) * MONTHS_PER_YEAR + u32::from(self.month.get() - 1);
        let target = elapsed
            .checked_sub(u32::from(months))
            .filter(|total| *total >= MONTHS_PER_YEAR)
            .ok_or(ParseError::InvalidYear(0))?;

        let year = u16::try_from(target / MONTHS_PER_YEAR).map_err(|_| ParseError::InvalidYear(0))?;
        let month = u8::try_from(target % MONTHS_PER_YEAR + 1).map_err(|_| ParseError::InvalidMonth(0))?;
        Self::clamped(Year::new(year)?, Month::new(month)?, self.day.get())
    }

    /// The first anniversary of this date's month and day that falls strictly
    /// after `after`. Tries `after`'s own year first, then the year following.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidYear` if the anniversary would pass `MAX_YEAR`.
    pub fn next_anniversary_after(self, after: Self) -> Result<Self, ParseError> {
        let candidate = Self::clamped(after.year, self.month, self.day.get())?;
        if candidate > after {
            return Ok(candidate);
        }
        Self::clamped(after.year.checked_add(1)?, self.month, self.day.get())
    }
}

impl FromStr for CalendarDate {
    type Err = ParseError;

    /// Parses US-ordered dates: `M/D/YYYY`, `MM-DD-YYYY`, `M.D.YYYY`,
    /// year-first `YYYY-MM-DD`, and month names (`January 15, 2024`).
    /// Day-first orderings are never attempted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        if trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Self::parse_month_name(trimmed);
        }

        let separators: Vec<char> = MONTH_FIRST_SEPARATORS
            .into_iter()
            .filter(|sep| trimmed.contains(*sep))
            .collect();

        match separators.as_slice() {
            [] => Err(ParseError::InvalidFormat(format!(
                "No date separator found (expected one of {MONTH_FIRST_SEPARATORS:?}): {trimmed}"
            ))),
            [sep] => {
                let parts: Vec<&str> = trimmed.split(*sep).map(str::trim).collect();
                if parts.len() != 3 {
                    return Err(ParseError::InvalidFormat(format!(
                        "Expected 3 {} separated components, found {}",
                        sep,
                        parts.len()
                    )));
                }
                if parts[0].len() == YEAR_DIGITS {
                    Self::parse_year_first(&parts)
                } else {
                    Self::parse_month_first(&parts)
                }
            },
            _ => Err(ParseError::InvalidFormat(format!(
                "Mixed delimiters ({}): {trimmed}",
                separators.iter().map(char::to_string).collect::<Vec<_>>().join(" and ")
            ))),
        }
    }
}

impl CalendarDate {
    /// Helper to parse a 4-digit year with better error messages
    fn parse_year(s: &str) -> Result<Year, ParseError> {
        if s.len() != YEAR_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat(format!("Year must be {YEAR_DIGITS} digits: {s}")));
        }
        let value = s
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidFormat(s.to_owned()))?;
        Year::new(value)
    }

    /// Helper to parse u8 with better error messages
    fn parse_u8(s: &str) -> Result<u8, ParseError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat(s.to_owned()));
        }
        s.parse::<u8>()
            .map_err(|_| ParseError::InvalidFormat(s.to_owned()))
    }

    fn parse_month_first(parts: &[&str]) -> Result<Self, ParseError> {
        // Parse components - InvalidFormat if not numeric
        let month_u8 = Self::parse_u8(parts[0])?;
        let day_u8 = Self::parse_u8(parts[1])?;
        let year = Self::parse_year(parts[2])?;

        let month = Month::new(month_u8)?;
        let day = Day::new(day_u8, year, month)?;

        Ok(Self { year, month, day })
    }

    fn parse_year_first(parts: &[&str]) -> Result<Self, ParseError> {
        let year = Self::parse_year(parts[0])?;
        let month_u8 = Self::parse_u8(parts[1])?;
        let day_u8 = Self::parse_u8(parts[2])?;

        let month = Month::new(month_u8)?;
        let day = Day::new(day_u8, year, month)?;

        Ok(Self { year, month, day })
    }

    fn parse_month_name(s: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .collect();
        let [month, day, year] = parts.as_slice() else {
            return Err(ParseError::InvalidFormat(format!(
                "Expected month name, day and year: {s}"
            )));
        };

        let month = Month::from_name(month)?;
        let day_u8 = Self::parse_u8(day)?;
        let year = Self::parse_year(year)?;
        let day = Day::new(day_u8, year, month)?;

        Ok(Self { year, month, day })
    }
}

impl From<CalendarDate> for (u16, u8, u8) {
    fn from(date: CalendarDate) -> Self {
        (date.year.get(), date.month.get(), date.day.get())
    }
}

impl TryFrom<(u16, u8, u8)> for CalendarDate {
    type Error = ParseError;

    fn try_from(value: (u16, u8, u8)) -> Result<Self, Self::Error> {
        Self::from_ymd(value.0, value.1, value.2)
    }
}

impl serde::Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
