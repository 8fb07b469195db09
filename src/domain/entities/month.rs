use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Wire format accepted and rendered for every month-precision field.
pub const MONTH_FORMAT_HINT: &str = "MM-YYYY";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonthParseError {
    #[error("expected MM-YYYY, got {0:?}")]
    Format(String),

    #[error("month must be between 01 and 12, got {0}")]
    MonthOutOfRange(u32),

    #[error("year must be between 0001 and 9999, got {0}")]
    YearOutOfRange(i32),
}

/// A calendar month, compared by (year, month).
///
/// Years run from 1 to 9999. Year 0 has no unambiguous date in Postgres, which
/// stores it as 1 BC.
///
/// Field order matters: the derived `Ord` is lexicographic over `year` then `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) {
            return Err(MonthParseError::MonthOutOfRange(month));
        }
        if !(1..=9999).contains(&year) {
            return Err(MonthParseError::YearOutOfRange(year));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Parses the strict `MM-YYYY` form. No day component, no short forms.
    pub fn parse(text: &str) -> Result<Self, MonthParseError> {
        let bytes = text.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[2] == b'-'
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[3..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(MonthParseError::Format(text.to_string()));
        }

        let month = digits(&bytes[..2]);
        let year = digits(&bytes[3..]);
        Self::new(year as i32, month)
    }

    /// Whole months from `self` to `other`; negative when `other` is earlier.
    pub fn months_until(&self, other: Month) -> i64 {
        (i64::from(other.year) - i64::from(self.year)) * 12
            + (i64::from(other.month) - i64::from(self.month))
    }

    /// The following calendar month, or `None` past December 9999.
    pub fn succ(&self) -> Option<Month> {
        if self.month == 12 {
            Month::new(self.year + 1, 1).ok()
        } else {
            Some(Month {
                year: self.year,
                month: self.month + 1,
            })
        }
    }

    /// First day of the month; this is how months are stored.
    pub fn first_day(&self) -> NaiveDate {
        // Year and month are range checked on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Truncates a date to its month.
    pub fn from_date(date: NaiveDate) -> Result<Self, MonthParseError> {
        Self::new(date.year(), date.month())
    }
}

/// Signed month distance from `a` to `b`: `(b.year - a.year) * 12 + (b.month - a.month)`.
pub fn months_between(a: Month, b: Month) -> i64 {
    a.months_until(b)
}

fn digits(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::parse(s)
    }
}

impl TryFrom<NaiveDate> for Month {
    type Error = MonthParseError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        Month::from_date(date)
    }
}

impl From<Month> for NaiveDate {
    fn from(month: Month) -> Self {
        month.first_day()
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Month::parse(&raw).map_err(de::Error::custom)
    }
}
