//! Month periods and the injected clock.
//!
//! Benefits are issued per calendar month. A [`MonthPeriod`] is stored as
//! `YYYY-MM` and expires at the end of its last day. Nothing in the ledger reads
//! the wall clock directly: callers pass a [`Clock`].

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

/// A calendar month in which a benefit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    /// Builds a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidPeriod {
                value: format!("{year:04}-{month:02}"),
            });
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Calendar month, 1-based
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the period.
    pub fn first_day(self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| Error::InvalidPeriod {
            value: self.to_string(),
        })
    }

    /// Last calendar day of the period, the benefit expiry date.
    pub fn expires_at(self) -> Result<NaiveDate> {
        self.next()
            .first_day()?
            .pred_opt()
            .ok_or_else(|| Error::InvalidPeriod {
                value: self.to_string(),
            })
    }

    /// The following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// True once `today` is past the expiry date.
    pub fn is_expired_on(self, today: NaiveDate) -> Result<bool> {
        Ok(today > self.expires_at()?)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPeriod {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date (UTC)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Period containing today
    fn current_period(&self) -> MonthPeriod {
        MonthPeriod::containing(self.today())
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on the given date, or `None` for an invalid date.
    #[must_use]
    pub fn on(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let period: MonthPeriod = "2024-03".parse().unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 3);
        assert_eq!(period.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["2024-13", "2024-00", "24-03", "2024/03", "2024-3", "abcd-ef", ""] {
            assert!(
                matches!(bad.parse::<MonthPeriod>(), Err(Error::InvalidPeriod { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_expires_at_last_day_of_month() {
        let feb_leap: MonthPeriod = "2024-02".parse().unwrap();
        assert_eq!(
            feb_leap.expires_at().unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let dec: MonthPeriod = "2023-12".parse().unwrap();
        assert_eq!(
            dec.expires_at().unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_next_and_previous_wrap_years() {
        let dec: MonthPeriod = "2023-12".parse().unwrap();
        assert_eq!(dec.next().to_string(), "2024-01");
        assert_eq!(dec.next().previous(), dec);
    }

    #[test]
    fn test_is_expired_on() {
        let period: MonthPeriod = "2024-01".parse().unwrap();
        let last_day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(!period.is_expired_on(last_day).unwrap());
        assert!(period.is_expired_on(last_day.succ_opt().unwrap()).unwrap());
    }

    #[test]
    fn test_fixed_clock_current_period() {
        let clock = FixedClock::on(2024, 5, 17).unwrap();
        assert_eq!(clock.current_period().to_string(), "2024-05");
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }
}
