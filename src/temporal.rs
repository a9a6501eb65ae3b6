// 📅 Periods - month/year arithmetic for balances and bucketing
//
// A Period is a calendar month. Its PeriodKey encodes it as year*100+month
// (201701 = January 2017), which sorts in calendar order.
//
// Balance queries ask "as of month M": every register strictly before the
// first instant of month M+1 counts.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PERIOD KEY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey(i32);

impl PeriodKey {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// PERIOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Build a period, rejecting months outside 1..=12 and years chrono
    /// cannot represent
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::validation(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        let years = NaiveDate::MIN.year()..=NaiveDate::MAX.year();
        if !years.contains(&year) {
            return Err(LedgerError::validation(format!(
                "year must be between {} and {}, got {}",
                years.start(),
                years.end(),
                year
            )));
        }
        Ok(Period { year, month })
    }

    /// Period containing the given instant, as seen in that instant's zone
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Period {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// Current month in local time
    pub fn current() -> Self {
        Self::of(&Local::now())
    }

    pub fn key(&self) -> PeriodKey {
        PeriodKey(self.year.saturating_mul(100).saturating_add(self.month as i32))
    }

    /// The month after this one (December wraps to January of next year)
    pub fn next(&self) -> Self {
        if self.month >= 12 {
            Period {
                year: self.year.saturating_add(1),
                month: 1,
            }
        } else {
            Period {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First instant of this month in `tz`, expressed in UTC
    pub fn start_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Utc>> {
        // Zones whose DST change happens at midnight have no 00:00 on that day
        tz.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .earliest()
            .or_else(|| tz.with_ymd_and_hms(self.year, self.month, 1, 1, 0, 0).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                LedgerError::validation(format!("{} is not a representable month", self))
            })
    }

    /// Exclusive upper bound for "as of the end of this month"
    pub fn end_bound_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Utc>> {
        self.next().start_in(tz)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ============================================================================
// TESTS
// ============================================================================
