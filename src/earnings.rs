//! Earnings-date interpretation
//!
//! Providers report announcement dates either as plain calendar dates or as
//! timestamps. Both are reduced to the calendar date the provider wrote down
//! (the timestamp's own local date) before comparing; time-of-day and
//! timezone conversion are deliberately ignored.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// One announced or estimated earnings date as delivered by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum EarningsDate {
    Day(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
    /// Timestamp without an offset, taken at face value
    Naive(NaiveDateTime),
}

impl EarningsDate {
    /// Calendar date, no time-of-day
    #[inline]
    pub fn calendar_date(&self) -> NaiveDate {
        match self {
            Self::Day(date) => *date,
            Self::Timestamp(ts) => ts.date_naive(),
            Self::Naive(ts) => ts.date(),
        }
    }
}

impl From<NaiveDate> for EarningsDate {
    fn from(date: NaiveDate) -> Self {
        Self::Day(date)
    }
}

impl From<DateTime<FixedOffset>> for EarningsDate {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<NaiveDateTime> for EarningsDate {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Naive(ts)
    }
}

/// Whether any entry falls on `target`
pub fn matches_target_date(dates: &[EarningsDate], target: NaiveDate) -> bool {
    dates.iter().any(|d| d.calendar_date() == target)
}

/// First entry in provider order, for display
pub fn first_date(dates: &[EarningsDate]) -> Option<NaiveDate> {
    dates.first().map(EarningsDate::calendar_date)
}
