//! Pay-period window derivation.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use billflow_core::{DomainError, DomainResult};

/// Timestamp format accepted for an explicit reference point.
const REFERENCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The `[today, next_pay_day]` window occurrences are generated against.
///
/// Ephemeral value: recomputed per engine invocation, never persisted.
/// `today` keeps the full timestamp precision it was derived from;
/// `next_pay_day` is a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub today: NaiveDateTime,
    pub next_pay_day: NaiveDate,
}

impl PayPeriod {
    /// Window from the current wall-clock time.
    pub fn current() -> Self {
        Self::from_reference(Local::now().naive_local())
    }

    /// Window from an explicit reference timestamp.
    ///
    /// Before the 15th the next pay day is the 14th of the same month;
    /// from the 15th on it is the last calendar day of the month
    /// (leap-year aware).
    pub fn from_reference(reference: NaiveDateTime) -> Self {
        let date = reference.date();
        let next_pay_day = if date.day() < 15 {
            date.with_day(14)
        } else {
            last_day_of_month(date.year(), date.month())
        }
        // Both lookups are infallible for a date that already exists.
        .unwrap_or(date);

        Self {
            today: reference,
            next_pay_day,
        }
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS` reference string into a window.
    pub fn parse_reference(reference: &str) -> DomainResult<Self> {
        let parsed = NaiveDateTime::parse_from_str(reference, REFERENCE_FORMAT)
            .map_err(|e| DomainError::invalid_timestamp(format!("{reference:?}: {e}")))?;
        Ok(Self::from_reference(parsed))
    }

    /// Calendar day of the window start.
    pub fn today_date(&self) -> NaiveDate {
        self.today.date()
    }
}

/// Last calendar day of the given month.
pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.and_then(|d| d.pred_opt())
}
