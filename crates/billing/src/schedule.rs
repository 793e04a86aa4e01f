//! Frequency resolution: raw bill fields to a typed schedule.
//!
//! A bill row carries its recurrence as three loosely-typed strings
//! (`frequency`, `frequency_type`, `frequency_value`). [`Schedule::resolve`]
//! interprets them exactly once, so each expansion strategy receives
//! strongly-typed parameters instead of re-parsing strings mid-loop.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bill::Bill;

/// Date format used by bill date values and bounds.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Recurrence pattern category. Closed set: anything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Once,
    OncePerMonth,
    EveryMonths(u32),
    OncePerWeek,
    EveryWeeks(u32),
}

impl Frequency {
    /// Parse the frequency kind string stored on a bill row.
    ///
    /// The set is fixed: the external editor only writes these labels, and an
    /// unrecognized kind must be skipped rather than guessed at.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Once" => Some(Self::Once),
            "Once Per Month" => Some(Self::OncePerMonth),
            "Every 1 Month" => Some(Self::EveryMonths(1)),
            "Every 3 Months" => Some(Self::EveryMonths(3)),
            "Once Per Week" => Some(Self::OncePerWeek),
            "Every 1 Week" => Some(Self::EveryWeeks(1)),
            "Every 2 Weeks" => Some(Self::EveryWeeks(2)),
            "Every 4 Weeks" => Some(Self::EveryWeeks(4)),
            _ => None,
        }
    }
}

/// Why a bill's schedule could not be resolved.
///
/// These are validation outcomes, not failures: the affected bill is skipped
/// with the reason recorded, and the batch continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unrecognized frequency kind {0:?}")]
    UnknownFrequency(String),

    #[error("unsupported frequency type {frequency_type:?} for {frequency:?}")]
    UnsupportedType {
        frequency: String,
        frequency_type: String,
    },

    #[error("invalid day of month {0:?} (expected 1-31)")]
    InvalidDayOfMonth(String),

    #[error("invalid day of week {0:?} (expected 0-6, Sunday=0)")]
    InvalidDayOfWeek(String),

    #[error("missing anchor date")]
    MissingAnchor,

    #[error("invalid anchor date {0:?}")]
    InvalidAnchor(String),

    #[error("invalid bound date {0:?}")]
    InvalidBound(String),
}

/// A bill's recurrence, resolved to typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// Single occurrence at a literal date; `None` means no occurrence.
    Once { date: Option<NaiveDate> },
    /// One occurrence per month on a fixed day, bounded optionally.
    MonthlyByDay {
        day: u32,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    /// Compounding cursor from an anchor, stepping `months * 30` days.
    EveryNMonths { anchor: NaiveDate, months: u32 },
    /// One occurrence per week on a fixed weekday (internal Monday=0).
    WeeklyByWeekday { weekday: u32 },
    /// Compounding cursor from an anchor, stepping `weeks * 7` days.
    EveryNWeeks { anchor: NaiveDate, weeks: u32 },
}

impl Schedule {
    /// Resolve a bill's raw frequency fields into a typed schedule.
    pub fn resolve(bill: &Bill) -> Result<Self, ScheduleError> {
        let frequency = Frequency::parse(&bill.frequency)
            .ok_or_else(|| ScheduleError::UnknownFrequency(bill.frequency.clone()))?;

        match frequency {
            Frequency::Once => Ok(Self::Once {
                date: parse_date_value(&bill.frequency_value)
                    .map_err(ScheduleError::InvalidAnchor)?,
            }),
            Frequency::OncePerMonth => {
                require_type(bill, "Day of Month")?;
                let day = parse_day(&bill.frequency_value, 1, 31)
                    .ok_or_else(|| ScheduleError::InvalidDayOfMonth(bill.frequency_value.clone()))?;
                Ok(Self::MonthlyByDay {
                    day,
                    start: parse_bound(bill.start_date.as_deref())?,
                    end: parse_bound(bill.end_date.as_deref())?,
                })
            }
            Frequency::EveryMonths(months) => {
                require_type(bill, "Starting From")?;
                Ok(Self::EveryNMonths {
                    anchor: required_anchor(&bill.frequency_value)?,
                    months,
                })
            }
            Frequency::OncePerWeek => {
                require_type(bill, "Day of Week")?;
                let legacy = parse_day(&bill.frequency_value, 0, 6)
                    .ok_or_else(|| ScheduleError::InvalidDayOfWeek(bill.frequency_value.clone()))?;
                Ok(Self::WeeklyByWeekday {
                    weekday: from_legacy_weekday(legacy),
                })
            }
            Frequency::EveryWeeks(weeks) => {
                require_type(bill, "Starting From")?;
                Ok(Self::EveryNWeeks {
                    anchor: required_anchor(&bill.frequency_value)?,
                    weeks,
                })
            }
        }
    }
}

/// Normalize a date-like value: `""` and `"0000-00-00"` are absent, anything
/// else must parse as `YYYY-MM-DD`.
pub fn parse_date_value(value: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "0000-00-00" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| trimmed.to_string())
}

fn required_anchor(value: &str) -> Result<NaiveDate, ScheduleError> {
    parse_date_value(value)
        .map_err(ScheduleError::InvalidAnchor)?
        .ok_or(ScheduleError::MissingAnchor)
}

fn parse_bound(value: Option<&str>) -> Result<Option<NaiveDate>, ScheduleError> {
    match value {
        None => Ok(None),
        Some(v) => parse_date_value(v).map_err(ScheduleError::InvalidBound),
    }
}

fn require_type(bill: &Bill, expected: &str) -> Result<(), ScheduleError> {
    if bill.frequency_type == expected {
        Ok(())
    } else {
        Err(ScheduleError::UnsupportedType {
            frequency: bill.frequency.clone(),
            frequency_type: bill.frequency_type.clone(),
        })
    }
}

fn parse_day(value: &str, min: u32, max: u32) -> Option<u32> {
    let day = value.trim().parse::<u32>().ok()?;
    (min..=max).contains(&day).then_some(day)
}

/// Convert the legacy Sunday=0..Saturday=6 weekday convention to the
/// internal Monday=0 convention: Sunday(0) becomes 6, everything else
/// shifts down by one.
fn from_legacy_weekday(legacy: u32) -> u32 {
    if legacy == 0 { 6 } else { legacy - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billflow_core::{BillId, UserId};

    fn bill(frequency: &str, frequency_type: &str, value: &str) -> Bill {
        Bill {
            id: BillId::from_i64(1),
            user_id: UserId::from_i64(1),
            description: "Test".to_string(),
            amount_cents: 1000,
            frequency: frequency.to_string(),
            frequency_type: frequency_type.to_string(),
            frequency_value: value.to_string(),
            start_date: None,
            end_date: None,
            is_future: false,
            is_heavy: false,
        }
    }

    #[test]
    fn parses_the_closed_frequency_set() {
        assert_eq!(Frequency::parse("Once"), Some(Frequency::Once));
        assert_eq!(Frequency::parse("Every 3 Months"), Some(Frequency::EveryMonths(3)));
        assert_eq!(Frequency::parse("Every 4 Weeks"), Some(Frequency::EveryWeeks(4)));
        assert_eq!(Frequency::parse("Every 5 Weeks"), None);
        assert_eq!(Frequency::parse("once"), None);
    }

    #[test]
    fn resolves_monthly_by_day() {
        let schedule = Schedule::resolve(&bill("Once Per Month", "Day of Month", "15")).unwrap();
        assert_eq!(
            schedule,
            Schedule::MonthlyByDay {
                day: 15,
                start: None,
                end: None
            }
        );
    }

    #[test]
    fn monthly_rejects_out_of_range_days() {
        for value in ["0", "32", "abc", ""] {
            let err = Schedule::resolve(&bill("Once Per Month", "Day of Month", value)).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidDayOfMonth(_)), "value {value:?}");
        }
    }

    #[test]
    fn monthly_rejects_wrong_type() {
        let err = Schedule::resolve(&bill("Once Per Month", "Starting From", "15")).unwrap_err();
        assert!(matches!(err, ScheduleError::UnsupportedType { .. }));
    }

    #[test]
    fn monthly_normalizes_bounds() {
        let mut b = bill("Once Per Month", "Day of Month", "15");
        b.start_date = Some("0000-00-00".to_string());
        b.end_date = Some("2024-06-30".to_string());

        let schedule = Schedule::resolve(&b).unwrap();
        assert_eq!(
            schedule,
            Schedule::MonthlyByDay {
                day: 15,
                start: None,
                end: NaiveDate::from_ymd_opt(2024, 6, 30),
            }
        );
    }

    #[test]
    fn weekly_converts_legacy_sunday() {
        // Legacy Sunday=0 becomes internal 6 (Monday=0 convention).
        let schedule = Schedule::resolve(&bill("Once Per Week", "Day of Week", "0")).unwrap();
        assert_eq!(schedule, Schedule::WeeklyByWeekday { weekday: 6 });

        // Legacy Wednesday=3 becomes internal 2.
        let schedule = Schedule::resolve(&bill("Once Per Week", "Day of Week", "3")).unwrap();
        assert_eq!(schedule, Schedule::WeeklyByWeekday { weekday: 2 });
    }

    #[test]
    fn weekly_rejects_out_of_range() {
        let err = Schedule::resolve(&bill("Once Per Week", "Day of Week", "7")).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDayOfWeek(_)));
    }

    #[test]
    fn once_normalizes_absent_dates() {
        let schedule = Schedule::resolve(&bill("Once", "", "")).unwrap();
        assert_eq!(schedule, Schedule::Once { date: None });

        let schedule = Schedule::resolve(&bill("Once", "", "0000-00-00")).unwrap();
        assert_eq!(schedule, Schedule::Once { date: None });

        let schedule = Schedule::resolve(&bill("Once", "", "2024-05-01")).unwrap();
        assert_eq!(
            schedule,
            Schedule::Once {
                date: NaiveDate::from_ymd_opt(2024, 5, 1)
            }
        );
    }

    #[test]
    fn every_n_requires_an_anchor() {
        let err = Schedule::resolve(&bill("Every 2 Weeks", "Starting From", "")).unwrap_err();
        assert!(matches!(err, ScheduleError::MissingAnchor));

        let err = Schedule::resolve(&bill("Every 3 Months", "Starting From", "nope")).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidAnchor(_)));
    }

    #[test]
    fn unknown_frequency_is_reported() {
        let err = Schedule::resolve(&bill("Fortnightly", "Day of Month", "1")).unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownFrequency(_)));
    }
}
