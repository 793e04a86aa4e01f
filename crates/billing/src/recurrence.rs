//! Recurrence expansion: one routine per schedule variant.
//!
//! Every candidate date is checked against the existence guard immediately
//! before its insert, not batched, so a later candidate in the same run
//! observes earlier inserts. Re-running a strategy over the same window is
//! therefore a no-op.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::bill::{Bill, BillDate};
use crate::pay_period::PayPeriod;
use crate::schedule::Schedule;
use crate::store::{BillingStore, StoreError};

/// Expand a resolved schedule into occurrences within the window context.
///
/// Returns the number of occurrences actually inserted (candidates already
/// present count as zero).
pub async fn expand<S>(
    store: &S,
    bill: &Bill,
    schedule: &Schedule,
    window: &PayPeriod,
    reps: u32,
) -> Result<u32, StoreError>
where
    S: BillingStore + ?Sized,
{
    match schedule {
        Schedule::Once { date: None } => Ok(0),
        Schedule::Once { date: Some(date) } => {
            Ok(u32::from(insert_if_absent(store, bill, *date).await?))
        }
        Schedule::MonthlyByDay { day, start, end } => {
            monthly_by_day(store, bill, *day, *start, *end, window, reps).await
        }
        Schedule::EveryNMonths { anchor, months } => {
            // A month is approximated as exactly 30 days.
            let interval = Duration::days(i64::from((*months).max(1)) * 30);
            stepped(store, bill, *anchor, interval, reps).await
        }
        Schedule::WeeklyByWeekday { weekday } => {
            weekly_by_weekday(store, bill, *weekday, window, reps).await
        }
        Schedule::EveryNWeeks { anchor, weeks } => {
            let interval = Duration::days(i64::from((*weeks).max(1)) * 7);
            stepped(store, bill, *anchor, interval, reps).await
        }
    }
}

/// The date-existence guard: insert the occurrence unless its
/// (description, date, user) triple is already materialized.
///
/// This is the system's idempotency primitive; uniqueness is enforced here,
/// not by a storage constraint.
pub async fn insert_if_absent<S>(
    store: &S,
    bill: &Bill,
    date: NaiveDate,
) -> Result<bool, StoreError>
where
    S: BillingStore + ?Sized,
{
    if store
        .date_exists(&bill.description, date, bill.user_id)
        .await?
    {
        debug!(bill = %bill.description, %date, "occurrence already exists");
        return Ok(false);
    }
    store.insert_date(&BillDate::from_bill(bill, date)).await?;
    Ok(true)
}

/// One candidate per month on a fixed day, starting at the window's current
/// month and wrapping the year at December.
///
/// February clamps a target day above 28 down to 28; other calendar-invalid
/// constructions (day 31 in a 30-day month) skip that month without
/// aborting the rest.
async fn monthly_by_day<S>(
    store: &S,
    bill: &Bill,
    target_day: u32,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    window: &PayPeriod,
    reps: u32,
) -> Result<u32, StoreError>
where
    S: BillingStore + ?Sized,
{
    let mut year = window.today.year();
    let mut month = window.today.month();
    let mut inserted = 0;

    for _ in 0..reps {
        let day = if month == 2 && target_day > 28 {
            28
        } else {
            target_day
        };

        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let within_bounds =
                end.is_none_or(|e| date <= e) && start.is_none_or(|s| date >= s);
            if within_bounds && insert_if_absent(store, bill, date).await? {
                inserted += 1;
            }
        }

        if month < 12 {
            month += 1;
        } else {
            month = 1;
            year += 1;
        }
    }

    Ok(inserted)
}

/// Weekly on a fixed internal weekday (Monday=0): the first occurrence is
/// the next strictly-future matching weekday, then every 7 days.
async fn weekly_by_weekday<S>(
    store: &S,
    bill: &Bill,
    target_weekday: u32,
    window: &PayPeriod,
    reps: u32,
) -> Result<u32, StoreError>
where
    S: BillingStore + ?Sized,
{
    let today = window.today_date();
    let current = i64::from(today.weekday().num_days_from_monday());
    let mut offset = i64::from(target_weekday) - current;
    if offset <= 0 {
        // Never same-day: always move strictly forward.
        offset += 7;
    }

    let mut inserted = 0;
    for i in 0..i64::from(reps) {
        let Some(date) = today.checked_add_signed(Duration::days(offset + i * 7)) else {
            break;
        };
        if insert_if_absent(store, bill, date).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Compounding cursor: each occurrence is one interval past the previous,
/// starting one interval past the anchor.
async fn stepped<S>(
    store: &S,
    bill: &Bill,
    anchor: NaiveDate,
    interval: Duration,
    reps: u32,
) -> Result<u32, StoreError>
where
    S: BillingStore + ?Sized,
{
    let mut cursor = anchor;
    let mut inserted = 0;

    for _ in 0..reps {
        let Some(next) = cursor.checked_add_signed(interval) else {
            break;
        };
        cursor = next;
        if insert_if_absent(store, bill, cursor).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
