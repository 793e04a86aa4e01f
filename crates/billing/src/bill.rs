//! Bill definitions and their derived calendar occurrences.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billflow_core::{BillId, UserId};

/// A recurring or one-time payment obligation definition.
///
/// Bill rows are created and edited by the surrounding billing application;
/// this crate only reads them. The frequency fields are kept as the raw
/// strings the schema stores — [`crate::schedule::Schedule::resolve`] turns
/// them into a typed schedule exactly once, at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    pub description: String,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: i64,
    /// Frequency kind, one of a fixed closed set (e.g. `"Once Per Month"`).
    pub frequency: String,
    /// Strategy-specific qualifier (e.g. `"Day of Month"`, `"Starting From"`).
    pub frequency_type: String,
    /// Polymorphic value: day-of-month, weekday index, or a date string,
    /// depending on the frequency kind.
    pub frequency_value: String,
    /// Optional lower bound; `""` or `"0000-00-00"` mean unset.
    pub start_date: Option<String>,
    /// Optional upper bound; `""` or `"0000-00-00"` mean unset.
    pub end_date: Option<String>,
    pub is_future: bool,
    pub is_heavy: bool,
}

/// One concrete calendar-dated occurrence of a bill.
///
/// Occurrences have run-scoped lifetime: the whole table is purged at the
/// start of each generation run and rebuilt from the bill definitions.
/// The originating frequency kind/type are denormalized onto each row for
/// audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDate {
    pub description: String,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub is_future: bool,
    pub is_heavy: bool,
    pub frequency: String,
    pub frequency_type: String,
}

impl BillDate {
    /// Derive an occurrence from its bill at a concrete date.
    pub fn from_bill(bill: &Bill, date: NaiveDate) -> Self {
        Self {
            description: bill.description.clone(),
            user_id: bill.user_id,
            amount_cents: bill.amount_cents,
            date,
            is_future: bill.is_future,
            is_heavy: bill.is_heavy,
            frequency: bill.frequency.clone(),
            frequency_type: bill.frequency_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_copies_bill_fields() {
        let bill = Bill {
            id: BillId::from_i64(1),
            user_id: UserId::from_i64(3),
            description: "Rent".to_string(),
            amount_cents: 120_000,
            frequency: "Once Per Month".to_string(),
            frequency_type: "Day of Month".to_string(),
            frequency_value: "1".to_string(),
            start_date: None,
            end_date: None,
            is_future: false,
            is_heavy: true,
        };

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let occurrence = BillDate::from_bill(&bill, date);

        assert_eq!(occurrence.description, "Rent");
        assert_eq!(occurrence.user_id, bill.user_id);
        assert_eq!(occurrence.amount_cents, 120_000);
        assert_eq!(occurrence.date, date);
        assert!(occurrence.is_heavy);
        assert_eq!(occurrence.frequency, "Once Per Month");
    }
}
