//! Storage port for bill definitions and occurrences.
//!
//! The engine and its strategies talk to storage only through
//! [`BillingStore`], constructed once and injected. A durable MySQL
//! implementation lives in the infra crate; the in-memory implementation
//! here backs tests and development.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use billflow_core::UserId;

use crate::bill::{Bill, BillDate};
use crate::schedule::parse_date_value;

/// Storage error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Port over bill-definition reads and occurrence writes.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Load all bills for a user, ordered by frequency kind then frequency
    /// type.
    async fn load_bills(&self, user_id: UserId) -> Result<Vec<Bill>, StoreError>;

    /// Delete the entire occurrence table.
    ///
    /// Deliberately NOT scoped to a user: the run rebuilds occurrences for
    /// the requested user only, so other users' rows are lost until their
    /// own generation runs. Do not run the engine concurrently with itself.
    async fn purge_dates(&self) -> Result<(), StoreError>;

    /// Delete `Once` bills whose literal date falls before `cutoff`.
    /// Returns the number of deleted definitions.
    async fn delete_expired_once(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;

    /// Has this exact (description, date, user) triple been materialized?
    async fn date_exists(
        &self,
        description: &str,
        date: NaiveDate,
        user_id: UserId,
    ) -> Result<bool, StoreError>;

    /// Persist one occurrence.
    async fn insert_date(&self, occurrence: &BillDate) -> Result<(), StoreError>;

    /// Occurrences for a user within `[from, to]`, ordered by date then
    /// description.
    async fn list_dates(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BillDate>, StoreError>;
}

/// In-memory billing store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    bills: Vec<Bill>,
    dates: Vec<BillDate>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bill definition.
    pub fn add_bill(&self, bill: Bill) {
        self.inner.lock().unwrap().bills.push(bill);
    }

    /// Snapshot of all stored occurrences, insertion order.
    pub fn dates(&self) -> Vec<BillDate> {
        self.inner.lock().unwrap().dates.clone()
    }

    /// Snapshot of all bill definitions.
    pub fn bills(&self) -> Vec<Bill> {
        self.inner.lock().unwrap().bills.clone()
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn load_bills(&self, user_id: UserId) -> Result<Vec<Bill>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut bills: Vec<Bill> = inner
            .bills
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bills.sort_by(|a, b| {
            a.frequency
                .cmp(&b.frequency)
                .then_with(|| a.frequency_type.cmp(&b.frequency_type))
        });
        Ok(bills)
    }

    async fn purge_dates(&self) -> Result<(), StoreError> {
        self.inner.lock().unwrap().dates.clear();
        Ok(())
    }

    async fn delete_expired_once(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.bills.len();
        inner.bills.retain(|b| {
            if b.frequency != "Once" {
                return true;
            }
            match parse_date_value(&b.frequency_value) {
                Ok(Some(date)) => date >= cutoff,
                // Unparseable or absent dates never expire.
                _ => true,
            }
        });
        Ok((before - inner.bills.len()) as u64)
    }

    async fn date_exists(
        &self,
        description: &str,
        date: NaiveDate,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .dates
            .iter()
            .any(|d| d.description == description && d.date == date && d.user_id == user_id))
    }

    async fn insert_date(&self, occurrence: &BillDate) -> Result<(), StoreError> {
        self.inner.lock().unwrap().dates.push(occurrence.clone());
        Ok(())
    }

    async fn list_dates(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BillDate>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut dates: Vec<BillDate> = inner
            .dates
            .iter()
            .filter(|d| d.user_id == user_id && d.date >= from && d.date <= to)
            .cloned()
            .collect();
        dates.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.description.cmp(&b.description)));
        Ok(dates)
    }
}

#[async_trait]
impl<S: BillingStore + ?Sized> BillingStore for std::sync::Arc<S> {
    async fn load_bills(&self, user_id: UserId) -> Result<Vec<Bill>, StoreError> {
        (**self).load_bills(user_id).await
    }

    async fn purge_dates(&self) -> Result<(), StoreError> {
        (**self).purge_dates().await
    }

    async fn delete_expired_once(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        (**self).delete_expired_once(cutoff).await
    }

    async fn date_exists(
        &self,
        description: &str,
        date: NaiveDate,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        (**self).date_exists(description, date, user_id).await
    }

    async fn insert_date(&self, occurrence: &BillDate) -> Result<(), StoreError> {
        (**self).insert_date(occurrence).await
    }

    async fn list_dates(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BillDate>, StoreError> {
        (**self).list_dates(user_id, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billflow_core::BillId;

    fn once_bill(user: i64, desc: &str, value: &str) -> Bill {
        Bill {
            id: BillId::from_i64(1),
            user_id: UserId::from_i64(user),
            description: desc.to_string(),
            amount_cents: 500,
            frequency: "Once".to_string(),
            frequency_type: String::new(),
            frequency_value: value.to_string(),
            start_date: None,
            end_date: None,
            is_future: false,
            is_heavy: false,
        }
    }

    fn occurrence(user: i64, desc: &str, date: NaiveDate) -> BillDate {
        BillDate {
            description: desc.to_string(),
            user_id: UserId::from_i64(user),
            amount_cents: 500,
            date,
            is_future: false,
            is_heavy: false,
            frequency: "Once".to_string(),
            frequency_type: String::new(),
        }
    }

    #[tokio::test]
    async fn exists_matches_the_exact_triple() {
        let store = InMemoryBillingStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        store.insert_date(&occurrence(1, "Rent", date)).await.unwrap();

        let user = UserId::from_i64(1);
        assert!(store.date_exists("Rent", date, user).await.unwrap());
        assert!(!store.date_exists("Rent", date, UserId::from_i64(2)).await.unwrap());
        assert!(!store.date_exists("Water", date, user).await.unwrap());
        assert!(
            !store
                .date_exists("Rent", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), user)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn purge_clears_every_row() {
        let store = InMemoryBillingStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        store.insert_date(&occurrence(1, "Rent", date)).await.unwrap();
        store.insert_date(&occurrence(2, "Water", date)).await.unwrap();

        store.purge_dates().await.unwrap();
        assert!(store.dates().is_empty());
    }

    #[tokio::test]
    async fn expired_once_bills_are_deleted() {
        let store = InMemoryBillingStore::new();
        store.add_bill(once_bill(1, "Old", "2024-01-01"));
        store.add_bill(once_bill(1, "Fresh", "2024-06-01"));
        store.add_bill(once_bill(1, "Unset", ""));

        let cutoff = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let deleted = store.delete_expired_once(cutoff).await.unwrap();

        assert_eq!(deleted, 1);
        let remaining: Vec<String> =
            store.bills().into_iter().map(|b| b.description).collect();
        assert_eq!(remaining, vec!["Fresh".to_string(), "Unset".to_string()]);
    }

    #[tokio::test]
    async fn bills_are_ordered_by_frequency_then_type() {
        let store = InMemoryBillingStore::new();
        let mut a = once_bill(1, "B", "2024-01-01");
        a.frequency = "Once Per Week".to_string();
        a.frequency_type = "Day of Week".to_string();
        let mut b = once_bill(1, "A", "2024-01-01");
        b.frequency = "Once Per Month".to_string();
        b.frequency_type = "Day of Month".to_string();
        store.add_bill(a);
        store.add_bill(b);

        let bills = store.load_bills(UserId::from_i64(1)).await.unwrap();
        assert_eq!(bills[0].frequency, "Once Per Month");
        assert_eq!(bills[1].frequency, "Once Per Week");
    }

    #[tokio::test]
    async fn list_dates_is_window_scoped_and_ordered() {
        let store = InMemoryBillingStore::new();
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        store.insert_date(&occurrence(1, "Water", d(10))).await.unwrap();
        store.insert_date(&occurrence(1, "Rent", d(10))).await.unwrap();
        store.insert_date(&occurrence(1, "Gym", d(2))).await.unwrap();
        store.insert_date(&occurrence(1, "Out", d(25))).await.unwrap();

        let dates = store
            .list_dates(UserId::from_i64(1), d(1), d(14))
            .await
            .unwrap();
        let names: Vec<&str> = dates.iter().map(|d| d.description.as_str()).collect();
        assert_eq!(names, vec!["Gym", "Rent", "Water"]);
    }
}
