//! Generation engine: expand every bill of a user into dated occurrences.

use chrono::{Duration, Local};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use billflow_core::UserId;

use crate::bill::Bill;
use crate::pay_period::PayPeriod;
use crate::recurrence;
use crate::schedule::Schedule;
use crate::store::{BillingStore, StoreError};

/// `Once` bills whose date is further in the past than this are deleted at
/// the start of a run.
const ONCE_EXPIRY_DAYS: i64 = 2;

/// Outcome of processing a single bill within a run.
///
/// Validation problems and per-bill failures are recorded here instead of
/// aborting the batch: one malformed bill must never stop the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BillOutcome {
    Generated { description: String, inserted: u32 },
    Skipped { description: String, reason: String },
    Failed { description: String, error: String },
}

/// Aggregated result of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub user_id: UserId,
    pub window: PayPeriod,
    pub outcomes: Vec<BillOutcome>,
}

impl GenerationReport {
    /// Total occurrences inserted across all bills.
    pub fn inserted(&self) -> u32 {
        self.outcomes
            .iter()
            .map(|o| match o {
                BillOutcome::Generated { inserted, .. } => *inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn generated_count(&self) -> usize {
        self.count(|o| matches!(o, BillOutcome::Generated { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, BillOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, BillOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&BillOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    /// Human-readable summary, recorded as the job's output text.
    pub fn summary(&self) -> String {
        format!(
            "bill date generation completed for user {}: {} dates inserted across {} bills ({} skipped, {} failed)",
            self.user_id,
            self.inserted(),
            self.generated_count(),
            self.skipped_count(),
            self.failed_count(),
        )
    }
}

/// Expands a user's bill definitions into concrete occurrences.
///
/// Holds the injected storage port; one engine instance serves the whole
/// consumer lifetime.
#[derive(Debug, Clone)]
pub struct GenerationEngine<S> {
    store: S,
}

impl<S: BillingStore> GenerationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run a full generation pass for `user_id` with `reps` repetitions per
    /// recurring bill.
    ///
    /// Purges the occurrence table (all users — see
    /// [`BillingStore::purge_dates`]), drops expired `Once` bills, then
    /// expands each of the user's bills in frequency order. Per-bill
    /// problems become [`BillOutcome`]s; only storage failures in the
    /// run-level steps are fatal.
    pub async fn generate(&self, user_id: UserId, reps: u32) -> Result<GenerationReport, StoreError> {
        let now = Local::now().naive_local();
        self.generate_at(user_id, reps, PayPeriod::from_reference(now)).await
    }

    /// Generation pass against an explicit window; `generate` derives the
    /// window from the wall clock.
    pub async fn generate_at(
        &self,
        user_id: UserId,
        reps: u32,
        window: PayPeriod,
    ) -> Result<GenerationReport, StoreError> {
        info!(%user_id, reps, "starting bill date generation");

        self.store.purge_dates().await?;
        let cutoff = window.today_date() - Duration::days(ONCE_EXPIRY_DAYS);
        let expired = self.store.delete_expired_once(cutoff).await?;
        if expired > 0 {
            debug!(expired, "deleted expired one-time bills");
        }

        let bills = self.store.load_bills(user_id).await?;
        debug!(count = bills.len(), "loaded bill definitions");

        let mut outcomes = Vec::with_capacity(bills.len());
        for bill in &bills {
            outcomes.push(self.process_bill(bill, &window, reps).await);
        }

        let report = GenerationReport {
            user_id,
            window,
            outcomes,
        };
        info!(
            %user_id,
            inserted = report.inserted(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "bill date generation finished"
        );
        Ok(report)
    }

    async fn process_bill(&self, bill: &Bill, window: &PayPeriod, reps: u32) -> BillOutcome {
        debug!(
            bill_id = %bill.id,
            bill = %bill.description,
            frequency = %bill.frequency,
            "processing bill"
        );

        let schedule = match Schedule::resolve(bill) {
            Ok(schedule) => schedule,
            Err(reason) => {
                warn!(
                    bill_id = %bill.id,
                    bill = %bill.description,
                    frequency = %bill.frequency,
                    %reason,
                    "skipping bill"
                );
                return BillOutcome::Skipped {
                    description: bill.description.clone(),
                    reason: reason.to_string(),
                };
            }
        };

        match recurrence::expand(&self.store, bill, &schedule, window, reps).await {
            Ok(inserted) => BillOutcome::Generated {
                description: bill.description.clone(),
                inserted,
            },
            Err(err) => {
                error!(
                    bill_id = %bill.id,
                    bill = %bill.description,
                    frequency = %bill.frequency,
                    error = %err,
                    "bill processing failed"
                );
                BillOutcome::Failed {
                    description: bill.description.clone(),
                    error: err.to_string(),
                }
            }
        }
    }
}
