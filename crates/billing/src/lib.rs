//! `billflow-billing` — bill definitions and date generation.
//!
//! The core of the system: expanding a bill's frequency definition into
//! concrete calendar dates within a pay-period window, with idempotent
//! persistence through an injected storage port.

pub mod bill;
pub mod engine;
pub mod pay_period;
pub mod recurrence;
pub mod schedule;
pub mod store;

pub use bill::{Bill, BillDate};
pub use engine::{BillOutcome, GenerationEngine, GenerationReport};
pub use pay_period::PayPeriod;
pub use schedule::{Frequency, Schedule, ScheduleError};
pub use store::{BillingStore, InMemoryBillingStore, StoreError};
