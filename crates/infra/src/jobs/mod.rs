//! Job queue: submitted work rows consumed by a single polling worker.
//!
//! ## Design
//!
//! - Jobs are plain table rows: a command string, a status, an output text
//! - Status machine per job: `pending -> running -> {done, error}`;
//!   terminal states are never revisited
//! - Failed jobs stay `error` permanently; re-processing requires a new row
//! - One consumer, blocking poll loop; concurrent consumers are unsupported
//!   (fetch and mark-running are not atomic against a second instance)
//!
//! ## Components
//!
//! - `Job` / `JobStatus` / `JobCommand`: queue row model and command parsing
//! - `JobStore`: persistence for jobs (in-memory or MySQL)
//! - `JobConsumer`: the polling loop dispatching to the generation engine or
//!   to opaque shell execution

pub mod consumer;
pub mod store;
pub mod types;

pub use consumer::{ConsumerConfig, JobConsumer};
pub use store::{InMemoryJobStore, JobStore};
pub use types::{GenerateParams, Job, JobCommand, JobStatus};
