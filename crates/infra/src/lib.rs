//! Infrastructure layer: durable storage, job queue, supervisor signaling.

pub mod heartbeat;
pub mod jobs;
pub mod store;

pub use heartbeat::{Heartbeat, NoopHeartbeat, SystemdWatchdog};
pub use jobs::{ConsumerConfig, InMemoryJobStore, Job, JobCommand, JobConsumer, JobStatus, JobStore};
pub use store::MySqlStore;
