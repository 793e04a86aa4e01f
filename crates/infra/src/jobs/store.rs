//! Job queue persistence.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use billflow_billing::StoreError;
use billflow_core::JobId;

use super::types::{Job, JobStatus};

/// Persistence port for the job queue.
///
/// `fetch_next_pending` and the `Running` transition are deliberately two
/// separate writes: the design assumes a single consumer, and a second
/// instance could double-claim a job between them.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new pending job. This is the submission-side interface; the
    /// consumer itself never enqueues.
    async fn enqueue(&self, command: &str) -> Result<JobId, StoreError>;

    /// The oldest pending job (FIFO by creation time), if any.
    async fn fetch_next_pending(&self) -> Result<Option<Job>, StoreError>;

    /// Record a status transition, replacing the output text.
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: Vec<Job>,
    next_id: i64,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue with an explicit creation time, for deterministic ordering in
    /// tests.
    pub fn enqueue_at(&self, command: &str, created_at: DateTime<Utc>) -> JobId {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = JobId::from_i64(inner.next_id);
        inner.jobs.push(Job {
            id,
            command: command.to_string(),
            status: JobStatus::Pending,
            created_at,
            output: None,
        });
        id
    }

    /// Look up a job by id.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    /// Snapshot of all rows, submission order.
    pub fn jobs(&self) -> Vec<Job> {
        self.inner.lock().unwrap().jobs.clone()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, command: &str) -> Result<JobId, StoreError> {
        Ok(self.enqueue_at(command, Utc::now()))
    }

    async fn fetch_next_pending(&self) -> Result<Option<Job>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.created_at)
            .cloned())
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        job.status = status;
        job.output = output.map(str::to_string);
        Ok(())
    }
}

#[async_trait]
impl<S: JobStore + ?Sized> JobStore for std::sync::Arc<S> {
    async fn enqueue(&self, command: &str) -> Result<JobId, StoreError> {
        (**self).enqueue(command).await
    }

    async fn fetch_next_pending(&self) -> Result<Option<Job>, StoreError> {
        (**self).fetch_next_pending().await
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<&str>,
    ) -> Result<(), StoreError> {
        (**self).update_status(id, status, output).await
    }
}
