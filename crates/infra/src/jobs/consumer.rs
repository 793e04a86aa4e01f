//! The job consumer: a single blocking poll loop.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use billflow_billing::{BillingStore, GenerationEngine};
use billflow_core::UserId;

use crate::heartbeat::{Heartbeat, NoopHeartbeat};

use super::store::JobStore;
use super::types::{Job, JobCommand, JobStatus};

/// Consumer tuning knobs.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long to sleep between poll iterations.
    pub poll_interval: Duration,
    /// Hard timeout for opaque shell jobs.
    pub shell_timeout: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            shell_timeout: Duration::from_secs(300),
            name: "bill-date-worker".to_string(),
        }
    }
}

impl ConsumerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }
}

/// Polls the job table and executes one job at a time.
///
/// State machine per job: `pending -> running -> {done, error}`. The
/// `running` transition is written durably before execution begins, so a
/// crash mid-job leaves the row visibly stuck rather than silently pending.
/// Failed jobs are never retried; the loop itself survives every per-job
/// failure, including storage errors while polling (logged, retried next
/// interval).
pub struct JobConsumer<J, B> {
    jobs: J,
    engine: GenerationEngine<B>,
    heartbeat: Box<dyn Heartbeat>,
    config: ConsumerConfig,
}

impl<J, B> JobConsumer<J, B>
where
    J: JobStore,
    B: BillingStore,
{
    pub fn new(jobs: J, engine: GenerationEngine<B>) -> Self {
        Self {
            jobs,
            engine,
            heartbeat: Box::new(NoopHeartbeat),
            config: ConsumerConfig::default(),
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: impl Heartbeat + 'static) -> Self {
        self.heartbeat = Box::new(heartbeat);
        self
    }

    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run forever: heartbeat, poll, execute, sleep.
    pub async fn run(&self) {
        info!(consumer = %self.config.name, "job consumer started");
        loop {
            self.tick().await;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One poll iteration without the sleep. Returns whether a job was
    /// processed.
    pub async fn tick(&self) -> bool {
        self.heartbeat.notify();

        match self.jobs.fetch_next_pending().await {
            Ok(Some(job)) => {
                self.process(&job).await;
                true
            }
            Ok(None) => false,
            Err(err) => {
                // Storage trouble is not fatal to the loop; the next poll
                // re-acquires a connection.
                error!(consumer = %self.config.name, error = %err, "failed to poll job queue");
                false
            }
        }
    }

    async fn process(&self, job: &Job) {
        debug!(job_id = %job.id, command = %job.command, "claimed job");

        if let Err(err) = self
            .jobs
            .update_status(job.id, JobStatus::Running, None)
            .await
        {
            error!(job_id = %job.id, error = %err, "failed to mark job running");
            return;
        }

        let (status, output) = match self.execute(job).await {
            Ok(output) => (JobStatus::Done, output),
            Err(detail) => {
                warn!(job_id = %job.id, detail = %detail, "job failed");
                (JobStatus::Error, detail)
            }
        };

        if let Err(err) = self
            .jobs
            .update_status(job.id, status, Some(&output))
            .await
        {
            error!(job_id = %job.id, error = %err, "failed to record job result");
        } else {
            debug!(job_id = %job.id, %status, "job finished");
        }
    }

    async fn execute(&self, job: &Job) -> Result<String, String> {
        match JobCommand::parse(&job.command) {
            JobCommand::GenerateBillDates(params) => {
                let report = self
                    .engine
                    .generate(UserId::from(params.user_id), params.num_reps)
                    .await
                    .map_err(|e| format!("bill generation failed: {e}"))?;
                Ok(report.summary())
            }
            JobCommand::Shell(command) => {
                run_shell(&command, self.config.shell_timeout).await
            }
        }
    }
}

/// Execute an opaque command through the shell, capturing combined
/// stdout/stderr. Non-zero exit and timeout are both failures carrying the
/// captured output (or timeout notice) as detail.
async fn run_shell(command: &str, timeout: Duration) -> Result<String, String> {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, output).await {
        Err(_) => Err(format!(
            "command timed out after {} seconds",
            timeout.as_secs()
        )),
        Ok(Err(err)) => Err(format!("failed to run command: {err}")),
        Ok(Ok(result)) => {
            let combined = format!(
                "{}\n{}",
                String::from_utf8_lossy(&result.stdout),
                String::from_utf8_lossy(&result.stderr)
            );
            if result.status.success() {
                Ok(combined)
            } else {
                Err(combined)
            }
        }
    }
}
