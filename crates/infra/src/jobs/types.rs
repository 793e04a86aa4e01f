//! Queue row model and command parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billflow_core::JobId;

/// Command prefix that routes a job to the generation engine instead of the
/// shell.
const GENERATE_PREFIX: &str = "generate_bill_dates";

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, waiting to be picked up.
    Pending,
    /// Currently being executed.
    Running,
    /// Completed successfully.
    Done,
    /// Failed; never retried automatically.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued unit of work.
///
/// The command/payload is owned by the submitter; only the status and output
/// fields are mutated here. Rows are never deleted (the table accumulates as
/// history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub command: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub output: Option<String>,
}

/// Parameters for a bill generation job.
///
/// Field-level serde defaults keep a partial payload usable: `{"user_id": 7}`
/// still gets the default repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    #[serde(default = "default_num_reps")]
    pub num_reps: u32,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            num_reps: default_num_reps(),
        }
    }
}

fn default_user_id() -> i64 {
    1
}

fn default_num_reps() -> u32 {
    42
}

/// A decoded job command.
#[derive(Debug, Clone, PartialEq)]
pub enum JobCommand {
    /// Bill generation request, dispatched to the engine.
    GenerateBillDates(GenerateParams),
    /// Anything else: an opaque shell invocation.
    Shell(String),
}

impl JobCommand {
    /// Decode a job's command string.
    ///
    /// Generation commands are the prefix optionally followed by
    /// `:{"user_id": .., "num_reps": ..}`. Malformed or absent JSON yields
    /// the defaults, not an error.
    pub fn parse(command: &str) -> Self {
        match command.strip_prefix(GENERATE_PREFIX) {
            Some(rest) => {
                let params = rest
                    .strip_prefix(':')
                    .map(str::trim)
                    .filter(|blob| !blob.is_empty())
                    .and_then(|blob| serde_json::from_str::<GenerateParams>(blob).ok())
                    .unwrap_or_default();
                Self::GenerateBillDates(params)
            }
            None => Self::Shell(command.to_string()),
        }
    }
}
