//! MySQL-backed storage for bills, occurrences, and the job queue.
//!
//! One [`MySqlStore`] implements both storage ports over a single connection
//! pool. The worker runs it with a pool of one connection: a single
//! consumer loop serializes every call, so no further locking is needed.
//!
//! ## Expected schema
//!
//! | Table | Columns |
//! |-------|---------|
//! | `bills` | `id BIGINT PK`, `user_id BIGINT`, `description TEXT`, `amount_cents BIGINT`, `frequency VARCHAR`, `frequency_type VARCHAR`, `frequency_value VARCHAR`, `start_date VARCHAR NULL`, `end_date VARCHAR NULL`, `is_future BOOL`, `is_heavy BOOL` |
//! | `bill_dates` | `id BIGINT PK AUTO_INCREMENT`, `description TEXT`, `user_id BIGINT`, `amount_cents BIGINT`, `date DATE`, `is_future BOOL`, `is_heavy BOOL`, `frequency VARCHAR`, `frequency_type VARCHAR` |
//! | `date_jobs` | `id BIGINT PK AUTO_INCREMENT`, `command TEXT`, `status VARCHAR`, `created_at TIMESTAMP`, `output TEXT NULL` |
//!
//! The `bills` and `bill_dates` schemas are owned by the surrounding billing
//! application; `frequency_value` and the bound columns stay VARCHAR because
//! legacy rows carry `""`/`"0000-00-00"` sentinels that the DATE type would
//! reject. There is deliberately no uniqueness constraint on
//! `(description, date, user_id)` — the existence guard enforces it.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tracing::instrument;

use billflow_billing::{Bill, BillDate, BillingStore, StoreError};
use billflow_core::{BillId, JobId, UserId};

use crate::jobs::store::JobStore;
use crate::jobs::types::{Job, JobStatus};

/// MySQL adapter for both the billing store and the job store.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connect with a single-connection pool, the worker's default shape.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(operation.to_string()),
        other => StoreError::Storage(format!("{operation}: {other}")),
    }
}

fn bill_from_row(row: &MySqlRow) -> Result<Bill, sqlx::Error> {
    Ok(Bill {
        id: BillId::from_i64(row.try_get("id")?),
        user_id: UserId::from_i64(row.try_get("user_id")?),
        description: row.try_get("description")?,
        amount_cents: row.try_get("amount_cents")?,
        frequency: row.try_get("frequency")?,
        frequency_type: row.try_get("frequency_type")?,
        frequency_value: row.try_get("frequency_value")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_future: row.try_get("is_future")?,
        is_heavy: row.try_get("is_heavy")?,
    })
}

fn bill_date_from_row(row: &MySqlRow) -> Result<BillDate, sqlx::Error> {
    Ok(BillDate {
        description: row.try_get("description")?,
        user_id: UserId::from_i64(row.try_get("user_id")?),
        amount_cents: row.try_get("amount_cents")?,
        date: row.try_get("date")?,
        is_future: row.try_get("is_future")?,
        is_heavy: row.try_get("is_heavy")?,
        frequency: row.try_get("frequency")?,
        frequency_type: row.try_get("frequency_type")?,
    })
}

fn job_from_row(row: &MySqlRow) -> Result<Job, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = JobStatus::parse(&status).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown job status {status:?}").into())
    })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Job {
        id: JobId::from_i64(row.try_get("id")?),
        command: row.try_get("command")?,
        status,
        created_at,
        output: row.try_get("output")?,
    })
}

#[async_trait]
impl BillingStore for MySqlStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn load_bills(&self, user_id: UserId) -> Result<Vec<Bill>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, description, amount_cents,
                   frequency, frequency_type, frequency_value,
                   start_date, end_date, is_future, is_heavy
            FROM bills
            WHERE user_id = ?
            ORDER BY frequency, frequency_type
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_bills", e))?;

        rows.iter()
            .map(|row| {
                bill_from_row(row)
                    .map_err(|e| StoreError::Storage(format!("load_bills: bad row: {e}")))
            })
            .collect()
    }

    async fn purge_dates(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE TABLE bill_dates")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_dates", e))?;
        Ok(())
    }

    async fn delete_expired_once(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        // STR_TO_DATE yields NULL for the ""/"0000-00-00" sentinels and any
        // garbage value, and NULL comparisons are never true, so only
        // well-formed past dates match.
        let result = sqlx::query(
            r#"
            DELETE FROM bills
            WHERE frequency = 'Once'
              AND STR_TO_DATE(frequency_value, '%Y-%m-%d') < ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_expired_once", e))?;
        Ok(result.rows_affected())
    }

    async fn date_exists(
        &self,
        description: &str,
        date: NaiveDate,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id FROM bill_dates
            WHERE description = ? AND date = ? AND user_id = ?
            LIMIT 1
            "#,
        )
        .bind(description)
        .bind(date)
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("date_exists", e))?;
        Ok(row.is_some())
    }

    async fn insert_date(&self, occurrence: &BillDate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bill_dates
                (description, user_id, amount_cents, date,
                 is_future, is_heavy, frequency, frequency_type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&occurrence.description)
        .bind(occurrence.user_id.as_i64())
        .bind(occurrence.amount_cents)
        .bind(occurrence.date)
        .bind(occurrence.is_future)
        .bind(occurrence.is_heavy)
        .bind(&occurrence.frequency)
        .bind(&occurrence.frequency_type)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_date", e))?;
        Ok(())
    }

    async fn list_dates(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BillDate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT description, user_id, amount_cents, date,
                   is_future, is_heavy, frequency, frequency_type
            FROM bill_dates
            WHERE user_id = ? AND date BETWEEN ? AND ?
            ORDER BY date, description
            "#,
        )
        .bind(user_id.as_i64())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_dates", e))?;

        rows.iter()
            .map(|row| {
                bill_date_from_row(row)
                    .map_err(|e| StoreError::Storage(format!("list_dates: bad row: {e}")))
            })
            .collect()
    }
}

#[async_trait]
impl JobStore for MySqlStore {
    async fn enqueue(&self, command: &str) -> Result<JobId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO date_jobs (command, status, created_at) VALUES (?, 'pending', NOW())",
        )
        .bind(command)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("enqueue", e))?;
        Ok(JobId::from_i64(result.last_insert_id() as i64))
    }

    async fn fetch_next_pending(&self) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, command, status, created_at, output
            FROM date_jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_next_pending", e))?;

        row.as_ref()
            .map(|r| {
                job_from_row(r)
                    .map_err(|e| StoreError::Storage(format!("fetch_next_pending: bad row: {e}")))
            })
            .transpose()
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE date_jobs SET status = ?, output = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(output)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("job {id}")));
        }
        Ok(())
    }
}
