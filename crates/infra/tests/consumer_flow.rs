//! Black-box test of the consumer flow through public APIs only:
//! enqueue a job row, tick the consumer, observe status and output.

use std::sync::Arc;
use std::time::Duration;

use billflow_billing::{Bill, GenerationEngine, InMemoryBillingStore};
use billflow_core::{BillId, UserId};
use billflow_infra::{ConsumerConfig, InMemoryJobStore, JobConsumer, JobStatus, JobStore};

fn bill(user: i64, desc: &str, frequency: &str, frequency_type: &str, value: &str) -> Bill {
    Bill {
        id: BillId::from_i64(1),
        user_id: UserId::from_i64(user),
        description: desc.to_string(),
        amount_cents: 2500,
        frequency: frequency.to_string(),
        frequency_type: frequency_type.to_string(),
        frequency_value: value.to_string(),
        start_date: None,
        end_date: None,
        is_future: false,
        is_heavy: false,
    }
}

#[tokio::test]
async fn mixed_batch_completes_as_done() {
    let jobs = Arc::new(InMemoryJobStore::new());
    let billing = Arc::new(InMemoryBillingStore::new());

    // One bill the engine cannot recognize, one valid monthly bill.
    billing.add_bill(bill(1, "Mystery", "Every Blue Moon", "", ""));
    billing.add_bill(bill(1, "Rent", "Once Per Month", "Day of Month", "10"));

    let consumer = JobConsumer::new(jobs.clone(), GenerationEngine::new(billing.clone()));
    let id = jobs
        .enqueue("generate_bill_dates:{\"num_reps\": 4}")
        .await
        .unwrap();

    assert!(consumer.tick().await);

    let job = jobs.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    let output = job.output.unwrap();
    assert!(output.contains("4 dates inserted"), "output: {output}");
    assert!(output.contains("1 skipped"), "output: {output}");

    // The valid bill produced its occurrences despite the unrecognized one.
    let dates = billing.dates();
    assert_eq!(dates.len(), 4);
    assert!(dates.iter().all(|d| d.description == "Rent"));
}

#[tokio::test]
async fn queue_drains_jobs_in_order_across_kinds() {
    let jobs = Arc::new(InMemoryJobStore::new());
    let billing = Arc::new(InMemoryBillingStore::new());
    billing.add_bill(bill(1, "Rent", "Once Per Month", "Day of Month", "10"));

    let generate = jobs.enqueue("generate_bill_dates").await.unwrap();
    let shell_ok = jobs.enqueue("true").await.unwrap();
    let shell_bad = jobs.enqueue("false").await.unwrap();

    let consumer = JobConsumer::new(jobs.clone(), GenerationEngine::new(billing))
        .with_config(ConsumerConfig::default().with_shell_timeout(Duration::from_secs(10)));

    // Three ticks drain the queue FIFO; a fourth finds nothing.
    assert!(consumer.tick().await);
    assert!(consumer.tick().await);
    assert!(consumer.tick().await);
    assert!(!consumer.tick().await);

    assert_eq!(jobs.get(generate).unwrap().status, JobStatus::Done);
    assert_eq!(jobs.get(shell_ok).unwrap().status, JobStatus::Done);
    assert_eq!(jobs.get(shell_bad).unwrap().status, JobStatus::Error);
}

#[tokio::test]
async fn failed_jobs_stay_error_forever() {
    let jobs = Arc::new(InMemoryJobStore::new());
    let billing = Arc::new(InMemoryBillingStore::new());

    let id = jobs.enqueue("exit 1").await.unwrap();
    let consumer = JobConsumer::new(jobs.clone(), GenerationEngine::new(billing));

    consumer.tick().await;
    assert_eq!(jobs.get(id).unwrap().status, JobStatus::Error);

    // Later ticks never pick the failed job back up.
    assert!(!consumer.tick().await);
    assert_eq!(jobs.get(id).unwrap().status, JobStatus::Error);
}
