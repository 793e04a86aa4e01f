use billflow_billing::GenerationEngine;
use billflow_infra::{JobConsumer, MySqlStore, SystemdWatchdog};

/// Single-threaded by design: one consumer loop, one database connection,
/// blocking poll-and-execute.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    billflow_observability::init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        tracing::warn!("DATABASE_URL not set; using local dev default");
        "mysql://billflow@localhost/billflow".to_string()
    });

    let store = MySqlStore::connect(&database_url).await?;
    let engine = GenerationEngine::new(store.clone());
    let consumer = JobConsumer::new(store, engine).with_heartbeat(SystemdWatchdog::default());

    consumer.run().await;
    Ok(())
}
