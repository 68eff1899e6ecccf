//! Dead job monitor daemon.
//!
//! Sweeps the SurrealDB job registry for running jobs that stopped sending
//! updates until interrupted with Ctrl-C.

use std::sync::Arc;

use db::{DbConfig, SurrealJobRepository};
use jobs_core::{Clock, SystemClock};
use monitor::{CleanupMessage, InMemJobMutexHandler, MonitorConfig, StopDeadJobs, start_cleanup_actor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = MonitorConfig::from_env()?;
    tracing::info!(?config, "Starting dead job monitor");

    let db_conn = db::init(DbConfig::from_env()).await?;
    let repository = Arc::new(SurrealJobRepository::new(db_conn));
    let mutex_handler = Arc::new(InMemJobMutexHandler::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let detector = Arc::new(StopDeadJobs::new(repository, mutex_handler, clock, &config));
    let (cleanup, handle) = start_cleanup_actor(detector, config.sweep_interval()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, stopping dead job monitor");

    cleanup.send_message(CleanupMessage::Shutdown)?;
    handle.await?;

    tracing::info!("Dead job monitor stopped");
    Ok(())
}
