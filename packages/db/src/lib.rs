//! Job registry backends for the dead job monitor.
//!
//! This crate defines the [`JobRepository`] contract the monitor consumes and
//! ships two implementations:
//!
//! - [`InMemJobRepository`]: process-local, used in tests and single-node setups
//! - [`SurrealJobRepository`]: SurrealDB-backed
//!
//! # Features
//!
//! In-memory SurrealDB (`mem://`) is always available. The `rocksdb` feature
//! adds persistent `rocksdb://` endpoints.

mod connection;
mod schema;
pub mod repositories;

pub use connection::{Database, DbConfig, connect};
pub use repositories::{InMemJobRepository, JobRepository, RepositoryError, SurrealJobRepository};
pub use schema::init_schema;

/// Connect to the database and apply the schema.
///
/// This should be called once at application startup.
pub async fn init(config: DbConfig) -> Result<Database, RepositoryError> {
    let db = connect(&config).await?;
    init_schema(&db).await?;
    Ok(db)
}
