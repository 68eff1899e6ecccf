//! Database schema definitions using SurrealQL.

use crate::{Database, RepositoryError};

/// Initialize the database schema.
///
/// This creates the job table and the indexes the monitor queries on.
pub async fn init_schema(db: &Database) -> Result<(), RepositoryError> {
    tracing::info!("Initializing database schema...");

    db.query(JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Job table schema.
const JOB_SCHEMA: &str = r#"
-- Job table; records are replaced whole, messages are nested
DEFINE TABLE IF NOT EXISTS job SCHEMALESS;

-- Stale-job lookup: running jobs ordered by last update
DEFINE INDEX IF NOT EXISTS job_status ON job FIELDS status;
DEFINE INDEX IF NOT EXISTS job_stale ON job FIELDS status, last_updated_us;
DEFINE INDEX IF NOT EXISTS job_type ON job FIELDS job_type;
"#;
