use db::{DbConfig, RepositoryError, SurrealJobRepository};

/// Every `mem://` connection opens its own datastore, so tests don't share state.
pub async fn setup_repo() -> Result<SurrealJobRepository, RepositoryError> {
    let db_conn = db::init(DbConfig::memory()).await?;
    Ok(SurrealJobRepository::new(db_conn))
}
