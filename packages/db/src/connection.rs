//! Database connection management.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;

use crate::RepositoryError;

/// Database connection handle. Cheap to clone.
pub type Database = Surreal<Any>;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Connection mode: "mem://" or "rocksdb://path"
    pub endpoint: String,
    /// Namespace to use
    pub namespace: String,
    /// Database name to use
    pub database: String,
    /// Optional root credentials for authentication
    pub credentials: Option<(String, String)>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: "jobs".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl DbConfig {
    /// Create a config for in-memory testing.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Build a config from `SURREAL_*` environment variables, falling back to
    /// the in-memory defaults.
    ///
    /// `SURREAL_ENDPOINT=rocksdb://path` needs the `rocksdb` feature.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup("SURREAL_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(namespace) = lookup("SURREAL_NAMESPACE") {
            config = config.with_namespace(namespace);
        }
        if let Some(database) = lookup("SURREAL_DATABASE") {
            config = config.with_database(database);
        }
        if let (Some(user), Some(pass)) = (lookup("SURREAL_USER"), lookup("SURREAL_PASS")) {
            config = config.with_credentials(user, pass);
        }
        config
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set root credentials for authentication.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

/// Open a connection and select the configured namespace and database.
pub async fn connect(config: &DbConfig) -> Result<Database, RepositoryError> {
    tracing::info!("Connecting to database: {}", config.endpoint);

    let db = any::connect(&config.endpoint).await?;

    if let Some((username, password)) = &config.credentials {
        db.signin(Root {
            username,
            password,
        })
        .await?;
    }

    db.use_ns(&config.namespace).use_db(&config.database).await?;

    tracing::info!(
        "Connected to database: {}/{}",
        config.namespace,
        config.database
    );

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn from_lookup_defaults_to_memory() {
        let config = DbConfig::from_lookup(lookup(&[]));
        assert_eq!(config.endpoint, "mem://");
        assert_eq!(config.namespace, "jobs");
        assert_eq!(config.database, "main");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn from_lookup_reads_every_variable() {
        let config = DbConfig::from_lookup(lookup(&[
            ("SURREAL_ENDPOINT", "rocksdb://data/jobs"),
            ("SURREAL_NAMESPACE", "ops"),
            ("SURREAL_DATABASE", "registry"),
            ("SURREAL_USER", "root"),
            ("SURREAL_PASS", "secret"),
        ]));
        assert_eq!(config.endpoint, "rocksdb://data/jobs");
        assert_eq!(config.namespace, "ops");
        assert_eq!(config.database, "registry");
        assert_eq!(
            config.credentials,
            Some(("root".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn credentials_need_both_user_and_password() {
        let config = DbConfig::from_lookup(lookup(&[("SURREAL_USER", "root")]));
        assert!(config.credentials.is_none());
    }
}
