use std::sync::Arc;

use pricewise_core::config::{AppConfig, ConfigError};
use pricewise_core::errors::ApplicationError;
use pricewise_core::search::SearchService;
use pricewise_db::{connect_with_config, migrations, DbPool, SqlCatalogRepository};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<SearchService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("initial index build failed: {0}")]
    InitialIndex(#[source] ApplicationError),
}

/// Connects, migrates and builds the first index generation. The server
/// does not start answering until the catalog has been indexed once.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let source = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let service = Arc::new(SearchService::new(source, config.search.clone()));
    let stats = service.refresh().await.map_err(BootstrapError::InitialIndex)?;
    info!(
        event_name = "system.bootstrap.index_built",
        correlation_id = "bootstrap",
        generation = stats.generation,
        records = stats.records,
        vocabulary = stats.vocabulary,
        "initial index generation built"
    );

    Ok(Application { config, db_pool, service })
}

#[cfg(test)]
mod tests {
    use pricewise_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use pricewise_db::{SampleCatalog, SqlCatalogRepository};

    use super::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(database_url: String) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })?;
        bootstrap_with_config(config).await
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_url() {
        let result = bootstrap("postgres://localhost/catalog".to_string()).await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_builds_index_over_empty_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("empty.db").display());

        let app = bootstrap(url).await.expect("bootstrap should succeed");
        let stats = app.service.stats();

        assert!(stats.ready);
        assert_eq!(stats.records, 0);
        assert!(app.service.search("milk", None).is_empty());
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_indexes_existing_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());

        let first = bootstrap(url.clone()).await.expect("first bootstrap");
        SampleCatalog::load(&SqlCatalogRepository::new(first.db_pool.clone()))
            .await
            .expect("seed");
        first.db_pool.close().await;

        let app = bootstrap(url).await.expect("second bootstrap");

        assert_eq!(app.service.stats().records, SampleCatalog::listings().len());
        assert!(!app.service.search("guard basmati rice", None).is_empty());
        app.db_pool.close().await;
    }
}
