use sqlx::{postgres::PgPoolOptions, Connection, PgConnection, PgPool};
use tracing::info;

use crate::config::{ConfigError, DbConfig};

/// Owns the process-wide Postgres pool.
/// Built once at startup and handed to the handlers through `AppState`.
/// Connections are opened lazily on first use and then reused.
#[derive(Clone, Debug)]
pub struct DbManager {
    db: PgPool,
}

impl DbManager {
    pub fn init(db_config: &DbConfig) -> Result<Self> {
        info!(
            "{:<20} - Initializing the DB pool (max connections: {})",
            "init_db", db_config.max_connections
        );
        let con_opts = db_config.connection_options()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(db_config.acquire_timeout())
            .connect_lazy_with(con_opts);

        Ok(Self { db: db_pool })
    }

    /// Creates the configured database and runs the migrations against it.
    /// Used by the integration tests to get a fresh database per test.
    pub async fn configure_for_test(db_config: &DbConfig) -> Result<()> {
        let mut connection =
            PgConnection::connect_with(&db_config.connection_options_without_db()?).await?;

        let sql = format!(r#"CREATE DATABASE "{}";"#, db_config.db_name);
        sqlx::query(&sql).execute(&mut connection).await?;

        // Create pool only used to migrate the DB
        let db_pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_millis(1000))
            .connect_with(db_config.connection_options()?)
            .await
            .map_err(|_| Error::FailToCreatePool)?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;

        Ok(())
    }

    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

// ###################################
// ->   ERROR
// ###################################
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create db pool")]
    FailToCreatePool,
    #[error("db config error: {0}")]
    Config(#[from] ConfigError),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("sqlx migration error: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),
}
