//! 数据库连接与迁移

use std::str::FromStr;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{FramelinkerError, Result};
use migration::{Migrator, MigratorTrait};

/// Backend name derived from the URL scheme
pub fn infer_backend(database_url: &str) -> Result<&'static str> {
    let scheme = database_url.split_once(':').map(|(s, _)| s).unwrap_or_default();
    match scheme {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        "mysql" | "mariadb" => Ok("mysql"),
        _ => Err(FramelinkerError::database_config(format!(
            "Unsupported database URL: '{}'",
            database_url
        ))),
    }
}

/// Connects, creating the SQLite file when missing, and runs migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let backend = infer_backend(&config.database_url)?;
    let db = if backend == "sqlite" {
        connect_sqlite(&config.database_url, config.timeout).await?
    } else {
        connect_pooled(config, backend).await?
    };
    run_migrations(&db).await?;
    info!("{} session store ready", backend);
    Ok(db)
}

async fn connect_sqlite(database_url: &str, busy_timeout_secs: u64) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| FramelinkerError::database_config(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(busy_timeout_secs.max(1)));

    let pool = SqlitePool::connect_with(options).await.map_err(|e| {
        FramelinkerError::database_connection(format!("Cannot open SQLite database: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

async fn connect_pooled(config: &DatabaseConfig, backend: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.pool_size)
        .min_connections(config.pool_size.min(5))
        .connect_timeout(Duration::from_secs(config.timeout))
        .acquire_timeout(Duration::from_secs(config.timeout))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    Database::connect(options).await.map_err(|e| {
        FramelinkerError::database_connection(format!(
            "Cannot connect to {} database: {}",
            backend.to_uppercase(),
            e
        ))
    })
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| FramelinkerError::database_operation(format!("Migration failed: {}", e)))?;
    info!("Database migrations completed");
    Ok(())
}
