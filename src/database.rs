//! Database connection bootstrap and migration runner.

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

/// Opens the configured database connection, creating the sqlite file's
/// parent directory first if needed.
pub async fn init_database(connection_string: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    tracing::info!(target: "orchestration_api::database", "connecting to database");

    if connection_string.starts_with("sqlite:") {
        let path_str = connection_string
            .strip_prefix("sqlite://")
            .unwrap_or_else(|| connection_string.strip_prefix("sqlite:").unwrap_or(connection_string));
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let db_path = Path::new(path_str);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbErr::Custom(format!("failed to create database directory {}: {e}", parent.display())))?;
            }
        }
    }

    let mut opts = sea_orm::ConnectOptions::new(connection_string.to_owned());
    opts.max_connections(max_connections);

    let db = Database::connect(opts).await?;
    tracing::info!(target: "orchestration_api::database", "database connection established");
    Ok(db)
}

/// Applies all pending migrations. Idempotent: every migration's `up()`
/// uses `if_not_exists()` table/index creation.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    tracing::info!(target: "orchestration_api::database", "running database migrations");
    migration::Migrator::up(db, None).await?;
    tracing::info!(target: "orchestration_api::database", "database migrations complete");
    Ok(())
}
