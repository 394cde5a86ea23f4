//! Persistence layer for peerlink.
//!
//! This crate provides the durable store using `SeaORM` over a single
//! `SQLite` database file:
//!
//! - **Entities**: Database models in [`entities`]
//! - **Migrations**: Schema migrations in [`migrations`]
//! - **Repositories**: Data access patterns in [`repositories`]

pub mod entities;
pub mod migrations;
pub mod repositories;

use peerlink_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
