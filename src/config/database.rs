//! Database configuration module for the inventory store.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{Product, Sale, SystemState};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pex_inventory.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to a
/// local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
///
/// A store that cannot be reached is a configuration error: every remote operation
/// depends on it and nothing is retried automatically.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config {
            message: format!("Cannot create database directory {}: {e}", dir.display()),
        })?;
    }
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(|e| {
        error!("Failed to connect to {}: {}", database_url, e);
        Error::Config {
            message: format!("Document store unreachable at {database_url}: {e}"),
        }
    })
}

/// Directory holding a file-backed `SQLite` database, if the URL names one.
fn sqlite_parent_dir(database_url: &str) -> Option<PathBuf> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Creates the `inventory`, `sales` and `system_state` tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut product_table = schema.create_table_from_entity(Product);
    let mut sale_table = schema.create_table_from_entity(Sale);
    let mut system_state_table = schema.create_table_from_entity(SystemState);

    product_table.if_not_exists();
    sale_table.if_not_exists();
    system_state_table.if_not_exists();

    db.execute(builder.build(&product_table)).await?;
    db.execute(builder.build(&sale_table)).await?;
    db.execute(builder.build(&system_state_table)).await?;

    Ok(())
}
