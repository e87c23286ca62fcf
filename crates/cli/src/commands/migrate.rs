//! Database migration command.
//!
//! Applies the migrations embedded from `crates/api/migrations/`.
//!
//! ```text
//! migrations/
//! ├── 20250101000001_create_users.sql
//! ├── 20250101000002_create_cars.sql
//! └── 20250101000003_create_test_drives.sql
//! ```

use thiserror::Error;

use super::CommandError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    carmart_api::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
