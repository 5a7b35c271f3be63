//! Database migration management.

use kc_storage::StorageError;
use sqlx::PgPool;

/// Runs all pending migrations from the workspace `migrations/` directory.
///
/// # Errors
///
/// Returns `StorageError::Query` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}
