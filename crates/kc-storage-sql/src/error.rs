//! SQL storage error types.

use kc_storage::StorageError;
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// `PostgreSQL` unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// `PostgreSQL` foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Converts a `SQLx` error to a storage error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => {
            // Generic internal error - callers should handle specific not-found cases
            StorageError::Internal("Row not found".to_string())
        }
        SqlxError::Database(db_err) => {
            if db_err.code().is_some_and(|c| c == UNIQUE_VIOLATION) {
                StorageError::duplicate(
                    "row",
                    "unique key",
                    db_err.constraint().unwrap_or_default(),
                )
            } else if db_err.code().is_some_and(|c| c == FOREIGN_KEY_VIOLATION) {
                StorageError::InvalidData(format!("Reference violation: {}", db_err.message()))
            } else {
                StorageError::Query(db_err.to_string())
            }
        }
        SqlxError::PoolTimedOut => StorageError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Connection("Connection pool closed".to_string()),
        _ => StorageError::Internal(err.to_string()),
    }
}

/// Checks if `err` is a violation of the named unique constraint.
pub fn is_unique_violation(err: &SqlxError, constraint: &str) -> bool {
    matches!(
        err,
        SqlxError::Database(db_err)
            if db_err.code().is_some_and(|c| c == UNIQUE_VIOLATION)
                && db_err.constraint() == Some(constraint)
    )
}

/// Creates a not found error for the given entity type and ID.
pub const fn not_found(entity_type: &'static str, id: Uuid) -> StorageError {
    StorageError::not_found(entity_type, id)
}

/// Creates a duplicate error for the given entity.
pub fn duplicate(
    entity_type: &'static str,
    field: &'static str,
    value: impl Into<String>,
) -> StorageError {
    StorageError::duplicate(entity_type, field, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(matches!(
            from_sqlx_error(SqlxError::PoolTimedOut),
            StorageError::Connection(_)
        ));
        assert!(matches!(
            from_sqlx_error(SqlxError::PoolClosed),
            StorageError::Connection(_)
        ));
    }

    #[test]
    fn row_not_found_is_internal() {
        assert!(matches!(
            from_sqlx_error(SqlxError::RowNotFound),
            StorageError::Internal(_)
        ));
        assert!(!is_unique_violation(&SqlxError::RowNotFound, "any"));
    }
}
