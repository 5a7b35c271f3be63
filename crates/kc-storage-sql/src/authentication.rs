//! `PostgreSQL` implementation of the authentication execution storage provider.

use async_trait::async_trait;
use chrono::Utc;
use kc_model::{AuthenticationExecution, Requirement};
use kc_storage::authentication::ENTITY;
use kc_storage::error::StorageResult;
use kc_storage::{AuthenticationExecutionProvider, StorageError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::convert::executions_from_rows;
use crate::entities::AuthenticationExecutionRow;
use crate::error::{duplicate, from_sqlx_error, is_unique_violation, not_found};

/// Unique constraint on `(realm_id, flow_id, priority)`.
const PRIORITY_CONSTRAINT: &str = "authentication_executions_flow_priority_key";

/// Primary key constraint.
const PRIMARY_KEY_CONSTRAINT: &str = "authentication_executions_pkey";

/// Maps write errors, naming the conflicting priority or ID.
fn write_error(err: sqlx::Error, id: Uuid, priority: i32) -> StorageError {
    if is_unique_violation(&err, PRIORITY_CONSTRAINT) {
        duplicate(ENTITY, "priority", priority.to_string())
    } else if is_unique_violation(&err, PRIMARY_KEY_CONSTRAINT) {
        duplicate(ENTITY, "id", id.to_string())
    } else {
        from_sqlx_error(err)
    }
}

/// `PostgreSQL` authentication execution storage provider.
pub struct PgAuthenticationExecutionProvider {
    pool: PgPool,
}

impl PgAuthenticationExecutionProvider {
    /// Creates a new `PostgreSQL` authentication execution provider.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthenticationExecutionProvider for PgAuthenticationExecutionProvider {
    async fn create(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        execution.validate()?;

        sqlx::query(
            r"INSERT INTO authentication_executions (
                id, realm_id, flow_id, authenticator, authenticator_flow, sub_flow_id,
                requirement, priority, user_setup_allowed, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(execution.id)
        .bind(execution.realm_id)
        .bind(execution.flow_id)
        .bind(&execution.authenticator)
        .bind(execution.authenticator_flow)
        .bind(execution.sub_flow_id)
        .bind(execution.requirement.as_str())
        .bind(execution.priority)
        .bind(execution.user_setup_allowed)
        .bind(execution.created_at)
        .bind(execution.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, execution.id, execution.priority))?;

        tracing::debug!(id = %execution.id, flow_id = %execution.flow_id, "created authentication execution");
        Ok(())
    }

    async fn get_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<AuthenticationExecution>> {
        let row: Option<AuthenticationExecutionRow> = sqlx::query_as(
            "SELECT * FROM authentication_executions WHERE id = $1 AND realm_id = $2",
        )
        .bind(id)
        .bind(realm_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        row.map(AuthenticationExecution::try_from).transpose()
    }

    async fn list_by_flow(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let rows: Vec<AuthenticationExecutionRow> = sqlx::query_as(
            r"SELECT * FROM authentication_executions
            WHERE realm_id = $1 AND flow_id = $2
            ORDER BY priority",
        )
        .bind(realm_id)
        .bind(flow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        executions_from_rows(rows)
    }

    async fn update(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        execution.validate()?;

        let result = sqlx::query(
            r"UPDATE authentication_executions SET
                authenticator = $3, authenticator_flow = $4, sub_flow_id = $5,
                requirement = $6, priority = $7, user_setup_allowed = $8, updated_at = $9
            WHERE id = $1 AND realm_id = $2",
        )
        .bind(execution.id)
        .bind(execution.realm_id)
        .bind(&execution.authenticator)
        .bind(execution.authenticator_flow)
        .bind(execution.sub_flow_id)
        .bind(execution.requirement.as_str())
        .bind(execution.priority)
        .bind(execution.user_setup_allowed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, execution.id, execution.priority))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, execution.id));
        }

        Ok(())
    }

    async fn update_priority(&self, realm_id: Uuid, id: Uuid, priority: i32) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE authentication_executions SET priority = $1, updated_at = $2 WHERE id = $3 AND realm_id = $4",
        )
        .bind(priority)
        .bind(Utc::now())
        .bind(id)
        .bind(realm_id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, id, priority))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }

        Ok(())
    }

    async fn update_requirement(
        &self,
        realm_id: Uuid,
        id: Uuid,
        requirement: Requirement,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE authentication_executions SET requirement = $1, updated_at = $2 WHERE id = $3 AND realm_id = $4",
        )
        .bind(requirement.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(realm_id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }

        Ok(())
    }

    async fn delete(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()> {
        let result =
            sqlx::query("DELETE FROM authentication_executions WHERE id = $1 AND realm_id = $2")
                .bind(id)
                .bind(realm_id)
                .execute(&self.pool)
                .await
                .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(not_found(ENTITY, id));
        }

        Ok(())
    }

    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM authentication_executions WHERE realm_id = $1")
            .bind(realm_id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_by_flow(&self, realm_id: Uuid, flow_id: Uuid) -> StorageResult<u64> {
        let result = sqlx::query(
            "DELETE FROM authentication_executions WHERE realm_id = $1 AND flow_id = $2",
        )
        .bind(realm_id)
        .bind(flow_id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn reorder(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
        execution_ids: &[Uuid],
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx_error)?;

        sqlx::query(&format!("SET CONSTRAINTS {PRIORITY_CONSTRAINT} DEFERRED"))
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        // Position in the array becomes the new priority (0-based).
        let result = sqlx::query(
            r"UPDATE authentication_executions AS e
            SET priority = (o.position - 1)::INTEGER, updated_at = $3
            FROM UNNEST($4::UUID[]) WITH ORDINALITY AS o(id, position)
            WHERE e.id = o.id AND e.realm_id = $1 AND e.flow_id = $2",
        )
        .bind(realm_id)
        .bind(flow_id)
        .bind(Utc::now())
        .bind(execution_ids)
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx_error)?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM authentication_executions WHERE realm_id = $1 AND flow_id = $2",
        )
        .bind(realm_id)
        .bind(flow_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(from_sqlx_error)?;

        let listed = execution_ids.len() as u64;
        if result.rows_affected() != listed || u64::try_from(total).ok() != Some(listed) {
            // Dropping the transaction rolls it back.
            return Err(StorageError::InvalidData(format!(
                "reorder of flow {flow_id} must list each of its {total} executions once"
            )));
        }

        tx.commit().await.map_err(from_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_passes_through_non_constraint_errors() {
        let err = write_error(sqlx::Error::PoolClosed, Uuid::now_v7(), 10);
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
