//! Authentication execution storage provider trait.

use async_trait::async_trait;
use kc_model::{AuthenticationExecution, Requirement};
use uuid::Uuid;

use crate::error::StorageResult;

/// Entity name used in storage errors.
pub const ENTITY: &str = "AuthenticationExecution";

/// Provider for authentication execution storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
/// Priorities are unique within a `(realm, flow)` pair; lists are returned
/// in ascending priority order.
#[async_trait]
pub trait AuthenticationExecutionProvider: Send + Sync {
    /// Creates a new execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::InvalidData` if the execution fails validation and
    /// `StorageError::Duplicate` if its ID or its priority within the flow is taken.
    async fn create(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Gets an execution by ID.
    async fn get_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<AuthenticationExecution>>;

    /// Lists the executions of a flow ordered by ascending priority.
    async fn list_by_flow(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>>;

    /// Updates an existing execution (step, requirement, priority and flags).
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist and
    /// `StorageError::Duplicate` if the new priority is taken.
    async fn update(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Moves an execution to a new priority.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist and
    /// `StorageError::Duplicate` if the priority is taken.
    async fn update_priority(&self, realm_id: Uuid, id: Uuid, priority: i32) -> StorageResult<()>;

    /// Changes the requirement of an execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn update_requirement(
        &self,
        realm_id: Uuid,
        id: Uuid,
        requirement: Requirement,
    ) -> StorageResult<()>;

    /// Deletes an execution by ID.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn delete(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()>;

    /// Deletes every execution of a realm, returning how many were removed.
    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<u64>;

    /// Deletes every execution of a flow, returning how many were removed.
    async fn delete_by_flow(&self, realm_id: Uuid, flow_id: Uuid) -> StorageResult<u64>;

    /// Rewrites the priorities of a flow by position in `execution_ids`.
    ///
    /// `execution_ids` must list every execution of the flow exactly once.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::InvalidData` if the list is not a permutation of
    /// the flow's executions.
    async fn reorder(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
        execution_ids: &[Uuid],
    ) -> StorageResult<()>;

    /// Lists the executions of a flow that take part in evaluation.
    async fn list_enabled_by_flow(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let executions = self.list_by_flow(realm_id, flow_id).await?;
        Ok(executions
            .into_iter()
            .filter(|e| e.requirement.is_enabled())
            .collect())
    }
}
