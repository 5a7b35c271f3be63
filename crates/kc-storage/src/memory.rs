//! In-memory authentication execution provider.
//!
//! Suitable for tests and single-node development. State is lost on restart.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use kc_model::{AuthenticationExecution, Requirement};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::authentication::{AuthenticationExecutionProvider, ENTITY};
use crate::error::{StorageError, StorageResult};

/// In-memory execution store keyed by `(realm_id, id)`.
#[derive(Default)]
pub struct InMemoryAuthenticationExecutionProvider {
    executions: RwLock<HashMap<(Uuid, Uuid), AuthenticationExecution>>,
}

impl InMemoryAuthenticationExecutionProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fails if another execution of the same flow already uses `priority`.
fn check_priority(
    executions: &HashMap<(Uuid, Uuid), AuthenticationExecution>,
    realm_id: Uuid,
    flow_id: Uuid,
    id: Uuid,
    priority: i32,
) -> StorageResult<()> {
    let taken = executions.values().any(|other| {
        other.realm_id == realm_id
            && other.flow_id == flow_id
            && other.id != id
            && other.priority == priority
    });
    if taken {
        return Err(StorageError::duplicate(ENTITY, "priority", priority.to_string()));
    }
    Ok(())
}

fn retain_counting(
    executions: &mut HashMap<(Uuid, Uuid), AuthenticationExecution>,
    keep: impl Fn(&AuthenticationExecution) -> bool,
) -> u64 {
    let before = executions.len();
    executions.retain(|_, e| keep(e));
    (before - executions.len()) as u64
}

#[async_trait]
impl AuthenticationExecutionProvider for InMemoryAuthenticationExecutionProvider {
    async fn create(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        execution.validate()?;
        let mut executions = self.executions.write().await;
        let key = (execution.realm_id, execution.id);
        if executions.contains_key(&key) {
            return Err(StorageError::duplicate(ENTITY, "id", execution.id.to_string()));
        }
        check_priority(
            &executions,
            execution.realm_id,
            execution.flow_id,
            execution.id,
            execution.priority,
        )?;
        executions.insert(key, execution.clone());
        tracing::debug!(id = %execution.id, flow_id = %execution.flow_id, "created authentication execution");
        Ok(())
    }

    async fn get_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<AuthenticationExecution>> {
        Ok(self.executions.read().await.get(&(realm_id, id)).cloned())
    }

    async fn list_by_flow(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let mut list: Vec<_> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.realm_id == realm_id && e.flow_id == flow_id)
            .cloned()
            .collect();
        list.sort_by_key(|e| e.priority);
        Ok(list)
    }

    async fn update(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        execution.validate()?;
        let mut executions = self.executions.write().await;
        let key = (execution.realm_id, execution.id);
        let Some(existing) = executions.get(&key) else {
            return Err(StorageError::not_found(ENTITY, execution.id));
        };
        let flow_id = existing.flow_id;
        check_priority(
            &executions,
            execution.realm_id,
            flow_id,
            execution.id,
            execution.priority,
        )?;

        let mut updated = execution.clone();
        updated.flow_id = flow_id;
        updated.updated_at = Utc::now();
        executions.insert(key, updated);
        Ok(())
    }

    async fn update_priority(&self, realm_id: Uuid, id: Uuid, priority: i32) -> StorageResult<()> {
        let mut executions = self.executions.write().await;
        let flow_id = executions
            .get(&(realm_id, id))
            .map(|e| e.flow_id)
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        check_priority(&executions, realm_id, flow_id, id, priority)?;
        if let Some(execution) = executions.get_mut(&(realm_id, id)) {
            execution.priority = priority;
            execution.touch();
        }
        Ok(())
    }

    async fn update_requirement(
        &self,
        realm_id: Uuid,
        id: Uuid,
        requirement: Requirement,
    ) -> StorageResult<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&(realm_id, id))
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        execution.requirement = requirement;
        execution.touch();
        Ok(())
    }

    async fn delete(&self, realm_id: Uuid, id: Uuid) -> StorageResult<()> {
        self.executions
            .write()
            .await
            .remove(&(realm_id, id))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(ENTITY, id))
    }

    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<u64> {
        let mut executions = self.executions.write().await;
        Ok(retain_counting(&mut executions, |e| e.realm_id != realm_id))
    }

    async fn delete_by_flow(&self, realm_id: Uuid, flow_id: Uuid) -> StorageResult<u64> {
        let mut executions = self.executions.write().await;
        Ok(retain_counting(&mut executions, |e| {
            e.realm_id != realm_id || e.flow_id != flow_id
        }))
    }

    async fn reorder(
        &self,
        realm_id: Uuid,
        flow_id: Uuid,
        execution_ids: &[Uuid],
    ) -> StorageResult<()> {
        let mut executions = self.executions.write().await;
        let current: HashSet<Uuid> = executions
            .values()
            .filter(|e| e.realm_id == realm_id && e.flow_id == flow_id)
            .map(|e| e.id)
            .collect();
        let requested: HashSet<Uuid> = execution_ids.iter().copied().collect();
        if requested.len() != execution_ids.len() || requested != current {
            return Err(StorageError::InvalidData(format!(
                "reorder of flow {flow_id} must list each of its {} executions once",
                current.len()
            )));
        }

        for (priority, id) in (0_i32..).zip(execution_ids) {
            if let Some(execution) = executions.get_mut(&(realm_id, *id)) {
                execution.priority = priority;
                execution.touch();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution(realm_id: Uuid, flow_id: Uuid, authenticator: &str, priority: i32) -> AuthenticationExecution {
        AuthenticationExecution::new(realm_id, flow_id, authenticator, Requirement::Required, priority)
    }

    #[tokio::test]
    async fn list_is_ordered_by_priority() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        for (name, priority) in [("otp", 30), ("cookie", 10), ("password", 20)] {
            provider.create(&execution(realm, flow, name, priority)).await.unwrap();
        }

        let priorities: Vec<_> = provider
            .list_by_flow(realm, flow)
            .await
            .unwrap()
            .iter()
            .map(|e| e.priority)
            .collect();
        assert_eq!(priorities, [10, 20, 30]);
    }

    #[tokio::test]
    async fn duplicate_priority_is_rejected() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        provider.create(&execution(realm, flow, "cookie", 10)).await.unwrap();

        let err = provider
            .create(&execution(realm, flow, "password", 10))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());

        // Same priority in another flow is fine.
        provider
            .create(&execution(realm, Uuid::now_v7(), "password", 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_execution_is_rejected() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let err = provider
            .create(&execution(Uuid::now_v7(), Uuid::now_v7(), " ", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn updates_priority_and_requirement() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        let first = execution(realm, flow, "cookie", 10);
        let second = execution(realm, flow, "password", 20);
        provider.create(&first).await.unwrap();
        provider.create(&second).await.unwrap();

        assert!(provider
            .update_priority(realm, second.id, 10)
            .await
            .unwrap_err()
            .is_duplicate());
        provider.update_priority(realm, second.id, 5).await.unwrap();
        provider
            .update_requirement(realm, first.id, Requirement::Alternative)
            .await
            .unwrap();

        let list = provider.list_by_flow(realm, flow).await.unwrap();
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].requirement, Requirement::Alternative);

        assert!(provider
            .update_requirement(realm, Uuid::now_v7(), Requirement::Disabled)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        let mut stored = execution(realm, flow, "cookie", 10);
        provider.create(&stored).await.unwrap();

        stored.requirement = Requirement::Conditional;
        stored.user_setup_allowed = true;
        provider.update(&stored).await.unwrap();

        let loaded = provider.get_by_id(realm, stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.requirement, Requirement::Conditional);
        assert!(loaded.user_setup_allowed);
        assert!(loaded.updated_at >= stored.updated_at);

        let missing = execution(realm, flow, "otp", 30);
        assert!(provider.update(&missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn deletes_by_id_flow_and_realm() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow, other_flow) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let single = execution(realm, flow, "cookie", 10);
        provider.create(&single).await.unwrap();
        provider.create(&execution(realm, flow, "password", 20)).await.unwrap();
        provider.create(&execution(realm, other_flow, "otp", 10)).await.unwrap();

        provider.delete(realm, single.id).await.unwrap();
        assert!(provider.delete(realm, single.id).await.unwrap_err().is_not_found());

        assert_eq!(provider.delete_by_flow(realm, flow).await.unwrap(), 1);
        assert_eq!(provider.list_by_flow(realm, other_flow).await.unwrap().len(), 1);
        assert_eq!(provider.delete_by_realm(realm).await.unwrap(), 1);
        assert!(provider.list_by_flow(realm, other_flow).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reorder_assigns_positions() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        let a = execution(realm, flow, "cookie", 10);
        let b = execution(realm, flow, "password", 20);
        let c = execution(realm, flow, "otp", 30);
        for e in [&a, &b, &c] {
            provider.create(e).await.unwrap();
        }

        provider.reorder(realm, flow, &[c.id, a.id, b.id]).await.unwrap();
        let order: Vec<_> = provider
            .list_by_flow(realm, flow)
            .await
            .unwrap()
            .iter()
            .map(|e| (e.id, e.priority))
            .collect();
        assert_eq!(order, [(c.id, 0), (a.id, 1), (b.id, 2)]);

        let err = provider.reorder(realm, flow, &[a.id, b.id]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
        let err = provider
            .reorder(realm, flow, &[a.id, a.id, b.id])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn enabled_listing_skips_disabled() {
        let provider = InMemoryAuthenticationExecutionProvider::new();
        let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
        let mut disabled = execution(realm, flow, "kerberos", 10);
        disabled.requirement = Requirement::Disabled;
        provider.create(&disabled).await.unwrap();
        provider.create(&execution(realm, flow, "cookie", 20)).await.unwrap();

        let enabled = provider.list_enabled_by_flow(realm, flow).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].authenticator.as_deref(), Some("cookie"));
    }
}
