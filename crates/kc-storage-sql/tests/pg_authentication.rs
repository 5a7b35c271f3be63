//! Authentication execution provider tests against a live `PostgreSQL`.
//!
//! Run with `DATABASE_URL` pointing at a scratch database.

use kc_model::{AuthenticationExecution, Requirement};
use kc_storage::{AuthenticationExecutionProvider, StorageError};
use kc_storage_sql::{run_migrations, PgAuthenticationExecutionProvider};
use sqlx::PgPool;
use uuid::Uuid;

async fn provider() -> anyhow::Result<PgAuthenticationExecutionProvider> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = PgPool::connect(&url).await?;
    run_migrations(&pool).await?;
    Ok(PgAuthenticationExecutionProvider::new(pool))
}

fn execution(realm: Uuid, flow: Uuid, authenticator: &str, priority: i32) -> AuthenticationExecution {
    AuthenticationExecution::new(realm, flow, authenticator, Requirement::Required, priority)
}

#[tokio::test]
#[ignore = "Requires running database"]
async fn list_by_flow_is_ordered_by_priority() -> anyhow::Result<()> {
    let provider = provider().await?;
    let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());

    for (name, priority) in [("otp", 30), ("cookie", 10), ("password", 20)] {
        provider.create(&execution(realm, flow, name, priority)).await?;
    }

    let listed = provider.list_by_flow(realm, flow).await?;
    let priorities: Vec<i32> = listed.iter().map(|e| e.priority).collect();
    assert_eq!(priorities, vec![10, 20, 30]);

    provider.delete_by_realm(realm).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running database"]
async fn duplicate_priority_is_rejected() -> anyhow::Result<()> {
    let provider = provider().await?;
    let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());

    provider.create(&execution(realm, flow, "cookie", 10)).await?;
    let err = provider
        .create(&execution(realm, flow, "password", 10))
        .await
        .unwrap_err();
    assert!(err.is_duplicate());

    provider.delete_by_realm(realm).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running database"]
async fn reorder_swaps_priorities_atomically() -> anyhow::Result<()> {
    let provider = provider().await?;
    let (realm, flow) = (Uuid::now_v7(), Uuid::now_v7());
    let first = execution(realm, flow, "cookie", 0);
    let second = execution(realm, flow, "password", 1);
    provider.create(&first).await?;
    provider.create(&second).await?;

    provider.reorder(realm, flow, &[second.id, first.id]).await?;
    let listed = provider.list_by_flow(realm, flow).await?;
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    let err = provider.reorder(realm, flow, &[first.id]).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidData(_)));
    let unchanged = provider.list_by_flow(realm, flow).await?;
    assert_eq!(unchanged[0].id, second.id);

    provider.delete_by_realm(realm).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running database"]
async fn missing_rows_are_not_found() -> anyhow::Result<()> {
    let provider = provider().await?;
    let realm = Uuid::now_v7();

    let err = provider
        .update_requirement(realm, Uuid::now_v7(), Requirement::Disabled)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(provider.get_by_id(realm, Uuid::now_v7()).await?.is_none());
    assert_eq!(provider.delete_by_flow(realm, Uuid::now_v7()).await?, 0);
    Ok(())
}
