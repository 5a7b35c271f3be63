//! Database entity types for `SQLx`.
//!
//! These types map directly to database rows and are converted
//! to/from domain models.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for authentication executions.
#[derive(Debug, Clone, FromRow)]
pub struct AuthenticationExecutionRow {
    pub id: Uuid,
    pub realm_id: Uuid,
    pub flow_id: Uuid,
    pub authenticator: Option<String>,
    pub authenticator_flow: bool,
    pub sub_flow_id: Option<Uuid>,
    pub requirement: String,
    pub priority: i32,
    pub user_setup_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
