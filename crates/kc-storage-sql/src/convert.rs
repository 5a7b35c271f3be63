//! Conversion between database entities and domain models.

use kc_model::{AuthenticationExecution, Requirement};
use kc_storage::StorageError;

use crate::entities::AuthenticationExecutionRow;

/// Convert an `AuthenticationExecutionRow` to an `AuthenticationExecution` domain model.
///
/// An unknown requirement is rejected rather than defaulted.
impl TryFrom<AuthenticationExecutionRow> for AuthenticationExecution {
    type Error = StorageError;

    fn try_from(row: AuthenticationExecutionRow) -> Result<Self, Self::Error> {
        let requirement: Requirement = row.requirement.parse()?;

        Ok(Self {
            id: row.id,
            realm_id: row.realm_id,
            flow_id: row.flow_id,
            authenticator: row.authenticator,
            authenticator_flow: row.authenticator_flow,
            sub_flow_id: row.sub_flow_id,
            requirement,
            priority: row.priority,
            user_setup_allowed: row.user_setup_allowed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Converts a list of rows, failing on the first invalid one.
pub fn executions_from_rows(
    rows: Vec<AuthenticationExecutionRow>,
) -> Result<Vec<AuthenticationExecution>, StorageError> {
    rows.into_iter().map(AuthenticationExecution::try_from).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn row(requirement: &str) -> AuthenticationExecutionRow {
        AuthenticationExecutionRow {
            id: Uuid::now_v7(),
            realm_id: Uuid::now_v7(),
            flow_id: Uuid::now_v7(),
            authenticator: Some("auth-cookie".to_string()),
            authenticator_flow: false,
            sub_flow_id: None,
            requirement: requirement.to_string(),
            priority: 10,
            user_setup_allowed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_model() {
        let source = row("ALTERNATIVE");
        let execution = AuthenticationExecution::try_from(source.clone()).unwrap();

        assert_eq!(execution.id, source.id);
        assert_eq!(execution.requirement, Requirement::Alternative);
        assert_eq!(execution.authenticator.as_deref(), Some("auth-cookie"));
        assert!(execution.user_setup_allowed);
    }

    #[test]
    fn unknown_requirement_is_invalid_data() {
        let err = executions_from_rows(vec![row("REQUIRED"), row("SOMETIMES")]).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }
}
