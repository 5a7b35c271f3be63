//! Authentication execution domain model.
//!
//! An execution is one step of an authentication flow: either an
//! authenticator or a nested sub-flow. Executions of a flow are evaluated
//! in ascending `priority` order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How the outcome of an execution affects its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    /// The step must succeed.
    Required,
    /// One of the alternative steps must succeed.
    Alternative,
    /// The step is skipped.
    #[default]
    Disabled,
    /// The step runs only when its conditions match.
    Conditional,
}

impl Requirement {
    /// Returns the string representation used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Alternative => "ALTERNATIVE",
            Self::Disabled => "DISABLED",
            Self::Conditional => "CONDITIONAL",
        }
    }

    /// Checks if the step takes part in evaluation.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REQUIRED" => Ok(Self::Required),
            "ALTERNATIVE" => Ok(Self::Alternative),
            "DISABLED" => Ok(Self::Disabled),
            "CONDITIONAL" => Ok(Self::Conditional),
            _ => Err(ValidationError::UnknownRequirement(s.to_string())),
        }
    }
}

/// Reasons an execution is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Requirement string is not recognized.
    #[error("unknown requirement '{0}'")]
    UnknownRequirement(String),

    /// Authenticator step without an authenticator.
    #[error("execution {0} has no authenticator")]
    MissingAuthenticator(Uuid),

    /// Sub-flow step without a child flow.
    #[error("sub-flow execution {0} has no child flow")]
    MissingSubFlow(Uuid),

    /// Sub-flow step pointing at its own flow.
    #[error("execution {0} references its own flow")]
    SelfReference(Uuid),
}

/// One step of an authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationExecution {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this execution belongs to.
    pub realm_id: Uuid,
    /// Flow containing this execution.
    pub flow_id: Uuid,

    // === Step ===
    /// Authenticator provider ID; `None` for sub-flow steps.
    pub authenticator: Option<String>,
    /// Whether this step is itself a flow.
    pub authenticator_flow: bool,
    /// Child flow evaluated by a sub-flow step.
    pub sub_flow_id: Option<Uuid>,
    /// Requirement applied to the outcome.
    pub requirement: Requirement,
    /// Evaluation order within the flow, ascending.
    pub priority: i32,
    /// Whether the user may set up the authenticator during login.
    pub user_setup_allowed: bool,

    // === Timestamps ===
    /// When the execution was created.
    pub created_at: DateTime<Utc>,
    /// When the execution was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AuthenticationExecution {
    /// Creates an authenticator step.
    #[must_use]
    pub fn new(
        realm_id: Uuid,
        flow_id: Uuid,
        authenticator: impl Into<String>,
        requirement: Requirement,
        priority: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            realm_id,
            flow_id,
            authenticator: Some(authenticator.into()),
            authenticator_flow: false,
            sub_flow_id: None,
            requirement,
            priority,
            user_setup_allowed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a step that evaluates `sub_flow_id`.
    #[must_use]
    pub fn new_sub_flow(
        realm_id: Uuid,
        flow_id: Uuid,
        sub_flow_id: Uuid,
        requirement: Requirement,
        priority: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            realm_id,
            flow_id,
            authenticator: None,
            authenticator_flow: true,
            sub_flow_id: Some(sub_flow_id),
            requirement,
            priority,
            user_setup_allowed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets whether the user may set up the authenticator.
    #[must_use]
    pub const fn with_user_setup_allowed(mut self, allowed: bool) -> Self {
        self.user_setup_allowed = allowed;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Checks if this step is a sub-flow.
    #[must_use]
    pub const fn is_sub_flow(&self) -> bool {
        self.authenticator_flow
    }

    /// Checks the structural rules of an execution.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.authenticator_flow {
            match self.sub_flow_id {
                None => return Err(ValidationError::MissingSubFlow(self.id)),
                Some(child) if child == self.flow_id => {
                    return Err(ValidationError::SelfReference(self.id));
                }
                Some(_) => {}
            }
        } else if self
            .authenticator
            .as_deref()
            .map_or(true, |a| a.trim().is_empty())
        {
            return Err(ValidationError::MissingAuthenticator(self.id));
        }
        Ok(())
    }

    /// Marks the execution as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
