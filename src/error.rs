use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by resource services and controllers.
///
/// Services never panic across their boundary; every failure comes back as one
/// of these values and the controllers decide what to show.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Rejected client-side, before any gateway call.
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },
    /// Service unreachable or response malformed.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Rejected by the backend (uniqueness, referential integrity, missing row).
    #[error("Constraint error: {0}")]
    Constraint(String),
    /// No signed-in session, or a privileged call without elevated credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The offending field, for inline display next to the input.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Transport(msg) => ServiceError::Transport(msg),
            GatewayError::Malformed(msg) => ServiceError::Transport(format!("malformed response: {}", msg)),
            GatewayError::Constraint(msg) => ServiceError::Constraint(msg),
            GatewayError::NotFound(msg) => ServiceError::Constraint(format!("not found: {}", msg)),
            GatewayError::Unauthorized(msg) => ServiceError::Unauthorized(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
