use thiserror::Error;

/// Failures reported by a gateway backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("row not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}
