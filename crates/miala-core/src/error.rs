//! Error types for the Miala identity service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MialaError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{message}")]
    AlreadyExists { message: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("{message}")]
    BusinessRule { message: String },

    #[error("{message}")]
    Expired { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MialaError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the error carries detail that must not reach a caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Crypto(_) | Self::EmailDelivery(_) | Self::Internal(_)
        )
    }
}

pub type MialaResult<T> = Result<T, MialaError>;
