//! Database-specific error types and conversions.

use miala_core::error::MialaError;

const CANCELLED_STATEMENT: &str = "not executed due to a failed transaction";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique index violated: {0}")]
    Conflict(String),

    #[error("Malformed record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Classify a statement failure reported by `Response::check`.
    pub(crate) fn from_check(err: impl std::fmt::Display) -> Self {
        Self::from_message(err.to_string())
    }

    /// Classify the errors of a multi-statement transaction by the
    /// statement that actually failed; the others only report that the
    /// transaction was cancelled.
    pub(crate) fn from_statement_errors<E: std::fmt::Display>(
        errors: impl IntoIterator<Item = (usize, E)>,
    ) -> Self {
        let mut messages: Vec<(usize, String)> = errors
            .into_iter()
            .map(|(index, err)| (index, err.to_string()))
            .collect();
        messages.sort_by_key(|(index, _)| *index);

        let cause = messages
            .iter()
            .position(|(_, message)| !message.contains(CANCELLED_STATEMENT))
            .unwrap_or(0);
        match messages.into_iter().nth(cause) {
            Some((_, message)) => Self::from_message(message),
            None => Self::Query("transaction failed without an error".into()),
        }
    }

    fn from_message(message: String) -> Self {
        if message.contains("OTP already consumed") {
            Self::not_found("OTP", "consumed")
        } else if message.contains("already contains") {
            Self::Conflict(message)
        } else {
            Self::Query(message)
        }
    }
}

impl From<DbError> for MialaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MialaError::NotFound { entity, id },
            DbError::Conflict(_) => MialaError::AlreadyExists {
                message: "Record already exists".into(),
            },
            other => MialaError::Database(other.to_string()),
        }
    }
}
