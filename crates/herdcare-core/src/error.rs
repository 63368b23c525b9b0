//! Core error taxonomy shared by the treatment, task and compliance layers.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::db::DbError;

/// Errors returned by core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or malformed input; rejected before any write.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Disallowed state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The backing store failed.
    #[error("Dependency failure: {0}")]
    Dependency(#[source] DbError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(id) => CoreError::NotFound {
                entity: "record",
                id,
            },
            DbError::Constraint(msg) => CoreError::Validation(msg),
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                CoreError::Validation(msg.unwrap_or_else(|| err.to_string()))
            }
            other => CoreError::Dependency(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: CoreError = DbError::NotFound("animal-1".into()).into();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_constraint_maps_to_validation() {
        let err: CoreError = DbError::Constraint("bad status".into()).into();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_other_db_errors_are_dependency_failures() {
        let err: CoreError = DbError::Parse("not a date".into()).into();
        assert!(matches!(err, CoreError::Dependency(_)));
    }
}
