//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Classes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Classes                                        │
//! │                                                                         │
//! │  Absent row on a plain lookup   → Ok(None), never an error             │
//! │                                                                         │
//! │  NotFound                       → the target of an operation is gone   │
//! │                                   (update/delete, filtered listing)    │
//! │                                                                         │
//! │  UniqueViolation                ┐                                      │
//! │  ForeignKeyViolation            ├ constraint violations, never retried │
//! │  CheckViolation                 ┘                                      │
//! │                                                                         │
//! │  ConnectionFailed, QueryFailed, ┐                                      │
//! │  TransactionFailed, PoolExhausted ├ storage errors, surfaced verbatim  │
//! │  MigrationFailed, Internal      ┘                                      │
//! │                                                                         │
//! │  Validation                     → rejected before touching the store   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error raised inside a transaction rolls the whole transaction back.

use catalog_core::ValidationError;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The entity an operation targets does not exist.
    ///
    /// ## When This Occurs
    /// - Updating or deleting a row that is gone
    /// - Listing by a category name or username that does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two products whose titles produce the same slug
    /// - Two writers racing to create the same category name
    /// - Duplicate username or email
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating a product for an owner id that does not exist
    /// - Deleting a user who still owns products
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK / NOT NULL constraint violation.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Input rejected before any SQL ran.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Commit or rollback failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use until the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    /// True for unique, foreign-key and check violations.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::CheckViolation { .. }
        )
    }

    /// Fills in the offending value of a UniqueViolation on `field`.
    ///
    /// SQLite only reports the column, so repositories call this with the
    /// value they just tried to write.
    pub(crate) fn with_unique_value(self, field: &str, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { field: f, .. } if f.ends_with(field) => {
                DbError::duplicate(field, value)
            }
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Classified by ErrorKind / SQLite message
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages look like
                //   "UNIQUE constraint failed: products.slug"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: length(trim(title)) > 0"
                match db_err.kind() {
                    ErrorKind::UniqueViolation => unique_from_message(msg),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation {
                            message: msg.to_string(),
                        }
                    }
                    _ if msg.contains("UNIQUE constraint failed") => unique_from_message(msg),
                    _ if msg.contains("FOREIGN KEY constraint failed") => {
                        DbError::ForeignKeyViolation {
                            message: msg.to_string(),
                        }
                    }
                    _ => DbError::QueryFailed(msg.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

fn unique_from_message(msg: &str) -> DbError {
    let field = msg
        .split("UNIQUE constraint failed: ")
        .nth(1)
        .unwrap_or("unknown")
        .to_string();
    DbError::UniqueViolation {
        field,
        value: "unknown".to_string(),
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(DbError::duplicate("products.slug", "x").is_constraint_violation());
        assert!(DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".into()
        }
        .is_constraint_violation());
        assert!(!DbError::not_found("Product", 1).is_constraint_violation());
        assert!(DbError::not_found("Category", "tea").is_not_found());
        assert!(!DbError::PoolExhausted.is_not_found());
    }

    #[test]
    fn test_unique_from_message_extracts_column() {
        let err = unique_from_message("UNIQUE constraint failed: categories.name");
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, .. } if field == "categories.name"
        ));
    }

    #[test]
    fn test_with_unique_value() {
        let err = unique_from_message("UNIQUE constraint failed: products.slug")
            .with_unique_value("slug", "blue-mug");
        assert_eq!(err.to_string(), "Duplicate slug: 'blue-mug' already exists");

        // Other columns are left alone
        let err = unique_from_message("UNIQUE constraint failed: users.email")
            .with_unique_value("slug", "blue-mug");
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "users.email"));
    }

    #[test]
    fn test_validation_error_wraps() {
        let err: DbError = ValidationError::required("title").into();
        assert_eq!(err.to_string(), "Invalid input: title is required");
    }
}
