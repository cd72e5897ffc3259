//! Database error types
//!
//! Errors that can occur during database operations, with MySQL error
//! numbers mapped to meaningful variants.

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique key violation (MySQL 1062)
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key violation (MySQL 1451/1452)
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation (MySQL 3819)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be mapped to a domain value
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Entry", "2024/03/04/000017");
    /// assert!(error.to_string().contains("Entry"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        DatabaseError::InvalidData(message.into())
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Maps a MySQL error number to a variant
    pub fn from_mysql_number(number: u16, message: &str) -> Self {
        match number {
            1062 => DatabaseError::DuplicateEntry(message.to_string()),
            1451 | 1452 => DatabaseError::ForeignKeyViolation(message.to_string()),
            3819 => DatabaseError::ConstraintViolation(message.to_string()),
            1040 | 2002 | 2003 | 2006 | 2013 => DatabaseError::ConnectionFailed(message.to_string()),
            _ => DatabaseError::QueryFailed(message.to_string()),
        }
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// Database errors are classified by their MySQL error number.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                match db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                    Some(mysql) => DatabaseError::from_mysql_number(mysql.number(), mysql.message()),
                    None => DatabaseError::QueryFailed(db_err.message().to_string()),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}
