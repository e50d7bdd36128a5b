use thiserror::Error;

/// Errors reported by the mapper and the CRUD operations built on it.
///
/// Failures from the underlying driver are passed through untouched in
/// [`TableMapError::Sqlite`]; everything else describes a mapping problem.
#[derive(Debug, Error)]
pub enum TableMapError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("no table registered for type {0}")]
    UnregisteredType(String),

    #[error("could not find keys for table {table}")]
    NoPrimaryKey { table: String },

    #[error("no column in table {table} for field {field}")]
    UnknownField { table: String, field: String },

    #[error("table {table}: only one auto-increment key column is supported, got {count}")]
    MultipleAutoIncrement { table: String, count: usize },

    #[error("table {table} has no bindable columns")]
    NoBindableColumns { table: String },

    #[error("field {field} of table {table} could not be read from the record")]
    FieldBinding { table: String, field: String },

    #[error("cannot set auto-increment value on non-integer field {field}. SQL={sql}")]
    AutoIncrementTypeMismatch { field: String, sql: String },

    #[error("expected {expected} key values for table {table}, got {got}")]
    KeyCountMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("no rows in result set")]
    NotFound,

    #[error("invalid select destination: {0}")]
    InvalidDestination(String),

    #[error("value conversion error for {field}: {reason}")]
    ValueConversion { field: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl TableMapError {
    /// True when the error is the "no matching row" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableMapError::NotFound)
            || matches!(
                self,
                TableMapError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
            )
    }
}
