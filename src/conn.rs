//! The connection capability the CRUD operations run against.

use crate::error::TableMapError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Outcome of executing a statement that returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Rowid generated by an `INSERT`; `None` for every other statement.
    pub last_insert_id: Option<i64>,
}

/// Something that can run positional-argument SQL.
///
/// Implemented for `rusqlite::Connection`, `rusqlite::Transaction` and
/// [`SqliteDb`](crate::SqliteDb). Calls block until the database answers.
/// Driver failures are returned as-is.
pub trait SqlConnection {
    /// Execute a statement.
    ///
    /// # Errors
    /// Any error reported by the driver.
    fn execute(&self, sql: &str, args: &[RowValues]) -> Result<ExecResult, TableMapError>;

    /// Run a query and collect every row.
    ///
    /// # Errors
    /// Any error reported by the driver.
    fn query(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, TableMapError>;

    /// Run a query expected to match one row.
    ///
    /// # Errors
    /// [`TableMapError::NotFound`] when no row matches, or any driver error.
    fn query_row(&self, sql: &str, args: &[RowValues]) -> Result<CustomDbRow, TableMapError> {
        self.query(sql, args)?
            .into_iter()
            .next()
            .ok_or(TableMapError::NotFound)
    }
}

impl<C: SqlConnection + ?Sized> SqlConnection for &C {
    fn execute(&self, sql: &str, args: &[RowValues]) -> Result<ExecResult, TableMapError> {
        (**self).execute(sql, args)
    }

    fn query(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, TableMapError> {
        (**self).query(sql, args)
    }
}
