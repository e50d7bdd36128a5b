use std::sync::Arc;

/// Handle to a statement prepared on a [`SqliteDb`](super::SqliteDb).
///
/// The handle records what preparing the SQL told us (column names and
/// parameter count). The compiled statement itself stays in the owning
/// connection's `prepare_cached` store and is reused on every execution, so
/// handles are cheap to clone and share between callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlitePreparedStatement {
    sql: Arc<str>,
    column_names: Vec<String>,
    parameter_count: usize,
}

impl SqlitePreparedStatement {
    pub(crate) fn new(sql: &str, column_names: Vec<String>, parameter_count: usize) -> Self {
        Self {
            sql: sql.into(),
            column_names,
            parameter_count,
        }
    }

    /// Access the raw SQL string of the prepared statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Result columns; empty for statements that return no rows.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }
}
