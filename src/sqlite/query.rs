use rusqlite::types::Value;
use rusqlite::{Connection, Statement};

use crate::conn::ExecResult;
use crate::error::TableMapError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::{Params, sqlite_value_to_row_value};

/// Run a prepared statement as a query and collect its rows.
///
/// # Errors
/// Returns the rusqlite error if binding, stepping or reading a value fails.
pub fn build_result_set(
    stmt: &mut Statement<'_>,
    params: &[RowValues],
) -> Result<ResultSet, TableMapError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names, 10);

    let converted = Params::convert(params);
    let mut rows = stmt.query(&converted.as_refs()[..])?;
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value: Value = row.get(i)?;
            row_values.push(sqlite_value_to_row_value(value));
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// True for statements that create rows and so report a generated rowid.
fn creates_rows(sql: &str) -> bool {
    let head = sql.trim_start();
    ["INSERT", "REPLACE"].iter().any(|kw| {
        head.get(..kw.len())
            .is_some_and(|word| word.eq_ignore_ascii_case(kw))
    })
}

/// Run a prepared statement that returns no rows.
///
/// `last_insert_id` is only reported for `INSERT`/`REPLACE` statements.
///
/// # Errors
/// Returns the rusqlite error if binding or execution fails.
pub fn execute_statement(
    conn: &Connection,
    sql: &str,
    stmt: &mut Statement<'_>,
    params: &[RowValues],
) -> Result<ExecResult, TableMapError> {
    let converted = Params::convert(params);
    let rows_affected = stmt.execute(&converted.as_refs()[..])?;
    Ok(ExecResult {
        rows_affected: rows_affected as u64,
        last_insert_id: creates_rows(sql).then(|| conn.last_insert_rowid()),
    })
}
