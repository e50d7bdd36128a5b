//! SQL text helpers for the single supported dialect.
//!
//! Positional `?` placeholders and backtick-quoted identifiers. SQLite accepts
//! both, as does MySQL.

use std::fmt::Display;

use crate::types::RowValues;

/// Placeholder for the `i`-th bound argument. Positional, so always `?`.
#[must_use]
pub fn bind_var(_i: usize) -> &'static str {
    "?"
}

/// Quote an identifier. Backticks inside the name are doubled.
#[must_use]
pub fn quote_field(f: &str) -> String {
    format!("`{}`", f.replace('`', "``"))
}

/// `%value%` for a substring `LIKE` match.
#[must_use]
pub fn full_match(v: impl Display) -> String {
    format!("%{v}%")
}

/// `value%`: the value followed by anything.
#[must_use]
pub fn suffix_match(v: impl Display) -> String {
    format!("{v}%")
}

/// `%value`: anything followed by the value.
#[must_use]
pub fn pre_match(v: impl Display) -> String {
    format!("%{v}")
}

/// `?, ?, ?` with `n` placeholders, for an `IN (...)` list.
#[must_use]
pub fn prepare_in(n: usize) -> String {
    vec![bind_var(0); n].join(", ")
}

/// ` WHERE a AND b`, or an empty string when there are no clauses.
#[must_use]
pub fn prepare_where(clauses: &[String]) -> String {
    if clauses.is_empty() {
        return String::new();
    }
    format!(" WHERE {}", clauses.join(" AND "))
}

/// An integer filter on one column: a single value or a set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntFilter {
    One(i64),
    Many(Vec<i64>),
}

/// Append the clause and arguments for an [`IntFilter`] on `table.field`.
///
/// `Many` with no values adds nothing.
pub fn prepare_int_in(
    args: &mut Vec<RowValues>,
    clauses: &mut Vec<String>,
    filter: &IntFilter,
    table: &str,
    field: &str,
) {
    match filter {
        IntFilter::Many(values) if values.is_empty() => {}
        IntFilter::Many(values) => {
            clauses.push(format!(
                "{table}.{field} IN ({})",
                prepare_in(values.len())
            ));
            args.extend(values.iter().map(|v| RowValues::Int(*v)));
        }
        IntFilter::One(v) => {
            clauses.push(format!("{table}.{field} = {}", bind_var(0)));
            args.push(RowValues::Int(*v));
        }
    }
}
