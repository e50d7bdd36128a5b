//! SQL plan generation and binding.
//!
//! A [`BindPlan`] is built once per table and operation from the table's
//! column descriptors. Binding it against a record copies the named fields,
//! in placeholder order, into a [`BindInstance`].

use std::fmt::Write;
use std::sync::Arc;

use crate::column::ColumnDescriptor;
use crate::dialect::{bind_var, quote_field};
use crate::error::TableMapError;
use crate::record::Record;
use crate::types::RowValues;

/// The whole-entity operations a table has plans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    /// Select one row by primary key.
    Get,
    Insert,
    Update,
    Delete,
}

impl PlanKind {
    pub const ALL: [PlanKind; 4] = [
        PlanKind::Get,
        PlanKind::Insert,
        PlanKind::Update,
        PlanKind::Delete,
    ];
}

/// The column that receives the generated key after an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoIncrement {
    /// Position of the column in the table's column list.
    pub index: usize,
    pub field: String,
}

/// Cached SQL template plus the fields to pull arguments from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPlan {
    pub(crate) table: String,
    pub(crate) sql: Arc<str>,
    pub(crate) arg_fields: Vec<String>,
    pub(crate) key_fields: Vec<String>,
    pub(crate) auto_increment: Option<AutoIncrement>,
}

/// A plan applied to one record: SQL plus the values to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct BindInstance {
    pub sql: Arc<str>,
    pub args: Vec<RowValues>,
    pub keys: Vec<RowValues>,
    pub auto_increment: Option<AutoIncrement>,
}

/// Why a plan cannot be produced for the current descriptor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlanUnavailable {
    NoPrimaryKey,
    NoBindableColumns,
}

impl PlanUnavailable {
    pub(crate) fn into_error(self, table: &str) -> TableMapError {
        match self {
            PlanUnavailable::NoPrimaryKey => TableMapError::NoPrimaryKey {
                table: table.to_string(),
            },
            PlanUnavailable::NoBindableColumns => TableMapError::NoBindableColumns {
                table: table.to_string(),
            },
        }
    }
}

impl BindPlan {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Fields whose values fill the `?` placeholders, in order.
    #[must_use]
    pub fn arg_fields(&self) -> &[String] {
        &self.arg_fields
    }

    /// Primary-key fields, in declared key order.
    #[must_use]
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    #[must_use]
    pub fn auto_increment(&self) -> Option<&AutoIncrement> {
        self.auto_increment.as_ref()
    }

    /// Bind the plan against a record.
    ///
    /// # Errors
    /// [`TableMapError::FieldBinding`] when the record lacks a field named by
    /// the plan, which means the record and its descriptor disagree.
    pub fn bind<R: Record>(&self, record: &R) -> Result<BindInstance, TableMapError> {
        Ok(BindInstance {
            sql: Arc::clone(&self.sql),
            args: self.read_fields(record, &self.arg_fields)?,
            keys: self.read_fields(record, &self.key_fields)?,
            auto_increment: self.auto_increment.clone(),
        })
    }

    /// Bind caller-supplied key values, for plans whose arguments are the key.
    ///
    /// # Errors
    /// [`TableMapError::KeyCountMismatch`] when the number of values differs
    /// from the number of key columns.
    pub fn bind_keys(&self, keys: &[RowValues]) -> Result<BindInstance, TableMapError> {
        if keys.len() != self.key_fields.len() {
            return Err(TableMapError::KeyCountMismatch {
                table: self.table.clone(),
                expected: self.key_fields.len(),
                got: keys.len(),
            });
        }
        Ok(BindInstance {
            sql: Arc::clone(&self.sql),
            args: keys.to_vec(),
            keys: keys.to_vec(),
            auto_increment: None,
        })
    }

    fn read_fields<R: Record>(
        &self,
        record: &R,
        fields: &[String],
    ) -> Result<Vec<RowValues>, TableMapError> {
        fields
            .iter()
            .map(|field| {
                record
                    .field_value(field)
                    .ok_or_else(|| TableMapError::FieldBinding {
                        table: self.table.clone(),
                        field: field.clone(),
                    })
            })
            .collect()
    }
}

pub(crate) fn build(
    kind: PlanKind,
    table: &str,
    columns: &[ColumnDescriptor],
    keys: &[usize],
) -> Result<BindPlan, PlanUnavailable> {
    match kind {
        PlanKind::Get => build_get(table, columns, keys),
        PlanKind::Insert => build_insert(table, columns),
        PlanKind::Update => build_update(table, columns, keys),
        PlanKind::Delete => build_delete(table, columns, keys),
    }
}

/// ` WHERE `k1`=? AND `k2`=?` plus the key field names.
fn key_clause(columns: &[ColumnDescriptor], keys: &[usize]) -> (String, Vec<String>) {
    let mut s = String::from(" WHERE ");
    let mut fields = Vec::with_capacity(keys.len());
    for (x, &idx) in keys.iter().enumerate() {
        let col = &columns[idx];
        if x > 0 {
            s.push_str(" AND ");
        }
        let _ = write!(s, "{}={}", quote_field(&col.storage_name), bind_var(x));
        fields.push(col.field_name.clone());
    }
    (s, fields)
}

fn build_get(
    table: &str,
    columns: &[ColumnDescriptor],
    keys: &[usize],
) -> Result<BindPlan, PlanUnavailable> {
    if keys.is_empty() {
        return Err(PlanUnavailable::NoPrimaryKey);
    }
    let selected: Vec<String> = columns
        .iter()
        .filter(|c| !c.transient)
        .map(|c| quote_field(&c.storage_name))
        .collect();
    if selected.is_empty() {
        return Err(PlanUnavailable::NoBindableColumns);
    }

    let (where_clause, key_fields) = key_clause(columns, keys);
    let sql = format!(
        "SELECT {} FROM {}{where_clause};",
        selected.join(","),
        quote_field(table)
    );
    Ok(BindPlan {
        table: table.to_string(),
        sql: sql.into(),
        arg_fields: key_fields.clone(),
        key_fields,
        auto_increment: None,
    })
}

fn build_insert(table: &str, columns: &[ColumnDescriptor]) -> Result<BindPlan, PlanUnavailable> {
    let mut names = Vec::new();
    let mut values = Vec::new();
    let mut arg_fields = Vec::new();
    let mut auto_increment = None;

    for (idx, col) in columns.iter().enumerate() {
        if col.transient {
            continue;
        }
        names.push(quote_field(&col.storage_name));
        if col.is_auto_increment {
            values.push("NULL");
            auto_increment = Some(AutoIncrement {
                index: idx,
                field: col.field_name.clone(),
            });
        } else {
            values.push(bind_var(arg_fields.len()));
            arg_fields.push(col.field_name.clone());
        }
    }
    if names.is_empty() {
        return Err(PlanUnavailable::NoBindableColumns);
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_field(table),
        names.join(","),
        values.join(",")
    );
    Ok(BindPlan {
        table: table.to_string(),
        sql: sql.into(),
        arg_fields,
        key_fields: Vec::new(),
        auto_increment,
    })
}

fn build_update(
    table: &str,
    columns: &[ColumnDescriptor],
    keys: &[usize],
) -> Result<BindPlan, PlanUnavailable> {
    if keys.is_empty() {
        return Err(PlanUnavailable::NoPrimaryKey);
    }
    let mut sets = Vec::new();
    let mut arg_fields = Vec::new();
    for col in columns.iter().filter(|c| !c.is_primary_key && !c.transient) {
        sets.push(format!(
            "{}={}",
            quote_field(&col.storage_name),
            bind_var(arg_fields.len())
        ));
        arg_fields.push(col.field_name.clone());
    }
    if sets.is_empty() {
        return Err(PlanUnavailable::NoBindableColumns);
    }

    let (where_clause, key_fields) = key_clause(columns, keys);
    arg_fields.extend(key_fields.iter().cloned());
    let sql = format!(
        "UPDATE {} SET {}{where_clause};",
        quote_field(table),
        sets.join(", ")
    );
    Ok(BindPlan {
        table: table.to_string(),
        sql: sql.into(),
        arg_fields,
        key_fields,
        auto_increment: None,
    })
}

fn build_delete(
    table: &str,
    columns: &[ColumnDescriptor],
    keys: &[usize],
) -> Result<BindPlan, PlanUnavailable> {
    if keys.is_empty() {
        return Err(PlanUnavailable::NoPrimaryKey);
    }
    let (where_clause, key_fields) = key_clause(columns, keys);
    let sql = format!("DELETE FROM {}{where_clause};", quote_field(table));
    Ok(BindPlan {
        table: table.to_string(),
        sql: sql.into(),
        arg_fields: key_fields.clone(),
        key_fields,
        auto_increment: None,
    })
}
