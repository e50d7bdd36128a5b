//! Whole-entity CRUD over any [`SqlConnection`].
//!
//! Batch operations run one statement per record and stop at the first
//! failure. Nothing is wrapped in a transaction: records before the failing
//! one stay written, including any auto-increment keys already copied back
//! onto them. Run the batch inside
//! [`SqliteDb::with_transaction`](crate::SqliteDb::with_transaction) when it
//! must be all or nothing.

use std::any::TypeId;
use std::sync::Arc;

use crate::conn::SqlConnection;
use crate::error::TableMapError;
use crate::plan::PlanKind;
use crate::record::{FieldError, Record};
use crate::registry::{TypeRegistry, derive_columns};
use crate::results::{CustomDbRow, ResultSet};
use crate::table::TableDescriptor;
use crate::types::RowValues;

/// Registered table for `T`; with `check_pk`, a table without keys is an error.
fn table_for<T: Record>(
    registry: &TypeRegistry,
    check_pk: bool,
) -> Result<Arc<TableDescriptor>, TableMapError> {
    let table = registry
        .lookup::<T>()
        .ok_or_else(|| TableMapError::UnregisteredType(T::TYPE_NAME.to_string()))?;
    if check_pk && !table.has_keys() {
        return Err(TableMapError::NoPrimaryKey {
            table: table.table_name(),
        });
    }
    Ok(table)
}

/// Table used to scan rows into `T`: the registered one, or an unregistered
/// descriptor derived the same way `register` would.
fn scan_table<T: Record>(registry: &TypeRegistry) -> Arc<TableDescriptor> {
    registry.lookup::<T>().unwrap_or_else(|| {
        Arc::new(TableDescriptor::new(
            TypeId::of::<T>(),
            T::TYPE_NAME,
            (registry.name_mapper())(T::TYPE_NAME),
            derive_columns::<T>(registry.name_mapper()),
        ))
    })
}

/// Fields the columns of a result scan into, in column order.
fn scan_fields(
    table: &TableDescriptor,
    column_names: &[String],
) -> Result<Vec<String>, TableMapError> {
    column_names
        .iter()
        .map(|column| {
            table.field_for_column(column).ok_or_else(|| {
                TableMapError::InvalidDestination(format!(
                    "missing destination name {column} in {}",
                    table.type_name()
                ))
            })
        })
        .collect()
}

fn scan_row<T: Record>(
    table: &TableDescriptor,
    fields: &[String],
    row: CustomDbRow,
    dest: &mut T,
) -> Result<(), TableMapError> {
    for (field, value) in fields.iter().zip(row.rows) {
        dest.set_field(field, value).map_err(|e| match e {
            FieldError::Unknown => TableMapError::FieldBinding {
                table: table.table_name(),
                field: field.clone(),
            },
            FieldError::Conversion(reason) => TableMapError::ValueConversion {
                field: field.clone(),
                reason,
            },
        })?;
    }
    Ok(())
}

/// Load the row whose primary key equals `keys` into `dest`.
///
/// Key values are given in declared key order.
///
/// # Errors
/// [`TableMapError::NotFound`] when no row matches; [`TableMapError::NoPrimaryKey`]
/// or [`TableMapError::KeyCountMismatch`] before any I/O; driver errors as-is.
pub fn get<T, C>(
    registry: &TypeRegistry,
    conn: &C,
    dest: &mut T,
    keys: &[RowValues],
) -> Result<(), TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    let table = table_for::<T>(registry, true)?;
    let bi = table.plan(PlanKind::Get)?.bind_keys(keys)?;
    tracing::debug!(sql = %bi.sql, "get");
    let row = conn.query_row(&bi.sql, &bi.args)?;
    let fields = scan_fields(&table, &row.column_names)?;
    scan_row(&table, &fields, row, dest)
}

/// Insert each record in order.
///
/// When the table has an auto-increment key, the generated id is written back
/// onto the record right after its insert.
///
/// # Errors
/// Stops at the first failing record. [`TableMapError::AutoIncrementTypeMismatch`]
/// when the key field cannot hold an integer (the row is already inserted).
pub fn insert<T, C>(
    registry: &TypeRegistry,
    conn: &C,
    records: &mut [T],
) -> Result<(), TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    let table = table_for::<T>(registry, false)?;
    let plan = table.plan(PlanKind::Insert)?;

    for record in records.iter_mut() {
        let bi = plan.bind(&*record)?;
        tracing::debug!(sql = %bi.sql, "insert");
        let res = conn.execute(&bi.sql, &bi.args)?;

        let Some(auto) = &bi.auto_increment else {
            continue;
        };
        let id = res.last_insert_id.ok_or_else(|| {
            TableMapError::ConnectionError(format!(
                "driver reported no generated key for {}",
                bi.sql
            ))
        })?;
        record
            .set_generated_key(&auto.field, id)
            .map_err(|e| match e {
                FieldError::Unknown => TableMapError::FieldBinding {
                    table: table.table_name(),
                    field: auto.field.clone(),
                },
                FieldError::Conversion(_) => TableMapError::AutoIncrementTypeMismatch {
                    field: auto.field.clone(),
                    sql: bi.sql.to_string(),
                },
            })?;
    }
    Ok(())
}

fn execute_keyed<T, C>(
    registry: &TypeRegistry,
    conn: &C,
    records: &[T],
    kind: PlanKind,
) -> Result<u64, TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    let table = table_for::<T>(registry, true)?;
    let plan = table.plan(kind)?;

    let mut count = 0;
    for record in records {
        let bi = plan.bind(record)?;
        tracing::debug!(sql = %bi.sql, ?kind, "execute");
        count += conn.execute(&bi.sql, &bi.args)?.rows_affected;
    }
    Ok(count)
}

/// Update each record by primary key; returns the total rows affected.
///
/// A record whose key matches no row contributes zero; that is not an error.
///
/// # Errors
/// [`TableMapError::NoPrimaryKey`] before any I/O when the table has no keys.
/// Otherwise stops at the first failing record.
pub fn update<T, C>(registry: &TypeRegistry, conn: &C, records: &[T]) -> Result<u64, TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    execute_keyed(registry, conn, records, PlanKind::Update)
}

/// Delete each record by primary key; returns the total rows affected.
///
/// # Errors
/// Same as [`update`].
pub fn delete<T, C>(registry: &TypeRegistry, conn: &C, records: &[T]) -> Result<u64, TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    execute_keyed(registry, conn, records, PlanKind::Delete)
}

/// Insert when `is_new`, otherwise update.
///
/// # Errors
/// See [`insert`] and [`update`].
pub fn put<T, C>(
    registry: &TypeRegistry,
    conn: &C,
    is_new: bool,
    records: &mut [T],
) -> Result<(), TableMapError>
where
    T: Record,
    C: SqlConnection + ?Sized,
{
    if is_new {
        insert(registry, conn, records)
    } else {
        update(registry, conn, records).map(|_| ())
    }
}

/// Where [`select_into`] puts rows: one record, or a `Vec` of them.
///
/// `record!` implements this for the record type; see
/// [`impl_record_traits!`](crate::impl_record_traits).
pub trait SelectDest {
    type Element: Record;

    /// Scan a query result into `self`.
    ///
    /// # Errors
    /// [`TableMapError::InvalidDestination`] for result columns with no field,
    /// [`TableMapError::NotFound`] for an empty result into a single record.
    fn scan(&mut self, table: &TableDescriptor, rows: ResultSet) -> Result<(), TableMapError>;
}

/// Scan the first row of `rows` into `dest`.
///
/// # Errors
/// See [`SelectDest::scan`].
pub fn scan_one<T: Record>(
    dest: &mut T,
    table: &TableDescriptor,
    rows: ResultSet,
) -> Result<(), TableMapError> {
    let fields = scan_fields(table, rows.column_names())?;
    let row = rows.into_iter().next().ok_or(TableMapError::NotFound)?;
    scan_row(table, &fields, row, dest)
}

impl<T: Record + Default> SelectDest for Vec<T> {
    type Element = T;

    fn scan(&mut self, table: &TableDescriptor, rows: ResultSet) -> Result<(), TableMapError> {
        let fields = scan_fields(table, rows.column_names())?;
        self.reserve(rows.len());
        for row in rows {
            let mut record = T::default();
            scan_row(table, &fields, row, &mut record)?;
            self.push(record);
        }
        Ok(())
    }
}

/// Run a hand-written query and scan the result into `dest`.
///
/// Result columns are matched to fields by storage name, then by field name.
/// A `Vec` destination gets every row appended; a single record takes the
/// first row.
///
/// # Errors
/// [`TableMapError::InvalidDestination`] when a result column has no field,
/// [`TableMapError::NotFound`] when a single-record destination gets no rows,
/// driver errors as-is.
pub fn select_into<D, C>(
    registry: &TypeRegistry,
    conn: &C,
    dest: &mut D,
    query: &str,
    args: &[RowValues],
) -> Result<(), TableMapError>
where
    D: SelectDest + ?Sized,
    C: SqlConnection + ?Sized,
{
    let table = scan_table::<D::Element>(registry);
    tracing::debug!(sql = query, "select");
    let rows = conn.query(query, args)?;
    dest.scan(&table, rows)
}

/// Run a single-value integer query such as `SELECT COUNT(*) ...`.
///
/// # Errors
/// [`TableMapError::NotFound`] for no rows, [`TableMapError::ValueConversion`]
/// when the value is not an integer (including NULL).
pub fn scalar<C>(conn: &C, query: &str, args: &[RowValues]) -> Result<i64, TableMapError>
where
    C: SqlConnection + ?Sized,
{
    tracing::debug!(sql = query, "scalar");
    let row = conn.query_row(query, args)?;
    match row.get_by_index(0) {
        Some(RowValues::Int(v)) => Ok(*v),
        other => Err(TableMapError::ValueConversion {
            field: row
                .column_names
                .first()
                .cloned()
                .unwrap_or_default(),
            reason: format!(
                "expected int, got {}",
                other.map_or("no column", RowValues::kind)
            ),
        }),
    }
}
