use std::any::TypeId;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::column::ColumnDescriptor;
use crate::dialect::quote_field;
use crate::error::TableMapError;
use crate::plan::{self, BindPlan, PlanKind, PlanUnavailable};

type PlanSlot = Result<Arc<BindPlan>, PlanUnavailable>;

/// Mapping between a record type and a database table.
///
/// Created through [`TypeRegistry::register`](crate::TypeRegistry::register).
/// All four CRUD plans are rebuilt whenever the descriptor changes (table
/// name, key set, column names, transience), so a plan handed out by
/// [`TableDescriptor::plan`] is always consistent with the columns it was
/// built from and is never rebuilt on the query path.
#[derive(Debug)]
pub struct TableDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    state: RwLock<TableState>,
}

#[derive(Debug)]
struct TableState {
    table_name: String,
    columns: Vec<ColumnDescriptor>,
    /// Indexes into `columns`, in declared key order.
    keys: Vec<usize>,
    columns_str: String,
    plans: [PlanSlot; 4],
}

impl TableState {
    fn new(table_name: String, columns: Vec<ColumnDescriptor>) -> Self {
        let mut state = TableState {
            table_name,
            columns,
            keys: Vec::new(),
            columns_str: String::new(),
            plans: std::array::from_fn(|_| Err(PlanUnavailable::NoPrimaryKey)),
        };
        state.rebuild();
        state
    }

    fn rebuild(&mut self) {
        tracing::trace!(table = %self.table_name, "rebuilding sql plans");
        self.plans = PlanKind::ALL
            .map(|kind| plan::build(kind, &self.table_name, &self.columns, &self.keys).map(Arc::new));
        let table = quote_field(&self.table_name);
        self.columns_str = self
            .columns
            .iter()
            .filter(|c| !c.transient)
            .map(|c| format!("{table}.{}", quote_field(&c.storage_name)))
            .collect::<Vec<_>>()
            .join(",");
    }

    fn position(&self, name: &str) -> Result<usize, TableMapError> {
        self.columns
            .iter()
            .position(|c| c.matches(name))
            .ok_or_else(|| TableMapError::UnknownField {
                table: self.table_name.clone(),
                field: name.to_string(),
            })
    }
}

fn slot_index(kind: PlanKind) -> usize {
    match kind {
        PlanKind::Get => 0,
        PlanKind::Insert => 1,
        PlanKind::Update => 2,
        PlanKind::Delete => 3,
    }
}

impl TableDescriptor {
    pub(crate) fn new(
        type_id: TypeId,
        type_name: &'static str,
        table_name: String,
        columns: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            type_id,
            type_name,
            state: RwLock::new(TableState::new(table_name, columns)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TableState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the mapped record type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn table_name(&self) -> String {
        self.read().table_name.clone()
    }

    /// Rename the table. Plans are rebuilt.
    pub fn set_table_name(&self, name: impl Into<String>) {
        let mut state = self.write();
        state.table_name = name.into();
        state.rebuild();
    }

    /// Snapshot of the columns in field declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        self.read().columns.clone()
    }

    /// Snapshot of the primary-key columns in declared key order.
    #[must_use]
    pub fn primary_keys(&self) -> Vec<ColumnDescriptor> {
        let state = self.read();
        state.keys.iter().map(|&i| state.columns[i].clone()).collect()
    }

    #[must_use]
    pub fn has_keys(&self) -> bool {
        !self.read().keys.is_empty()
    }

    /// Column for a field, matched by field name or storage name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<ColumnDescriptor> {
        self.read().columns.iter().find(|c| c.matches(name)).cloned()
    }

    /// Declare the primary key.
    ///
    /// Each name is matched against field names and storage names. The
    /// previous key set is replaced and every plan is rebuilt. With
    /// `auto_increment`, the single key column receives the generated id
    /// after an insert.
    ///
    /// # Errors
    /// [`TableMapError::UnknownField`] for a name with no column, and
    /// [`TableMapError::MultipleAutoIncrement`] when `auto_increment` is set
    /// with more than one key field. The descriptor is unchanged on error.
    pub fn set_keys(&self, auto_increment: bool, fields: &[&str]) -> Result<(), TableMapError> {
        let mut state = self.write();
        if auto_increment && fields.len() > 1 {
            return Err(TableMapError::MultipleAutoIncrement {
                table: state.table_name.clone(),
                count: fields.len(),
            });
        }
        let keys = fields
            .iter()
            .map(|name| state.position(name))
            .collect::<Result<Vec<_>, _>>()?;

        for col in &mut state.columns {
            col.is_primary_key = false;
            col.is_auto_increment = false;
        }
        for &idx in &keys {
            let col = &mut state.columns[idx];
            col.is_primary_key = true;
            col.is_auto_increment = auto_increment;
        }
        state.keys = keys;
        state.rebuild();
        Ok(())
    }

    /// Mark a column transient (or not). Plans are rebuilt.
    ///
    /// # Errors
    /// [`TableMapError::UnknownField`] when no column matches `field`.
    pub fn set_transient(&self, field: &str, transient: bool) -> Result<(), TableMapError> {
        let mut state = self.write();
        let idx = state.position(field)?;
        state.columns[idx].transient = transient;
        state.rebuild();
        Ok(())
    }

    /// Change a column's storage name. Plans are rebuilt.
    ///
    /// # Errors
    /// [`TableMapError::UnknownField`] when no column matches `field`.
    pub fn set_column_name(&self, field: &str, storage_name: &str) -> Result<(), TableMapError> {
        let mut state = self.write();
        let idx = state.position(field)?;
        state.columns[idx].storage_name = storage_name.to_string();
        state.rebuild();
        Ok(())
    }

    /// Regenerate every cached plan from the current columns.
    pub fn reset_sql(&self) {
        self.write().rebuild();
    }

    /// The cached plan for an operation.
    ///
    /// # Errors
    /// [`TableMapError::NoPrimaryKey`] for get/update/delete on a table without
    /// keys, [`TableMapError::NoBindableColumns`] when the plan would have no
    /// columns to read or write.
    pub fn plan(&self, kind: PlanKind) -> Result<Arc<BindPlan>, TableMapError> {
        let state = self.read();
        match &state.plans[slot_index(kind)] {
            Ok(plan) => Ok(Arc::clone(plan)),
            Err(unavailable) => Err(unavailable.into_error(&state.table_name)),
        }
    }

    /// Comma-separated `` `table`.`column` `` list of non-transient columns.
    #[must_use]
    pub fn columns_str(&self) -> String {
        self.read().columns_str.clone()
    }

    /// Field that a result column named `column` scans into.
    pub(crate) fn field_for_column(&self, column: &str) -> Option<String> {
        let state = self.read();
        state
            .columns
            .iter()
            .filter(|c| !c.transient)
            .find(|c| c.storage_name == column)
            .or_else(|| {
                state
                    .columns
                    .iter()
                    .filter(|c| !c.transient)
                    .find(|c| c.field_name == column)
            })
            .map(|c| c.field_name.clone())
    }

    pub(crate) fn rename(&self, name: &str) {
        if self.read().table_name != name {
            self.set_table_name(name);
        }
    }
}

impl std::fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.table_name(), self.type_name)
    }
}
