/// Mapping between one record field and one table column.
///
/// Descriptors are owned by their [`TableDescriptor`](crate::TableDescriptor)
/// and only change through its methods, which rebuild the cached plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub(crate) storage_name: String,
    pub(crate) field_name: String,
    pub(crate) transient: bool,
    pub(crate) is_primary_key: bool,
    pub(crate) is_auto_increment: bool,
}

impl ColumnDescriptor {
    /// Create a plain column: not transient, not part of the key
    ///
    /// # Arguments
    ///
    /// * `field_name` - The record field the column maps to
    /// * `storage_name` - The column name in the table
    ///
    /// # Returns
    ///
    /// A new `ColumnDescriptor`
    #[must_use]
    pub fn new(field_name: impl Into<String>, storage_name: impl Into<String>) -> Self {
        Self {
            storage_name: storage_name.into(),
            field_name: field_name.into(),
            transient: false,
            is_primary_key: false,
            is_auto_increment: false,
        }
    }

    /// Column name in the table.
    #[must_use]
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    /// Record field this column is read from and written to.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Transient columns are skipped by every generated statement.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Part of the table's primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// The database generates this column's value on insert; it is written
    /// back onto the record afterwards.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.is_auto_increment
    }

    /// True when `name` is either the field name or the storage name.
    pub(crate) fn matches(&self, name: &str) -> bool {
        self.field_name == name || self.storage_name == name
    }
}
