use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::column::ColumnDescriptor;
use crate::error::TableMapError;
use crate::record::{Record, RecordRef, TRANSIENT};
use crate::table::TableDescriptor;

/// Turns a type or field name into its default storage name.
pub type NameMapper = fn(&str) -> String;

/// Default mapper: names are used as written.
#[must_use]
pub fn identity_mapper(name: &str) -> String {
    name.to_string()
}

/// `friend_id` -> `FriendId`.
#[must_use]
pub fn snake_to_camel(name: &str) -> String {
    name.to_upper_camel_case()
}

/// `FriendId` -> `friend_id`.
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    name.to_snake_case()
}

static GLOBAL: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::new);

/// Maps record types to their [`TableDescriptor`]s.
///
/// Registration is append-only. Register types and declare keys at start-up,
/// before query traffic; lookups are safe from any thread at any time.
#[derive(Debug)]
pub struct TypeRegistry {
    tables: RwLock<HashMap<TypeId, Arc<TableDescriptor>>>,
    name_mapper: NameMapper,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_name_mapper(identity_mapper)
    }

    #[must_use]
    pub fn with_name_mapper(name_mapper: NameMapper) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            name_mapper,
        }
    }

    /// Process-wide registry for callers that do not want to thread their own.
    #[must_use]
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Map `T` to a table.
    ///
    /// The table name is `name` if given, otherwise `T::TYPE_NAME` passed
    /// through the name mapper. Registering an already registered type only
    /// updates its table name and returns the existing descriptor.
    pub fn register<T: Record>(&self, name: Option<&str>) -> Arc<TableDescriptor> {
        let table_name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => (self.name_mapper)(T::TYPE_NAME),
        };

        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = tables.get(&TypeId::of::<T>()) {
            existing.rename(&table_name);
            return Arc::clone(existing);
        }

        tracing::debug!(table = %table_name, record = T::TYPE_NAME, "registering table");
        let descriptor = Arc::new(TableDescriptor::new(
            TypeId::of::<T>(),
            T::TYPE_NAME,
            table_name,
            derive_columns::<T>(self.name_mapper),
        ));
        tables.insert(TypeId::of::<T>(), Arc::clone(&descriptor));
        descriptor
    }

    /// Shorthand for `register::<T>(Some(name))`.
    pub fn register_with_name<T: Record>(&self, name: &str) -> Arc<TableDescriptor> {
        self.register::<T>(Some(name))
    }

    /// Exact-type lookup.
    #[must_use]
    pub fn lookup<T: Record>(&self) -> Option<Arc<TableDescriptor>> {
        self.lookup_type(TypeId::of::<T>())
    }

    #[must_use]
    pub fn lookup_type(&self, type_id: TypeId) -> Option<Arc<TableDescriptor>> {
        let tables = match self.tables.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables.get(&type_id).cloned()
    }

    /// Lookup through references, boxes and collections of records.
    ///
    /// # Errors
    /// [`TableMapError::UnregisteredType`] when the element type was never
    /// registered.
    pub fn lookup_for_value<V: RecordRef + ?Sized>(
        &self,
        _value: &V,
    ) -> Result<Arc<TableDescriptor>, TableMapError> {
        self.lookup::<V::Element>().ok_or_else(|| {
            TableMapError::UnregisteredType(<V::Element as Record>::TYPE_NAME.to_string())
        })
    }

    /// Declare the primary key of a registered table.
    ///
    /// See [`TableDescriptor::set_keys`].
    ///
    /// # Errors
    /// Propagates the errors of [`TableDescriptor::set_keys`].
    pub fn set_primary_key(
        &self,
        descriptor: &Arc<TableDescriptor>,
        auto_increment: bool,
        fields: &[&str],
    ) -> Result<Arc<TableDescriptor>, TableMapError> {
        descriptor.set_keys(auto_increment, fields)?;
        Ok(Arc::clone(descriptor))
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.tables.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn name_mapper(&self) -> NameMapper {
        self.name_mapper
    }
}

/// Column descriptors for `T`'s fields, in declaration order.
pub(crate) fn derive_columns<T: Record>(name_mapper: NameMapper) -> Vec<ColumnDescriptor> {
    T::fields()
        .iter()
        .map(|field| {
            let storage = match field.tag {
                Some(tag) if !tag.is_empty() => tag.to_string(),
                _ => name_mapper(field.name),
            };
            let mut col = ColumnDescriptor::new(field.name, storage);
            col.transient = col.storage_name == TRANSIENT;
            col
        })
        .collect()
}
