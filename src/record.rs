//! The capability a type needs in order to be mapped onto a table.
//!
//! Mapping works over named fields instead of runtime type inspection: a record
//! lists its fields once ([`Record::fields`]) and exposes typed getters and
//! setters keyed by field name. The [`record!`](crate::record!) macro writes all
//! of that for a plain struct.

use crate::types::RowValues;

/// Field tag that excludes a field from every generated statement.
pub const TRANSIENT: &str = "-";

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name.
    pub name: &'static str,
    /// Storage-name override; [`TRANSIENT`] marks the field transient.
    pub tag: Option<&'static str>,
}

/// Why a field could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The record has no field with that name.
    Unknown,
    /// The field exists but the value does not fit its type.
    Conversion(String),
}

/// A type whose instances correspond to table rows.
pub trait Record: Send + 'static {
    /// Name of the type, the default source of the table name.
    const TYPE_NAME: &'static str;

    /// Fields in declaration order.
    fn fields() -> &'static [FieldInfo];

    /// Read a field by name. `None` when the record has no such field.
    fn field_value(&self, field: &str) -> Option<RowValues>;

    /// Write a field by name.
    ///
    /// # Errors
    /// [`FieldError::Unknown`] for a missing field, [`FieldError::Conversion`]
    /// when the value cannot be stored in the field's type.
    fn set_field(&mut self, field: &str, value: RowValues) -> Result<(), FieldError>;

    /// Store a key generated by an auto-increment column into `field`.
    ///
    /// # Errors
    /// [`FieldError::Unknown`] for a missing field, [`FieldError::Conversion`]
    /// when the field's type cannot hold an integer key.
    fn set_generated_key(&mut self, field: &str, id: i64) -> Result<(), FieldError>;
}

/// Resolves references, boxes and collections down to the record type they hold.
///
/// `record!` implements this for the record itself; hand-written [`Record`]
/// impls get it from [`impl_record_traits!`](crate::impl_record_traits).
pub trait RecordRef {
    type Element: Record;
}

impl<T: RecordRef + ?Sized> RecordRef for &T {
    type Element = T::Element;
}

impl<T: RecordRef + ?Sized> RecordRef for &mut T {
    type Element = T::Element;
}

impl<T: RecordRef + ?Sized> RecordRef for Box<T> {
    type Element = T::Element;
}

impl<T: RecordRef> RecordRef for Vec<T> {
    type Element = T::Element;
}

impl<T: RecordRef> RecordRef for [T] {
    type Element = T::Element;
}

impl<T: RecordRef> RecordRef for Option<T> {
    type Element = T::Element;
}

/// Declare a struct and implement [`Record`] for it.
///
/// A field may carry `#[column = "name"]` to override its storage name;
/// `#[column = "-"]` keeps it out of all generated SQL. Every field type must
/// implement [`FieldValue`](crate::FieldValue).
///
/// ```rust
/// use sql_tablemap::record;
///
/// record! {
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct Friend {
///         pub friend_id: i64,
///         #[column = "Name"]
///         pub name: String,
///         #[column = "-"]
///         pub visits: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[column = $tag:literal])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $ty, )*
        }

        impl $crate::record::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn fields() -> &'static [$crate::record::FieldInfo] {
                &[
                    $(
                        $crate::record::FieldInfo {
                            name: stringify!($field),
                            tag: $crate::__record_tag!($($tag)?),
                        },
                    )*
                ]
            }

            fn field_value(&self, field: &str) -> Option<$crate::RowValues> {
                match field {
                    $( stringify!($field) => Some($crate::FieldValue::to_row_value(&self.$field)), )*
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                field: &str,
                value: $crate::RowValues,
            ) -> Result<(), $crate::record::FieldError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = <$ty as $crate::FieldValue>::from_row_value(value)
                                .map_err($crate::record::FieldError::Conversion)?;
                            Ok(())
                        }
                    )*
                    _ => {
                        let _ = value;
                        Err($crate::record::FieldError::Unknown)
                    }
                }
            }

            fn set_generated_key(
                &mut self,
                field: &str,
                id: i64,
            ) -> Result<(), $crate::record::FieldError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = <$ty as $crate::FieldValue>::from_generated_key(id)
                                .map_err($crate::record::FieldError::Conversion)?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::record::FieldError::Unknown),
                }
            }
        }

        $crate::impl_record_traits!($name);
    };
}

/// Implement the companion traits of a hand-written [`Record`]:
/// [`RecordRef`] and [`SelectDest`](crate::crud::SelectDest).
///
/// `record!` calls this itself.
#[macro_export]
macro_rules! impl_record_traits {
    ($name:ty) => {
        impl $crate::record::RecordRef for $name {
            type Element = $name;
        }

        impl $crate::crud::SelectDest for $name {
            type Element = $name;

            fn scan(
                &mut self,
                table: &$crate::TableDescriptor,
                rows: $crate::ResultSet,
            ) -> Result<(), $crate::TableMapError> {
                $crate::crud::scan_one(self, table, rows)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_tag {
    () => {
        None
    };
    ($tag:literal) => {
        Some($tag)
    };
}
