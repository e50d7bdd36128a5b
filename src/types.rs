use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values read off records, bound as statement arguments and returned in rows.
///
/// ```rust
/// use sql_tablemap::prelude::*;
///
/// let args = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // SQLite hands timestamps back as text
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "int",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "bool",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "null",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
        }
    }
}

/// Conversion between a record field's Rust type and [`RowValues`].
///
/// Every field of a mapped record implements this, including transient ones.
pub trait FieldValue: Sized {
    fn to_row_value(&self) -> RowValues;

    /// Convert a value read from the database (or a generated key) back into
    /// the field type.
    ///
    /// # Errors
    /// Returns a human readable reason when the value does not fit the type.
    fn from_row_value(value: RowValues) -> Result<Self, String>;

    /// Convert a key generated by an auto-increment column.
    ///
    /// Only integer types (and `Option` of them) accept generated keys; the
    /// answer never depends on the key's value.
    ///
    /// # Errors
    /// Returns a reason for every type that cannot hold an integer key.
    fn from_generated_key(id: i64) -> Result<Self, String> {
        Err(format!("cannot hold generated key {id}"))
    }
}

fn mismatch(expected: &str, got: &RowValues) -> String {
    format!("expected {expected}, got {}", got.kind())
}

macro_rules! impl_int_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn to_row_value(&self) -> RowValues {
                    RowValues::Int(i64::from(*self))
                }

                fn from_row_value(value: RowValues) -> Result<Self, String> {
                    match value {
                        RowValues::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| format!("{i} out of range for {}", stringify!($ty))),
                        RowValues::Bool(b) => Ok(<$ty>::from(b)),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }

                fn from_generated_key(id: i64) -> Result<Self, String> {
                    <$ty>::try_from(id)
                        .map_err(|_| format!("generated key {id} out of range for {}", stringify!($ty)))
                }
            }
        )*
    };
}

impl_int_field!(i64, i32, i16, i8, u32, u16, u8);

impl FieldValue for f64 {
    fn to_row_value(&self) -> RowValues {
        RowValues::Float(*self)
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value.as_float().ok_or_else(|| mismatch("f64", &value))
    }
}

impl FieldValue for f32 {
    fn to_row_value(&self) -> RowValues {
        RowValues::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value
            .as_float()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch("f32", &value))
    }
}

impl FieldValue for bool {
    fn to_row_value(&self) -> RowValues {
        RowValues::Bool(*self)
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value
            .as_bool()
            .copied()
            .ok_or_else(|| mismatch("bool", &value))
    }
}

impl FieldValue for String {
    fn to_row_value(&self) -> RowValues {
        RowValues::Text(self.clone())
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match value {
            RowValues::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FieldValue for Vec<u8> {
    fn to_row_value(&self) -> RowValues {
        RowValues::Blob(self.clone())
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match value {
            RowValues::Blob(b) => Ok(b),
            RowValues::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("blob", &other)),
        }
    }
}

impl FieldValue for NaiveDateTime {
    fn to_row_value(&self) -> RowValues {
        RowValues::Timestamp(*self)
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value
            .as_timestamp()
            .ok_or_else(|| mismatch("timestamp", &value))
    }
}

impl FieldValue for JsonValue {
    fn to_row_value(&self) -> RowValues {
        RowValues::JSON(self.clone())
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match value {
            RowValues::JSON(v) => Ok(v),
            RowValues::Text(s) => serde_json::from_str(&s).map_err(|e| e.to_string()),
            RowValues::Null => Ok(JsonValue::Null),
            other => Err(mismatch("json", &other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_row_value(&self) -> RowValues {
        match self {
            Some(v) => v.to_row_value(),
            None => RowValues::Null,
        }
    }

    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(None),
            other => T::from_row_value(other).map(Some),
        }
    }

    fn from_generated_key(id: i64) -> Result<Self, String> {
        T::from_generated_key(id).map(Some)
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}
