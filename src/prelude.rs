//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_tablemap::prelude::*;
//! ```

pub use crate::crud;
pub use crate::record;
pub use crate::{
    CustomDbRow, FieldValue, Record, ResultSet, RowValues, SelectDest, SqlConnection, SqliteDb,
    SqliteOptions, TableDescriptor, TableMapError, TypeRegistry,
};

#[cfg(feature = "pool")]
pub use crate::{ConfigAndPool, PooledDb};
