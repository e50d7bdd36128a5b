//! Map record types onto SQL tables and run whole-entity CRUD against them.
//!
//! A type registered with a [`TypeRegistry`] gets a [`TableDescriptor`]: one
//! column per field, optional primary keys, and four ready-made statements
//! (get, insert, update, delete). The [`crud`] functions bind a record's
//! field values to those statements and run them on any [`SqlConnection`].
//!
//! ```rust
//! use sql_tablemap::{RowValues, SqliteDb, TypeRegistry, crud, record};
//!
//! record! {
//!     #[derive(Debug, Default, Clone, PartialEq)]
//!     pub struct Friend {
//!         pub id: i64,
//!         pub name: String,
//!     }
//! }
//!
//! # fn main() -> Result<(), sql_tablemap::TableMapError> {
//! let registry = TypeRegistry::new();
//! let table = registry.register::<Friend>(None);
//! table.set_keys(true, &["id"])?;
//!
//! let db = SqliteDb::open_in_memory()?;
//! db.execute_batch("CREATE TABLE Friend (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);")?;
//!
//! let mut friends = [Friend { id: 0, name: "Ann".into() }];
//! crud::insert(&registry, &db, &mut friends)?;
//!
//! let mut loaded = Friend::default();
//! crud::get(&registry, &db, &mut loaded, &[RowValues::Int(friends[0].id)])?;
//! assert_eq!(loaded, friends[0]);
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod conn;
pub mod crud;
pub mod dialect;
pub mod error;
pub mod plan;
#[cfg(feature = "pool")]
pub mod pool;
pub mod prelude;
pub mod record;
pub mod registry;
pub mod results;
pub mod sqlite;
pub mod stmt_cache;
pub mod table;
pub mod types;

pub use column::ColumnDescriptor;
pub use conn::{ExecResult, SqlConnection};
pub use crud::{SelectDest, delete, get, insert, put, scalar, select_into, update};
pub use error::TableMapError;
pub use plan::{AutoIncrement, BindInstance, BindPlan, PlanKind};
pub use record::{FieldError, FieldInfo, Record, RecordRef, TRANSIENT};
pub use registry::{NameMapper, TypeRegistry, camel_to_snake, identity_mapper, snake_to_camel};
pub use results::{CustomDbRow, ResultSet};
pub use sqlite::{SqliteDb, SqliteOptions, SqliteOptionsBuilder, SqlitePreparedStatement};
pub use stmt_cache::{Prepare, StatementCache};
pub use table::TableDescriptor;
pub use types::{FieldValue, RowValues};

#[cfg(feature = "pool")]
pub use pool::{ConfigAndPool, PooledDb, SqliteManager};
