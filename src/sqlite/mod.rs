// SQLite backend
//
// - config: connection options and builder
// - params: conversion between RowValues and rusqlite values
// - query: statement execution and result extraction
// - prepared: statement handles stored in the per-connection cache
// - connection: SqliteDb, a connection that owns its statement cache

pub mod config;
pub mod connection;
pub mod params;
pub mod prepared;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteDb;
pub use params::Params;
pub use prepared::SqlitePreparedStatement;
pub use query::build_result_set;
