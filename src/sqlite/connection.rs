use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction};

use crate::conn::{ExecResult, SqlConnection};
use crate::error::TableMapError;
use crate::results::ResultSet;
use crate::stmt_cache::{Prepare, StatementCache};
use crate::types::RowValues;

use super::config::SqliteOptions;
use super::prepared::SqlitePreparedStatement;
use super::query::{build_result_set, execute_statement};

/// A `SQLite` connection together with the statement cache that belongs to it.
///
/// Every statement run through the [`SqlConnection`] impl goes through the
/// cache. Dropping the `SqliteDb` closes the connection and discards the cache.
///
/// Lock order is always statement cache, then connection.
///
/// Compiled statements live in rusqlite's per-connection store, which evicts
/// on overflow. Its capacity is kept at or above the number of cached handles
/// so a cached text is never compiled twice.
pub struct SqliteDb {
    conn: Mutex<Connection>,
    stmt_cache: StatementCache<SqlitePreparedStatement>,
    /// Current capacity of rusqlite's compiled-statement store.
    compiled_capacity: AtomicUsize,
    /// Statements prepared through the cache so far.
    prepared: AtomicUsize,
}

impl SqliteDb {
    /// Open (or create) the database described by `opts`.
    ///
    /// # Errors
    /// Returns a config error for invalid options, or the rusqlite error if
    /// the file cannot be opened or the pragmas fail.
    pub fn open(opts: &SqliteOptions) -> Result<Self, TableMapError> {
        opts.validate()?;
        let conn = Connection::open(&opts.db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        if opts.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        tracing::debug!(path = %opts.db_path, wal = opts.wal, "opened sqlite connection");
        Ok(Self::with_capacity(conn, opts.statement_cache_capacity))
    }

    /// Private in-memory database.
    ///
    /// # Errors
    /// Returns the rusqlite error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, TableMapError> {
        Self::open(&SqliteOptions::in_memory())
    }

    /// Wrap an already open connection.
    ///
    /// The connection's compiled-statement capacity is reset to the default
    /// of [`SqliteOptions`].
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        let capacity = SqliteOptions::in_memory().statement_cache_capacity;
        Self::with_capacity(conn, capacity)
    }

    fn with_capacity(conn: Connection, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        conn.set_prepared_statement_cache_capacity(capacity);
        Self {
            conn: Mutex::new(conn),
            stmt_cache: StatementCache::new(),
            compiled_capacity: AtomicUsize::new(capacity),
            prepared: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Cached handle for `sql`, preparing it on first use.
    ///
    /// # Errors
    /// Returns the rusqlite error if the SQL does not compile.
    pub fn prepare(&self, sql: &str) -> Result<Arc<SqlitePreparedStatement>, TableMapError> {
        self.stmt_cache.get(self, sql)
    }

    /// Number of distinct statements prepared on this connection.
    #[must_use]
    pub fn cached_statements(&self) -> usize {
        self.stmt_cache.len()
    }

    /// How many compiled statements the connection keeps before evicting.
    /// Never below [`cached_statements`](Self::cached_statements).
    #[must_use]
    pub fn compiled_statement_capacity(&self) -> usize {
        self.compiled_capacity.load(Ordering::Acquire)
    }

    /// Execute a prepared statement as DML.
    ///
    /// # Errors
    /// Returns the rusqlite error if binding or execution fails.
    pub fn execute_prepared(
        &self,
        prepared: &SqlitePreparedStatement,
        params: &[RowValues],
    ) -> Result<ExecResult, TableMapError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(prepared.sql())?;
        execute_statement(&conn, prepared.sql(), &mut stmt, params)
    }

    /// Execute a prepared statement as a query.
    ///
    /// # Errors
    /// Returns the rusqlite error if binding or reading rows fails.
    pub fn query_prepared(
        &self,
        prepared: &SqlitePreparedStatement,
        params: &[RowValues],
    ) -> Result<ResultSet, TableMapError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(prepared.sql())?;
        build_result_set(&mut stmt, params)
    }

    /// Run several `;`-separated statements without arguments. Not cached.
    ///
    /// # Errors
    /// Returns the rusqlite error of the first failing statement.
    pub fn execute_batch(&self, sql: &str) -> Result<(), TableMapError> {
        self.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Run `func` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// Use the transaction handle for all work inside `func`; calling back
    /// into this `SqliteDb` from the closure would wait on its own lock.
    ///
    /// # Errors
    /// The closure's error (after rolling back), or the error from BEGIN/COMMIT.
    pub fn with_transaction<F, R>(&self, func: F) -> Result<R, TableMapError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R, TableMapError>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        match func(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run synchronous work against the raw `rusqlite::Connection`.
    ///
    /// # Errors
    /// Whatever `func` returns.
    pub fn with_connection<F, R>(&self, func: F) -> Result<R, TableMapError>
    where
        F: FnOnce(&mut Connection) -> Result<R, TableMapError>,
    {
        func(&mut self.lock())
    }
}

impl fmt::Debug for SqliteDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDb")
            .field("cached_statements", &self.stmt_cache.len())
            .finish_non_exhaustive()
    }
}

impl Prepare for SqliteDb {
    type Statement = SqlitePreparedStatement;

    // Runs under the statement cache lock, once per distinct text.
    fn prepare_statement(&self, sql: &str) -> Result<SqlitePreparedStatement, TableMapError> {
        let conn = self.lock();
        let needed = self.prepared.load(Ordering::Acquire) + 1;
        let capacity = self.compiled_capacity.load(Ordering::Acquire);
        if needed > capacity {
            let grown = needed.max(capacity.saturating_mul(2));
            tracing::debug!(from = capacity, to = grown, "growing compiled statement capacity");
            conn.set_prepared_statement_cache_capacity(grown);
            self.compiled_capacity.store(grown, Ordering::Release);
        }
        let stmt = conn.prepare_cached(sql)?;
        let column_names = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        let prepared = SqlitePreparedStatement::new(sql, column_names, stmt.parameter_count());
        self.prepared.fetch_add(1, Ordering::AcqRel);
        Ok(prepared)
    }
}

impl SqlConnection for SqliteDb {
    fn execute(&self, sql: &str, args: &[RowValues]) -> Result<ExecResult, TableMapError> {
        let prepared = self.prepare(sql)?;
        self.execute_prepared(&prepared, args)
    }

    fn query(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, TableMapError> {
        let prepared = self.prepare(sql)?;
        self.query_prepared(&prepared, args)
    }
}

impl SqlConnection for Connection {
    fn execute(&self, sql: &str, args: &[RowValues]) -> Result<ExecResult, TableMapError> {
        let mut stmt = self.prepare(sql)?;
        execute_statement(self, sql, &mut stmt, args)
    }

    fn query(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, TableMapError> {
        let mut stmt = self.prepare(sql)?;
        build_result_set(&mut stmt, args)
    }
}

impl SqlConnection for Transaction<'_> {
    fn execute(&self, sql: &str, args: &[RowValues]) -> Result<ExecResult, TableMapError> {
        SqlConnection::execute(&**self, sql, args)
    }

    fn query(&self, sql: &str, args: &[RowValues]) -> Result<ResultSet, TableMapError> {
        SqlConnection::query(&**self, sql, args)
    }
}
