//! Async pool of [`SqliteDb`] connections on bb8.
//!
//! Each pooled connection keeps its own statement cache for its whole life.
//! Work runs on tokio's blocking threads through [`PooledDb::interact`].

use std::sync::Arc;

use bb8::{ManageConnection, Pool, PooledConnection, RunError};

use crate::conn::SqlConnection;
use crate::error::TableMapError;
use crate::sqlite::{SqliteDb, SqliteOptions, SqliteOptionsBuilder};

/// bb8 manager that opens [`SqliteDb`] connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    opts: SqliteOptions,
}

impl SqliteManager {
    #[must_use]
    pub fn new(opts: SqliteOptions) -> Self {
        Self { opts }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = Arc<SqliteDb>;
    type Error = TableMapError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let opts = self.opts.clone();
        async move {
            let db = run_blocking(move || SqliteDb::open(&opts)).await?;
            Ok(Arc::new(db))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let db = Arc::clone(conn);
        async move {
            run_blocking(move || db.query("SELECT 1", &[]).map(|_| ())).await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

async fn run_blocking<F, R>(func: F) -> Result<R, TableMapError>
where
    F: FnOnce() -> Result<R, TableMapError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(func).await.map_err(|e| {
        TableMapError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
    })?
}

/// Options plus the pool built from them.
#[derive(Clone)]
pub struct ConfigAndPool {
    pub pool: Pool<SqliteManager>,
    pub options: SqliteOptions,
}

impl std::fmt::Debug for ConfigAndPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigAndPool")
            .field("options", &self.options)
            .field("state", &self.pool.state())
            .finish()
    }
}

impl ConfigAndPool {
    /// Build a pool for `opts`.
    ///
    /// With `":memory:"` every pooled connection is its own empty database;
    /// use a file path to share data between connections.
    ///
    /// # Errors
    /// Config errors for invalid options, or the error from opening the first
    /// connection.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, TableMapError> {
        opts.validate()?;
        let pool = Pool::builder()
            .max_size(opts.pool_size)
            .build(SqliteManager::new(opts.clone()))
            .await?;
        tracing::debug!(path = %opts.db_path, size = opts.pool_size, "sqlite pool ready");
        Ok(Self {
            pool,
            options: opts,
        })
    }

    /// Start a fluent builder; finish with [`SqliteOptionsBuilder::build`].
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Check out a connection.
    ///
    /// # Errors
    /// [`TableMapError::ConnectionError`] when the checkout times out, or the
    /// error from opening a new connection.
    pub async fn get_connection(&self) -> Result<PooledDb, TableMapError> {
        let conn = self.pool.get_owned().await.map_err(|e| match e {
            RunError::User(err) => err,
            RunError::TimedOut => {
                TableMapError::ConnectionError("timed out waiting for a sqlite connection".into())
            }
        })?;
        Ok(PooledDb { conn })
    }
}

impl SqliteOptionsBuilder {
    /// Build the pool.
    ///
    /// # Errors
    /// See [`ConfigAndPool::new_sqlite`].
    pub async fn build(self) -> Result<ConfigAndPool, TableMapError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

/// A checked-out connection; returns to the pool on drop.
pub struct PooledDb {
    conn: PooledConnection<'static, SqliteManager>,
}

impl PooledDb {
    /// Run synchronous work against the connection on a blocking thread.
    ///
    /// ```rust,no_run
    /// # async fn demo(pool: sql_tablemap::pool::ConfigAndPool) -> Result<(), sql_tablemap::TableMapError> {
    /// use sql_tablemap::crud;
    ///
    /// let conn = pool.get_connection().await?;
    /// let n = conn
    ///     .interact(|db| crud::scalar(db, "SELECT COUNT(*) FROM friend", &[]))
    ///     .await?;
    /// # let _ = n;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Whatever `func` returns, or a connection error if the blocking task panics.
    pub async fn interact<F, R>(&self, func: F) -> Result<R, TableMapError>
    where
        F: FnOnce(&SqliteDb) -> Result<R, TableMapError> + Send + 'static,
        R: Send + 'static,
    {
        let db = Arc::clone(&*self.conn);
        run_blocking(move || func(&db)).await
    }

    /// Shared handle to the underlying connection.
    #[must_use]
    pub fn db(&self) -> Arc<SqliteDb> {
        Arc::clone(&*self.conn)
    }
}

impl std::fmt::Debug for PooledDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledDb").field(&**self.conn).finish()
    }
}
