use crate::error::TableMapError;

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Connections kept by the pool.
    pub pool_size: u32,
    /// Switch the database to WAL journaling on open.
    pub wal: bool,
    /// Initial capacity of rusqlite's compiled-statement store per connection.
    /// It grows as more distinct statements are cached.
    pub statement_cache_capacity: usize,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pool_size: 4,
            wal: true,
            statement_cache_capacity: 256,
        }
    }

    /// In-memory database. WAL does not apply.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            wal: false,
            ..Self::new(":memory:".to_string())
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TableMapError> {
        if self.db_path.is_empty() {
            return Err(TableMapError::ConfigError("db_path must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(TableMapError::ConfigError("pool_size must be at least 1".into()));
        }
        if self.statement_cache_capacity == 0 {
            return Err(TableMapError::ConfigError(
                "statement_cache_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}
