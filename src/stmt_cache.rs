use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::TableMapError;

/// Anything that can turn SQL text into a reusable statement handle.
pub trait Prepare {
    type Statement;

    /// Prepare `sql`.
    ///
    /// # Errors
    /// Whatever the underlying connection reports for invalid SQL.
    fn prepare_statement(&self, sql: &str) -> Result<Self::Statement, TableMapError>;
}

/// Prepared statement handles keyed by their SQL text.
///
/// One cache belongs to one connection. Entries are created on first use and
/// live as long as the cache; there is no eviction. A single mutex covers the
/// lookup and the insert on a miss, so concurrent callers asking for the same
/// new text prepare it once.
#[derive(Debug)]
pub struct StatementCache<S> {
    cache: Mutex<HashMap<String, Arc<S>>>,
}

impl<S> Default for StatementCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StatementCache<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `sql`, preparing it with `preparer` on a miss.
    ///
    /// # Errors
    /// The preparer's error; nothing is cached in that case.
    pub fn get<P>(&self, preparer: &P, sql: &str) -> Result<Arc<S>, TableMapError>
    where
        P: Prepare<Statement = S> + ?Sized,
    {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(stmt) = cache.get(sql) {
            return Ok(Arc::clone(stmt));
        }

        tracing::debug!(sql, "preparing statement");
        let stmt = Arc::new(preparer.prepare_statement(sql)?);
        cache.insert(sql.to_string(), Arc::clone(&stmt));
        Ok(stmt)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.cache.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
