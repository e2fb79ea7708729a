//! `DuckDB` connection handling for the local store.
//!
//! One database instance is opened per file; additional connections are
//! cloned from it so every handle in the process shares the same instance.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

struct PoolInner {
    db_path: PathBuf,
    max_idle: usize,
    primary: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// Cloneable handle over a single `DuckDB` database instance.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open (or create) the database file and prepare the pool.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_idle: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let primary = Connection::open(db_path.as_path())?;
        configure_connection(&primary)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_idle: max_idle.max(1),
                primary: Mutex::new(primary),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Check out a connection; it goes back to the idle list on drop.
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned from the instance.
    pub fn acquire(&self) -> Result<PooledConnection, ::duckdb::Error> {
        let reused = self
            .inner
            .idle
            .lock()
            .expect("duckdb idle list mutex poisoned")
            .pop();

        let connection = match reused {
            Some(connection) => connection,
            None => {
                let primary = self
                    .inner
                    .primary
                    .lock()
                    .expect("duckdb primary connection mutex poisoned");
                let connection = primary.try_clone()?;
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    /// Number of connections currently parked in the idle list.
    #[must_use]
    pub fn idle_len(&self) -> usize {
        self.inner
            .idle
            .lock()
            .expect("duckdb idle list mutex poisoned")
            .len()
    }
}

/// Connection checked out of a [`ConnectionPool`].
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut idle = self
            .pool
            .idle
            .lock()
            .expect("duckdb idle list mutex poisoned");
        if idle.len() < self.pool.max_idle {
            idle.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn returned_connections_are_parked_up_to_the_idle_limit() {
        let temp = tempdir().expect("tempdir");
        let pool = ConnectionPool::open(temp.path().join("pool.duckdb"), 1).expect("open");

        let first = pool.acquire().expect("first");
        let second = pool.acquire().expect("second");
        drop(first);
        drop(second);

        assert_eq!(pool.idle_len(), 1);
    }
}
