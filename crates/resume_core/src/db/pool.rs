//! Bounded connection pool bridging async callers to blocking SQLite work.
//!
//! # Responsibility
//! - Hold a fixed set of bootstrapped connections.
//! - Suspend callers while every connection is checked out.
//! - Run connection work on the blocking thread pool.
//!
//! # Invariants
//! - At most `size` closures hold a connection at any time.
//! - A checked-out connection returns to the pool on every exit path,
//!   including errors and panics inside the closure.
//! - In-memory pools hold exactly one connection.

use super::{open_db_in_memory, open_db_with_timeout, DbError};
use crate::config::CoreConfig;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub type PoolResult<T> = Result<T, PoolError>;

/// Errors raised by pool checkout and worker dispatch.
#[derive(Debug)]
pub enum PoolError {
    /// Opening or bootstrapping a pooled connection failed.
    Db(DbError),
    /// No connection became available within the acquire timeout.
    Timeout(Duration),
    /// The pool semaphore was closed.
    Closed,
    /// A permit was granted but no idle connection was present.
    Exhausted,
    /// The blocking worker panicked or was cancelled.
    Worker(String),
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Timeout(waited) => write!(
                f,
                "timed out after {}ms waiting for a pooled connection",
                waited.as_millis()
            ),
            Self::Closed => write!(f, "connection pool is closed"),
            Self::Exhausted => write!(f, "connection pool has no idle connection"),
            Self::Worker(message) => write!(f, "connection worker failed: {message}"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PoolError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

struct PoolInner {
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        // A poisoned lock still guards a valid Vec; connections are returned
        // from drop guards and must not be lost.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared handle to a bounded set of SQLite connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Opens a pool according to `config`.
    ///
    /// A configured `database_path` yields `pool_size` file connections;
    /// otherwise a single in-memory connection is used.
    pub fn open(config: &CoreConfig) -> PoolResult<Self> {
        let started_at = Instant::now();
        let connections = match config.database_path.as_ref() {
            Some(path) => {
                let mut connections = Vec::with_capacity(config.pool_size);
                for _ in 0..config.pool_size {
                    connections.push(open_db_with_timeout(path, config.busy_timeout)?);
                }
                connections
            }
            None => {
                if config.pool_size > 1 {
                    warn!(
                        "event=pool_open module=db status=degraded reason=memory_single_connection requested_size={}",
                        config.pool_size
                    );
                }
                vec![open_db_in_memory()?]
            }
        };

        let pool = Self::from_connections(connections, config.acquire_timeout);
        info!(
            "event=pool_open module=db status=ok size={} duration_ms={}",
            pool.size(),
            started_at.elapsed().as_millis()
        );
        Ok(pool)
    }

    /// Opens a single-connection in-memory pool with default timeouts.
    pub fn in_memory() -> PoolResult<Self> {
        Self::open(&CoreConfig::default())
    }

    /// Wraps already bootstrapped connections.
    pub fn from_connections(connections: Vec<Connection>, acquire_timeout: Duration) -> Self {
        let size = connections.len();
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections),
                permits: Arc::new(Semaphore::new(size)),
                size,
                acquire_timeout,
            }),
        }
    }

    /// Total number of connections owned by the pool.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of connections currently checked in.
    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// Runs `work` with exclusive use of one pooled connection.
    ///
    /// Suspends while the pool is exhausted, up to the acquire timeout. The
    /// closure runs on Tokio's blocking thread pool; the connection is
    /// checked back in when it returns or unwinds.
    pub async fn run<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<PoolError> + Send + 'static,
    {
        let mut checkout = self.checkout().await?;
        let joined = tokio::task::spawn_blocking(move || work(checkout.connection_mut())).await;

        match joined {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "event=pool_worker module=db status=error error_code=worker_join_failed error={}",
                    err
                );
                Err(PoolError::Worker(err.to_string()).into())
            }
        }
    }

    async fn checkout(&self) -> PoolResult<PooledConnection> {
        let started_at = Instant::now();
        let permits = Arc::clone(&self.inner.permits);
        let permit = match tokio::time::timeout(self.inner.acquire_timeout, permits.acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                warn!(
                    "event=pool_checkout module=db status=timeout waited_ms={}",
                    started_at.elapsed().as_millis()
                );
                return Err(PoolError::Timeout(self.inner.acquire_timeout));
            }
        };

        let conn = self.inner.idle().pop().ok_or(PoolError::Exhausted)?;
        debug!(
            "event=pool_checkout module=db status=ok waited_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

/// Checked-out connection; returns itself to the pool on drop.
struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    // Dropped after `Drop::drop` has pushed the connection back.
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn connection_mut(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection is only taken in drop"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.idle().push(conn);
        }
    }
}
