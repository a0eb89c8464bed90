//! Connection pool with scoped leases and graceful shutdown

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::placeholder::PlaceholderStyle;
use crate::row::Row;
use crate::traits::{Connection, Driver};
use crate::value::Value;

/// A bounded pool of live connections.
///
/// Cloning is cheap: clones share the same connections, counters and
/// lifecycle. The semaphore holds one permit per connection slot, so at
/// most `max_size` leases exist at any moment; waiters are served in FIFO
/// order.
///
/// # Example
///
/// ```ignore
/// use aorm::{MySqlDriver, Pool, PoolConfig};
///
/// let pool = Pool::connect(MySqlDriver, PoolConfig::new("www-data", "www-data", "awesome")).await?;
/// let mut conn = pool.checkout().await?;
/// conn.execute("delete from `sessions`", &[]).await?;
/// drop(conn); // back to the pool
/// pool.shutdown().await?;
/// ```
pub struct Pool<D: Driver> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Driver> fmt::Debug for Pool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct PoolInner<D: Driver> {
    driver: D,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<D::Conn>>,
    /// Open connections, idle and leased
    size: AtomicUsize,
    /// Leases handed out and not yet dropped
    in_use: AtomicUsize,
    closed: AtomicBool,
}

impl<D: Driver> PoolInner<D> {
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<D::Conn>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn open(&self) -> Result<D::Conn> {
        let conn = self.driver.connect(&self.config).await?;
        let size = self.size.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(size, "opened database connection");
        Ok(conn)
    }
}

/// Point-in-time view of the pool's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections (idle + in use)
    pub size: usize,
    /// Connections waiting in the idle set
    pub idle: usize,
    /// Connections currently leased to callers
    pub in_use: usize,
    pub max_size: usize,
    pub min_size: usize,
}

impl<D: Driver> Pool<D> {
    /// Validate `config`, start the pool and open `min_size` connections.
    pub async fn connect(driver: D, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        info!(
            host = %config.host,
            port = config.port,
            database = config.database.as_deref().unwrap_or_default(),
            min_size = config.min_size,
            max_size = config.max_size,
            "create database connection pool"
        );

        let pool = Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(config.max_size)),
                idle: Mutex::new(VecDeque::with_capacity(config.max_size)),
                size: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                driver,
                config,
            }),
        };

        for _ in 0..pool.inner.config.min_size {
            match pool.inner.open().await {
                Ok(conn) => pool.inner.lock_idle().push_back(conn),
                Err(e) => {
                    // Close whatever was opened before the failure
                    if let Err(cleanup) = pool.shutdown().await {
                        warn!(error = %cleanup, "failed to close pool after warm-up error");
                    }
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    /// Lease a connection.
    ///
    /// Waits while every connection is leased, up to the configured
    /// acquire timeout. The lease returns the connection when dropped.
    pub async fn checkout(&self) -> Result<PooledConnection<D>> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }

        let timeout = inner.config.acquire_timeout_duration();
        let permit = match tokio::time::timeout(timeout, Arc::clone(&inner.permits).acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::NotInitialized),
            Err(_) => {
                warn!(max_size = inner.config.max_size, ?timeout, "connection pool exhausted");
                return Err(Error::PoolExhausted {
                    max_size: inner.config.max_size,
                    timeout,
                });
            }
        };

        // Shutdown may have started while this caller was queued
        if inner.closed.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }

        let reused = inner.lock_idle().pop_back();
        let conn = match reused {
            Some(conn) => conn,
            None => inner.open().await?,
        };

        inner.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(inner),
            in_flight: false,
            discard: false,
            _permit: permit,
        })
    }

    /// Close the pool.
    ///
    /// New checkouts fail immediately with [`Error::NotInitialized`]. The
    /// call then waits until every outstanding lease has been dropped and
    /// closes all idle connections. Calling it a second time fails with
    /// [`Error::NotInitialized`].
    pub async fn shutdown(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::NotInitialized);
        }

        info!(
            in_use = inner.in_use.load(Ordering::SeqCst),
            "closing database connection pool"
        );

        // Holding every permit means no lease is outstanding
        let all = u32::try_from(inner.config.max_size)
            .map_err(|_| Error::Config("max_size exceeds u32::MAX".into()))?;
        let _drained = inner
            .permits
            .acquire_many(all)
            .await
            .map_err(|_| Error::NotInitialized)?;

        let idle: Vec<D::Conn> = inner.lock_idle().drain(..).collect();
        let mut closed = 0usize;
        for conn in idle {
            inner.size.fetch_sub(1, Ordering::SeqCst);
            match conn.close().await {
                Ok(()) => closed += 1,
                Err(e) => warn!(error = %e, "failed to close database connection"),
            }
        }

        // Wake anyone who queued behind the drain
        inner.permits.close();
        info!(closed, "database connection pool closed");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Snapshot of the pool's accounting.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.inner.size.load(Ordering::SeqCst),
            idle: self.inner.lock_idle().len(),
            in_use: self.inner.in_use.load(Ordering::SeqCst),
            max_size: self.inner.config.max_size,
            min_size: self.inner.config.min_size,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Placeholder style statements are rewritten into before dispatch.
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.inner.driver.placeholder_style()
    }
}

/// A connection leased from a [`Pool`].
///
/// Dropping the lease hands the connection back to the idle set, unless it
/// was [discarded](Self::discard) or dropped while a driver call was still
/// in flight (the caller's future was cancelled mid-I/O). In those cases
/// the connection's protocol or transaction state is unknown, so it is
/// closed instead. The pool slot is freed either way.
pub struct PooledConnection<D: Driver> {
    conn: Option<D::Conn>,
    pool: Arc<PoolInner<D>>,
    in_flight: bool,
    discard: bool,
    // Declared last: released only after the connection is back in the idle set
    _permit: OwnedSemaphorePermit,
}

impl<D: Driver> PooledConnection<D> {
    fn conn_mut(&mut self) -> Result<&mut D::Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::Connection("connection already released".to_string()))
    }

    /// Execute a statement in the driver's own placeholder dialect.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.in_flight = true;
        let result = self.conn_mut()?.execute(sql, params).await;
        self.in_flight = false;
        result
    }

    /// Fetch rows in the driver's own placeholder dialect.
    pub async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        self.in_flight = true;
        let result = self.conn_mut()?.fetch(sql, params, limit).await;
        self.in_flight = false;
        result
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.in_flight = true;
        let result = self.conn_mut()?.begin().await;
        self.in_flight = false;
        result
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.in_flight = true;
        let result = self.conn_mut()?.commit().await;
        self.in_flight = false;
        result
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.in_flight = true;
        let result = self.conn_mut()?.rollback().await;
        self.in_flight = false;
        result
    }

    /// Close the connection on release instead of reusing it.
    pub fn discard(&mut self) {
        self.discard = true;
    }
}

impl<D: Driver> fmt::Debug for PooledConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("released", &self.conn.is_none())
            .field("in_flight", &self.in_flight)
            .field("discard", &self.discard)
            .finish()
    }
}

impl<D: Driver> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        let pool = &self.pool;
        pool.in_use.fetch_sub(1, Ordering::SeqCst);

        if let Some(conn) = self.conn.take() {
            if self.discard || self.in_flight {
                let size = pool.size.fetch_sub(1, Ordering::SeqCst) - 1;
                debug!(
                    in_flight = self.in_flight,
                    size, "discarding database connection"
                );
                drop(conn);
            } else {
                pool.lock_idle().push_back(conn);
            }
        }
    }
}

/// Owner of the process's pool lifecycle.
///
/// Construct one at startup and share it (or the [`Pool`] it hands out).
/// A manager holds at most one live pool: initializing twice without a
/// shutdown in between is rejected.
pub struct PoolManager<D: Driver> {
    slot: tokio::sync::Mutex<Option<Pool<D>>>,
}

impl<D: Driver> Default for PoolManager<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> PoolManager<D> {
    pub fn new() -> Self {
        Self {
            slot: tokio::sync::Mutex::new(None),
        }
    }

    /// Start the pool.
    ///
    /// Fails with [`Error::AlreadyInitialized`] while a live pool exists
    /// and with [`Error::Config`] when required parameters are missing.
    pub async fn initialize(&self, driver: D, config: PoolConfig) -> Result<Pool<D>> {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|pool| !pool.is_closed()) {
            return Err(Error::AlreadyInitialized);
        }

        let pool = Pool::connect(driver, config).await?;
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Handle to the live pool.
    pub async fn pool(&self) -> Result<Pool<D>> {
        self.slot
            .lock()
            .await
            .as_ref()
            .filter(|pool| !pool.is_closed())
            .cloned()
            .ok_or(Error::NotInitialized)
    }

    /// Drain and close the live pool.
    pub async fn shutdown(&self) -> Result<()> {
        let pool = self.slot.lock().await.take().ok_or(Error::NotInitialized)?;
        pool.shutdown().await
    }
}
