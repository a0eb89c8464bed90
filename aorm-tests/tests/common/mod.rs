//! In-memory driver that records every call the pool makes.
//!
//! Shared by the integration tests. Behavior is steered through
//! [`MockState`]: canned rows, affected-row counts, injected failures and
//! artificial latency.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aorm::{Connection, Driver, Error, PlaceholderStyle, PoolConfig, Result, Row, Value};

/// One driver-level call, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Execute {
        sql: String,
        args: Vec<Value>,
    },
    Fetch {
        sql: String,
        args: Vec<Value>,
        limit: Option<usize>,
    },
    Begin,
    Commit,
    Rollback,
    Close,
}

pub struct MockState {
    calls: Mutex<Vec<Call>>,
    open: AtomicUsize,
    connects: AtomicUsize,
    rows: Mutex<Vec<Row>>,
    affected: AtomicU64,
    execute_error: Mutex<Option<String>>,
    fail_connect: AtomicBool,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    io_delay: Mutex<Option<Duration>>,
    connect_delay: Mutex<Option<Duration>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            open: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
            affected: AtomicU64::new(1),
            execute_error: Mutex::new(None),
            fail_connect: AtomicBool::new(false),
            fail_begin: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_rollback: AtomicBool::new(false),
            io_delay: Mutex::new(None),
            connect_delay: Mutex::new(None),
        }
    }
}

impl MockState {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Every call so far, `Connect` included.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made on connections, without connection setup.
    pub fn statements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Connect))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Connections currently alive (opened and not yet dropped).
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Connections ever opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn set_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        *self.rows.lock().unwrap() = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values).unwrap())
            .collect();
    }

    pub fn set_affected(&self, affected: u64) {
        self.affected.store(affected, Ordering::SeqCst);
    }

    pub fn fail_execute(&self, message: &str) {
        *self.execute_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    pub fn fail_rollback(&self) {
        self.fail_rollback.store(true, Ordering::SeqCst);
    }

    pub fn set_io_delay(&self, delay: Option<Duration>) {
        *self.io_delay.lock().unwrap() = delay;
    }

    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    async fn io_pause(&self) {
        let delay = *self.io_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
    style: PlaceholderStyle,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that expects `%s` markers.
    pub fn percent() -> Self {
        Self {
            style: PlaceholderStyle::Percent,
            ..Self::default()
        }
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl Driver for MockDriver {
    type Conn = MockConnection;

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    async fn connect(&self, _config: &PoolConfig) -> Result<MockConnection> {
        let delay = *self.state.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::Connection("connection refused".to_string()));
        }

        self.state.open.fetch_add(1, Ordering::SeqCst);
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.record(Call::Connect);
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockConnection {
    state: Arc<MockState>,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Connection for MockConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.state.record(Call::Execute {
            sql: sql.to_string(),
            args: params.to_vec(),
        });
        self.state.io_pause().await;

        let error = self.state.execute_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(Error::Statement(message)),
            None => Ok(self.state.affected.load(Ordering::SeqCst)),
        }
    }

    async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        self.state.record(Call::Fetch {
            sql: sql.to_string(),
            args: params.to_vec(),
            limit,
        });
        self.state.io_pause().await;

        // Hands back every canned row; capping is up to the executor
        Ok(self.state.rows.lock().unwrap().clone())
    }

    async fn begin(&mut self) -> Result<()> {
        self.state.record(Call::Begin);
        if self.state.fail_begin.load(Ordering::SeqCst) {
            return Err(Error::Connection("begin failed".to_string()));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.state.record(Call::Commit);
        if self.state.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::Connection("commit failed".to_string()));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.state.record(Call::Rollback);
        if self.state.fail_rollback.load(Ordering::SeqCst) {
            return Err(Error::Connection("rollback failed".to_string()));
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.state.record(Call::Close);
        Ok(())
    }
}

/// The three required parameters, defaults for the rest.
pub fn config() -> PoolConfig {
    PoolConfig::new("www-data", "www-data", "awesome")
}
