//! Pool lifecycle, bounding and cancellation tests against the mock driver

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aorm::{Error, Executor, Pool, PoolConfig, PoolManager};
use common::{config, Call, MockDriver};

#[tokio::test]
async fn test_connect_opens_min_size_connections() {
    let driver = MockDriver::new();
    let state = driver.state();

    let pool = Pool::connect(driver, config().min_size(3)).await.unwrap();

    assert_eq!(state.connects(), 3);
    let status = pool.status();
    assert_eq!(status.size, 3);
    assert_eq!(status.idle, 3);
    assert_eq!(status.in_use, 0);
    assert_eq!(status.min_size, 3);
    assert_eq!(status.max_size, 10);
}

#[tokio::test]
async fn test_shutdown_closes_every_connection() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config().min_size(3)).await.unwrap();

    pool.shutdown().await.unwrap();

    assert_eq!(state.open(), 0);
    assert_eq!(state.count(&Call::Close), 3);
    assert_eq!(pool.status().size, 0);
    assert!(pool.is_closed());
}

#[tokio::test]
async fn test_connect_rejects_missing_parameters() {
    let driver = MockDriver::new();
    let state = driver.state();

    let err = Pool::connect(driver, PoolConfig::default()).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(state.connects(), 0);
}

#[tokio::test]
async fn test_failed_warm_up_closes_opened_connections() {
    let driver = MockDriver::new();
    let state = driver.state();
    state.fail_connect(true);

    let err = Pool::connect(driver, config().min_size(2)).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert_eq!(state.open(), 0);
}

#[tokio::test]
async fn test_released_connection_is_reused() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config()).await.unwrap();

    let conn = pool.checkout().await.unwrap();
    assert_eq!(pool.status().in_use, 1);
    assert_eq!(pool.status().idle, 0);
    drop(conn);

    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.idle, 1);

    let _conn = pool.checkout().await.unwrap();
    assert_eq!(state.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_checkout_waits_for_a_free_slot() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config().min_size(0).max_size(2))
        .await
        .unwrap();

    let first = pool.checkout().await.unwrap();
    let _second = pool.checkout().await.unwrap();

    let waiter = tokio::spawn({
        let pool = pool.clone();
        async move { pool.checkout().await.map(drop) }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiter.is_finished());
    assert_eq!(pool.status().in_use, 2);

    drop(first);
    waiter.await.unwrap().unwrap();
    assert_eq!(state.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_checkout_times_out_when_exhausted() {
    let pool = Pool::connect(
        MockDriver::new(),
        config()
            .max_size(1)
            .acquire_timeout(Duration::from_millis(250)),
    )
    .await
    .unwrap();

    let _held = pool.checkout().await.unwrap();
    let err = pool.checkout().await.unwrap_err();

    assert!(matches!(err, Error::PoolExhausted { max_size: 1, .. }));
    assert_eq!(pool.status().in_use, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_leases_never_exceed_max_size() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config().min_size(0).max_size(3))
        .await
        .unwrap();

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks = (0..20).map(|_| {
        let pool = pool.clone();
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        tokio::spawn(async move {
            let conn = pool.checkout().await.unwrap();
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            drop(conn);
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(state.connects() <= 3);
    assert_eq!(pool.status().in_use, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_wait_leaves_accounting_untouched() {
    let pool = Pool::connect(MockDriver::new(), config().max_size(1))
        .await
        .unwrap();
    let held = pool.checkout().await.unwrap();

    let cancelled = tokio::time::timeout(Duration::from_millis(50), pool.checkout()).await;
    assert!(cancelled.is_err());
    assert_eq!(pool.status().in_use, 1);

    drop(held);
    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.idle, 1);
    assert_eq!(status.size, 1);

    let _again = pool.checkout().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_connect_leaves_no_connection() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config().min_size(0)).await.unwrap();
    state.set_connect_delay(Some(Duration::from_secs(5)));

    let cancelled = tokio::time::timeout(Duration::from_millis(50), pool.checkout()).await;
    assert!(cancelled.is_err());

    let status = pool.status();
    assert_eq!(status.size, 0);
    assert_eq!(status.in_use, 0);
    assert_eq!(state.open(), 0);

    state.set_connect_delay(None);
    let _conn = pool.checkout().await.unwrap();
    assert_eq!(pool.status().size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_statement_discards_its_connection() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config()).await.unwrap();
    state.set_io_delay(Some(Duration::from_secs(5)));

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        pool.execute("update `users` set `admin`=1", vec![], true),
    )
    .await;
    assert!(cancelled.is_err());

    // The interrupted connection is closed instead of being reused
    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.idle, 0);
    assert_eq!(status.size, 0);
    assert_eq!(state.open(), 0);

    state.set_io_delay(None);
    assert_eq!(
        pool.execute("update `users` set `admin`=1", vec![], true)
            .await
            .unwrap(),
        1
    );
    assert_eq!(state.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_outstanding_leases() {
    let driver = MockDriver::new();
    let state = driver.state();
    let pool = Pool::connect(driver, config().min_size(2)).await.unwrap();
    let lease = pool.checkout().await.unwrap();

    let closing = tokio::spawn({
        let pool = pool.clone();
        async move { pool.shutdown().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!closing.is_finished());

    // New work is refused while the pool drains
    assert!(matches!(pool.checkout().await, Err(Error::NotInitialized)));

    drop(lease);
    closing.await.unwrap().unwrap();

    assert_eq!(state.open(), 0);
    assert_eq!(state.count(&Call::Close), 2);
}

#[tokio::test]
async fn test_pool_unusable_after_shutdown() {
    let pool = Pool::connect(MockDriver::new(), config()).await.unwrap();
    pool.shutdown().await.unwrap();

    assert!(matches!(pool.checkout().await, Err(Error::NotInitialized)));
    assert!(matches!(
        pool.query("select 1", vec![], None).await,
        Err(Error::NotInitialized)
    ));
    assert!(matches!(pool.shutdown().await, Err(Error::NotInitialized)));
}

#[tokio::test]
async fn test_manager_lifecycle() {
    let manager = PoolManager::new();
    assert!(matches!(manager.pool().await, Err(Error::NotInitialized)));
    assert!(matches!(manager.shutdown().await, Err(Error::NotInitialized)));

    let driver = MockDriver::new();
    let state = driver.state();
    let pool = manager.initialize(driver.clone(), config()).await.unwrap();
    assert_eq!(pool.status().size, 1);
    assert!(manager.pool().await.is_ok());

    let err = manager.initialize(driver.clone(), config()).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized));
    assert_eq!(state.connects(), 1);

    manager.shutdown().await.unwrap();
    assert_eq!(state.open(), 0);
    assert!(matches!(manager.pool().await, Err(Error::NotInitialized)));
    assert!(matches!(manager.shutdown().await, Err(Error::NotInitialized)));

    // A fresh pool may be started after teardown
    manager.initialize(driver, config()).await.unwrap();
    manager.shutdown().await.unwrap();
    assert_eq!(state.open(), 0);
}

#[tokio::test]
async fn test_manager_rejects_invalid_config() {
    let manager = PoolManager::new();
    let driver = MockDriver::new();
    let state = driver.state();

    let err = manager
        .initialize(driver, PoolConfig::new("www-data", "www-data", "awesome").max_size(0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(state.connects(), 0);
    assert!(matches!(manager.pool().await, Err(Error::NotInitialized)));
}
