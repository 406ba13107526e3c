/*!
 * Entity Guard Tests
 */

use mind_kernel::core::{EntityKey, EntityLocks, GuardError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_ok, assert_pending, assert_ready, task};

#[tokio::test]
async fn test_try_acquire_is_all_or_nothing() {
    let locks = EntityLocks::new();
    let held = locks.acquire([EntityKey::Process(3)]).await;

    let err = locks
        .try_acquire([EntityKey::Allocator, EntityKey::Process(3)])
        .unwrap_err();
    assert!(matches!(err, GuardError::ResourceUnavailable(_)));

    // The allocator lock taken before the conflict was released again
    assert!(!locks.is_locked(EntityKey::Allocator));

    drop(held);
    let guard = locks
        .try_acquire([EntityKey::Process(3), EntityKey::Allocator])
        .unwrap();
    assert_eq!(
        guard.keys(),
        &[EntityKey::Allocator, EntityKey::Process(3)]
    );
}

#[test]
fn test_acquire_pends_until_holder_drops() {
    let locks = EntityLocks::new();
    let held = assert_ok!(locks.try_acquire([EntityKey::Allocator, EntityKey::Process(4)]));

    let mut waiter = task::spawn(locks.acquire([EntityKey::Process(4)]));
    assert_pending!(waiter.poll());

    drop(held);
    assert!(waiter.is_woken());
    let guard = assert_ready!(waiter.poll());
    assert!(guard.holds(EntityKey::Process(4)));
    assert!(!locks.is_locked(EntityKey::Allocator));
}

#[tokio::test]
async fn test_disjoint_guards_coexist() {
    let locks = EntityLocks::new();
    let first = locks.acquire([EntityKey::Process(1)]).await;
    let second = locks.acquire([EntityKey::Process(2)]).await;

    assert!(first.holds(EntityKey::Process(1)));
    assert!(second.holds(EntityKey::Process(2)));
    assert!(locks.is_locked(EntityKey::Process(1)));
    assert!(locks.is_locked(EntityKey::Process(2)));
    assert!(!locks.is_locked(EntityKey::Allocator));
}

#[tokio::test]
async fn test_table_grows_lazily_and_is_shared() {
    let locks = EntityLocks::new();
    assert!(locks.is_empty());

    let clone = locks.clone();
    let _guard = clone
        .acquire([EntityKey::Allocator, EntityKey::Process(9)])
        .await;

    assert_eq!(locks.len(), 2);
    assert!(locks.is_locked(EntityKey::Process(9)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reversed_key_orders_do_not_deadlock() {
    let locks = EntityLocks::new();
    let counter = Arc::new(parking_lot::Mutex::new(0u32));

    let mut tasks = Vec::new();
    for i in 0..16u32 {
        let locks = locks.clone();
        let counter = counter.clone();
        tasks.push(tokio::spawn(async move {
            let keys = if i % 2 == 0 {
                vec![EntityKey::Process(1), EntityKey::Process(2), EntityKey::Allocator]
            } else {
                vec![EntityKey::Allocator, EntityKey::Process(2), EntityKey::Process(1)]
            };
            let _guard = locks.acquire(keys).await;
            *counter.lock() += 1;
            tokio::task::yield_now().await;
        }));
    }

    let all = futures::future::join_all(tasks);
    let results = tokio::time::timeout(Duration::from_secs(5), all)
        .await
        .expect("guards acquired in canonical order");
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(*counter.lock(), 16);
}
