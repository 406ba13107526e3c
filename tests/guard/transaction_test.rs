/*!
 * Snapshot Transaction Tests
 */

use mind_kernel::core::{GuardError, SnapshotTransaction, TransactionState};
use mind_kernel::memory::{AllocationPriority, AllocationStrategy, SegmentRequest};
use mind_kernel::MemoryAllocator;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn request(size: u64) -> SegmentRequest {
    SegmentRequest {
        process_id: 1,
        size,
        strategy: AllocationStrategy::Focused,
        priority: AllocationPriority::Normal,
        duration: 0,
    }
}

#[test]
fn test_new_transaction_is_active_and_empty() {
    let tx = SnapshotTransaction::begin("noop");
    assert_eq!(tx.state(), TransactionState::Active);
    assert!(tx.is_empty());
    assert!(tx.commit().is_ok());
}

#[test]
fn test_dropped_transaction_restores_allocator() {
    let allocator = MemoryAllocator::new(4096, 256);
    allocator.commit(request(512)).unwrap();
    let before = allocator.snapshot();

    {
        let mut tx = SnapshotTransaction::begin("allocate_memory");
        let target = allocator.clone();
        let snapshot = before.clone();
        tx.record("allocator", move || target.restore(&snapshot))
            .unwrap();

        allocator.commit(request(256)).unwrap();
        allocator.commit(request(128)).unwrap();
        assert_eq!(allocator.capacity().allocated, 512 + 256 + 128);
    }

    assert_eq!(allocator.snapshot(), before);
    assert_eq!(allocator.capacity().allocated, 512);
}

#[test]
fn test_committed_transaction_keeps_mutations() {
    let allocator = MemoryAllocator::new(4096, 256);
    let mut tx = SnapshotTransaction::begin("allocate_memory");
    let target = allocator.clone();
    let snapshot = allocator.snapshot();
    tx.record("allocator", move || target.restore(&snapshot))
        .unwrap();

    allocator.commit(request(256)).unwrap();
    tx.commit().unwrap();

    assert_eq!(allocator.capacity().allocated, 256);
}

#[test]
fn test_restores_run_newest_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut tx = SnapshotTransaction::begin("kill_process");
    for step in ["allocator", "target", "donor"] {
        let log = log.clone();
        tx.record(step, move || log.lock().push(step)).unwrap();
    }
    assert_eq!(tx.len(), 3);

    tx.rollback().unwrap();
    assert_eq!(*log.lock(), vec!["donor", "target", "allocator"]);
}

#[test]
fn test_invalid_transition_error_names_states() {
    let err = GuardError::InvalidTransition {
        from: format!("{:?}", TransactionState::Committed),
        to: "RolledBack".into(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid state transition: Committed -> RolledBack"
    );
}
