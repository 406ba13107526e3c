/*!
 * Memory Allocator Tests
 * Capacity accounting across commit, release, and restore
 */

use mind_kernel::memory::{
    AllocationPriority, AllocationStrategy, MemoryAllocator, MemoryError, MemoryPressure,
    SegmentRequest,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn request(pid: u32, size: u64) -> SegmentRequest {
    SegmentRequest {
        process_id: pid,
        size,
        strategy: AllocationStrategy::Focused,
        priority: AllocationPriority::Normal,
        duration: 0,
    }
}

proptest! {
    #[test]
    fn capacity_stays_consistent(
        ops in prop::collection::vec((any::<bool>(), 1u64..900), 1..50)
    ) {
        let allocator = MemoryAllocator::new(4096, 256);
        let mut live = Vec::new();

        for (commit, size) in ops {
            if commit || live.is_empty() {
                if let Ok(segment) = allocator.commit(request(1, size)) {
                    live.push(segment.id);
                }
            } else {
                let id = live.remove(size as usize % live.len());
                allocator.release(id).unwrap();
            }

            let capacity = allocator.capacity();
            prop_assert!(capacity.is_consistent());
            prop_assert_eq!(capacity.allocated, allocator.segment_sizes().iter().sum::<u64>());
            prop_assert!((0.0..=1.0).contains(&allocator.fragmentation_level()));
        }
    }
}

#[test]
fn test_clones_share_state() {
    let allocator = MemoryAllocator::new(4096, 256);
    let view = allocator.clone();

    allocator.commit(request(1, 512)).unwrap();
    assert_eq!(view.capacity().allocated, 512);
    assert_eq!(view.segments().len(), 1);
}

#[test]
fn test_segments_attributed_to_process() {
    let allocator = MemoryAllocator::new(4096, 256);
    allocator.commit(request(1, 128)).unwrap();
    allocator.commit(request(2, 256)).unwrap();
    allocator.commit(request(1, 64)).unwrap();

    let sizes: Vec<u64> = allocator
        .process_segments(1)
        .iter()
        .map(|s| s.size)
        .collect();
    assert_eq!(sizes, vec![128, 64]);
    assert!(allocator.process_segments(3).is_empty());
}

#[test]
fn test_stats_track_pressure() {
    let allocator = MemoryAllocator::new(1000, 0);
    assert_eq!(allocator.stats().pressure, MemoryPressure::Normal);

    allocator.commit(request(1, 850)).unwrap();
    let stats = allocator.stats();
    assert_eq!(stats.pressure, MemoryPressure::High);
    assert_eq!(stats.segment_count, 1);

    allocator.commit(request(1, 100)).unwrap();
    assert_eq!(allocator.stats().pressure, MemoryPressure::Critical);
}

#[test]
fn test_restore_discards_later_segments() {
    let allocator = MemoryAllocator::new(4096, 256);
    let kept = allocator.commit(request(1, 256)).unwrap();
    let snapshot = allocator.snapshot();

    let dropped = allocator.commit(request(2, 512)).unwrap();
    allocator.release(kept.id).unwrap();
    allocator.restore(&snapshot);

    assert!(allocator.segment(kept.id).is_some());
    assert!(allocator.segment(dropped.id).is_none());
    assert_eq!(allocator.capacity().allocated, 256);
    assert!(allocator.capacity().is_consistent());
}

#[test]
fn test_out_of_memory_leaves_state_untouched() {
    let allocator = MemoryAllocator::new(512, 0);
    allocator.commit(request(1, 500)).unwrap();
    let before = allocator.snapshot();

    let err = allocator.commit(request(1, 13)).unwrap_err();
    assert_eq!(
        err,
        MemoryError::OutOfMemory {
            requested: 13,
            available: 12
        }
    );
    assert_eq!(allocator.snapshot(), before);
}
