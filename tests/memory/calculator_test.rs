/*!
 * Memory Calculator Tests
 * Sizing laws, validation boundaries, and fragmentation bounds
 */

use mind_kernel::memory::calculator::*;
use mind_kernel::memory::{AllocationStrategy, MemoryCapacity, MemoryError, MemoryPressure};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const TOTAL: u64 = 4096;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn frag(sizes: &[u64]) -> f64 {
    calculate_fragmentation(sizes, &FragmentationOptions { total_memory: TOTAL })
}

proptest! {
    #[test]
    fn block_size_is_idempotent(requested in 0u64..20_000) {
        let opts = BlockSizeOptions::default();
        let once = find_optimal_block_size(requested, 64, &opts);
        prop_assert_eq!(find_optimal_block_size(once, 64, &opts), once);
    }

    #[test]
    fn block_size_stays_in_bounds(requested in 0u64..20_000) {
        let opts = BlockSizeOptions::default();
        let block = find_optimal_block_size(requested, 64, &opts);
        prop_assert!(block >= opts.min_size && block <= opts.max_size);
    }

    #[test]
    fn fragmentation_is_bounded(sizes in prop::collection::vec(1u64..5_000, 1..40)) {
        let score = frag(&sizes);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn prediction_is_bounded(
        sizes in prop::collection::vec(1u64..5_000, 0..40),
        candidate in 1u64..5_000,
    ) {
        for strategy in AllocationStrategy::ALL {
            let predicted = predict_fragmentation(
                candidate,
                strategy,
                &AllocatorView { segment_sizes: &sizes, total_memory: TOTAL },
            );
            prop_assert!((0.0..=100.0).contains(&predicted));
        }
    }
}

#[test]
fn test_minimum_boundary() {
    let opts = ValidationOptions::new(TOTAL);
    assert!(validate_allocation(64, TOTAL, &opts).is_ok());

    let err = validate_allocation(63, TOTAL, &opts).unwrap_err();
    assert!(err.to_string().contains("below minimum"));
}

#[test]
fn test_maximum_boundary() {
    let opts = ValidationOptions::new(TOTAL);
    // 4096 * 0.4 = 1638.4
    assert!(validate_allocation(1638, TOTAL, &opts).is_ok());

    let err = validate_allocation(1639, TOTAL, &opts).unwrap_err();
    assert!(matches!(err, MemoryError::ExceedsMaximum { .. }));
    assert!(err.to_string().contains("exceeds maximum allowed"));
}

#[test]
fn test_reserve_floor() {
    let opts = ValidationOptions::new(TOTAL);
    assert!(validate_allocation(256, 512, &opts).is_ok());
    assert!(matches!(
        validate_allocation(257, 512, &opts),
        Err(MemoryError::ReserveBreach { .. })
    ));
}

#[test]
fn test_fragmentation_signals() {
    // Two large segments: gaps 5, count 2
    assert!(close(frag(&[1024, 512]), 7.0));
    // Small blocks add their share of 30
    assert!(close(frag(&[64, 64]), 37.0));
    assert!(close(frag(&[64, 512]), 15.0 + 5.0 + 2.0));
}

#[test]
fn test_prediction_applies_strategy_bias() {
    let sizes = [1024];
    let view = AllocatorView {
        segment_sizes: &sizes,
        total_memory: TOTAL,
    };
    let focused = predict_fragmentation(512, AllocationStrategy::Focused, &view);
    let emergency = predict_fragmentation(512, AllocationStrategy::Emergency, &view);
    assert!(close(focused, 5.0));
    assert!(close(emergency - focused, 7.0));

    // Bias never pushes below zero
    let empty = AllocatorView {
        segment_sizes: &[],
        total_memory: TOTAL,
    };
    assert_eq!(predict_fragmentation(512, AllocationStrategy::Focused, &empty), 0.0);
}

#[test]
fn test_pressure_levels() {
    let mut capacity = MemoryCapacity::new(1000, 100);
    assert_eq!(memory_pressure(&capacity), MemoryPressure::Normal);

    capacity.allocated = 850;
    capacity.available = 150;
    assert_eq!(memory_pressure(&capacity), MemoryPressure::High);

    capacity.allocated = 950;
    capacity.available = 50;
    assert_eq!(memory_pressure(&capacity), MemoryPressure::Critical);
}

#[test]
fn test_corruption_risk_components() {
    assert_eq!(corruption_risk(0.0, MemoryPressure::Normal, 0), 0.0);
    assert_eq!(corruption_risk(40.0, MemoryPressure::High, 2), 45.0);
    assert_eq!(corruption_risk(100.0, MemoryPressure::Critical, 10), 100.0);
}
