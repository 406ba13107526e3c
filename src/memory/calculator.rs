/*!
 * Memory Calculator
 *
 * Pure sizing and scoring functions used by the allocator and by the
 * allocation command. Nothing here holds state; every function is a plain
 * mapping from inputs to a number or a validation verdict.
 *
 * ## Fragmentation model
 *
 * Fragmentation is a `[0, 100]` score built from three signals:
 * - share of small (<128MB) segments, weighted by 30
 * - estimated inter-segment gaps relative to allocated memory, capped at 40
 * - segment count pressure, capped at 30
 */

use super::types::{AllocationStrategy, MemoryCapacity, MemoryError, MemoryPressure, MemoryResult};
use crate::core::limits::*;
use crate::core::types::Megabytes;
use crate::process::{IssueKind, Process};

/// Bounds for block size rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizeOptions {
    pub min_size: Megabytes,
    pub max_size: Megabytes,
}

impl Default for BlockSizeOptions {
    fn default() -> Self {
        Self {
            min_size: MIN_BLOCK_SIZE,
            max_size: MAX_BLOCK_SIZE,
        }
    }
}

/// Limits applied by `validate_allocation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationOptions {
    pub min_reserve: Megabytes,
    pub max_allocation_percent: f64,
    pub total_memory: Megabytes,
}

impl ValidationOptions {
    pub fn new(total_memory: Megabytes) -> Self {
        Self {
            min_reserve: DEFAULT_MIN_RESERVE,
            max_allocation_percent: MAX_ALLOCATION_PERCENT,
            total_memory,
        }
    }
}

/// Context for fragmentation scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentationOptions {
    pub total_memory: Megabytes,
}

/// Allocator state as seen by `predict_fragmentation`
#[derive(Debug, Clone, Copy)]
pub struct AllocatorView<'a> {
    pub segment_sizes: &'a [Megabytes],
    pub total_memory: Megabytes,
}

#[inline]
fn round_up(value: Megabytes, boundary: Megabytes) -> Megabytes {
    if boundary <= 1 {
        return value;
    }
    value.div_ceil(boundary) * boundary
}

/// Round a requested size to the block size the allocator would hand out
pub fn find_optimal_block_size(
    requested: Megabytes,
    alignment: Megabytes,
    opts: &BlockSizeOptions,
) -> Megabytes {
    let clamped = requested.clamp(opts.min_size, opts.max_size);
    let aligned = round_up(clamped, alignment);

    let tiered = if aligned < 256 {
        round_up(aligned, 128)
    } else if aligned < 1024 {
        round_up(aligned, 256)
    } else {
        round_up(aligned, 512)
    };

    tiered.min(opts.max_size)
}

/// Validate an allocation against size bounds and the reserve floor
pub fn validate_allocation(
    size: Megabytes,
    available: Megabytes,
    opts: &ValidationOptions,
) -> MemoryResult<()> {
    if size < MIN_BLOCK_SIZE {
        return Err(MemoryError::BelowMinimum {
            size,
            minimum: MIN_BLOCK_SIZE,
        });
    }

    let maximum = opts.total_memory as f64 * opts.max_allocation_percent;
    if size as f64 > maximum {
        return Err(MemoryError::ExceedsMaximum { size, maximum });
    }

    let remaining = available as i128 - size as i128;
    if remaining < opts.min_reserve as i128 {
        return Err(MemoryError::ReserveBreach {
            size,
            available,
            reserve: opts.min_reserve,
        });
    }

    Ok(())
}

/// Fragmentation score in `[0, 100]` for a set of segment sizes
pub fn calculate_fragmentation(segment_sizes: &[Megabytes], _opts: &FragmentationOptions) -> f64 {
    if segment_sizes.is_empty() {
        return 0.0;
    }

    let count = segment_sizes.len() as f64;
    let total_allocated: Megabytes = segment_sizes.iter().sum();

    let small = segment_sizes
        .iter()
        .filter(|&&size| size < SMALL_SEGMENT_THRESHOLD)
        .count() as f64;
    let small_block_score = (small / count) * 30.0;

    let gap_score = if total_allocated == 0 {
        0.0
    } else {
        let avg_size = total_allocated as f64 / count;
        let estimated_gaps = (count - 1.0) * avg_size * 0.1;
        (estimated_gaps / total_allocated as f64 * 100.0).min(40.0)
    };

    let count_score = ((count - 1.0) * 2.0).min(30.0);

    (small_block_score + gap_score + count_score).clamp(0.0, 100.0)
}

/// Fragmentation expected after inserting a candidate allocation
pub fn predict_fragmentation(
    new_size: Megabytes,
    strategy: AllocationStrategy,
    state: &AllocatorView<'_>,
) -> f64 {
    let mut simulated = Vec::with_capacity(state.segment_sizes.len() + 1);
    simulated.extend_from_slice(state.segment_sizes);
    simulated.push(new_size);

    let base = calculate_fragmentation(
        &simulated,
        &FragmentationOptions {
            total_memory: state.total_memory,
        },
    );

    (base + strategy.fragmentation_bias()).clamp(0.0, 100.0)
}

/// Classify memory pressure from free share of total memory
pub fn memory_pressure(capacity: &MemoryCapacity) -> MemoryPressure {
    let free = capacity.free_percent();
    if free < CRITICAL_FREE_PERCENT {
        MemoryPressure::Critical
    } else if free < HIGH_FREE_PERCENT {
        MemoryPressure::High
    } else {
        MemoryPressure::Normal
    }
}

/// Heuristic `[0, 100]` score for a process holding memory it no longer needs
///
/// Growth over the restart baseline dominates; long lifetimes and reported
/// leak issues add to it.
pub fn leak_score(process: &Process) -> f64 {
    let baseline = process.baseline().memory.max(1.0);
    let growth = ((process.memory_usage - baseline) / baseline).max(0.0);
    let age = (process.lifetime_ms as f64 / 60_000.0).min(30.0);
    let reported = process
        .current_issues
        .iter()
        .filter(|issue| issue.kind == IssueKind::MemoryLeak)
        .count() as f64
        * 10.0;

    (growth * 40.0 + age + reported).clamp(0.0, 100.0)
}

/// Heuristic `[0, 100]` score for memory corruption risk
pub fn corruption_risk(fragmentation: f64, pressure: MemoryPressure, crash_count: u32) -> f64 {
    let pressure_score = match pressure {
        MemoryPressure::Normal => 0.0,
        MemoryPressure::High => 15.0,
        MemoryPressure::Critical => 30.0,
    };

    (fragmentation * 0.5 + pressure_score + crash_count as f64 * 5.0).clamp(0.0, 100.0)
}
