/*!
 * System Limits and Constants
 *
 * Centralized location for thresholds and magic numbers used by the
 * allocator, the strategies, and the command preconditions.
 * Organized by domain for maintainability and discoverability.
 */

use super::types::Megabytes;

// =============================================================================
// MEMORY LIMITS
// =============================================================================

/// Default simulated memory pool for one character (4GB)
pub const DEFAULT_TOTAL_MEMORY: Megabytes = 4096;

/// Soft reserve kept out of reach of ordinary allocations
pub const DEFAULT_RESERVED_MEMORY: Megabytes = 256;

/// Smallest allocation the allocator accepts
pub const MIN_BLOCK_SIZE: Megabytes = 64;

/// Largest block the size rounding will produce
pub const MAX_BLOCK_SIZE: Megabytes = 4096;

/// Default block alignment
pub const DEFAULT_ALIGNMENT: Megabytes = 64;

/// Free memory that must remain after an allocation
pub const DEFAULT_MIN_RESERVE: Megabytes = 256;

/// A single allocation may take at most this share of total memory
pub const MAX_ALLOCATION_PERCENT: f64 = 0.4;

/// Predicted fragmentation above which allocations are refused
pub const MAX_PREDICTED_FRAGMENTATION: f64 = 60.0;

/// Segments below this size count as "small" for fragmentation
pub const SMALL_SEGMENT_THRESHOLD: Megabytes = 128;

/// Free percentage below which memory pressure is critical
pub const CRITICAL_FREE_PERCENT: f64 = 10.0;

/// Free percentage below which memory pressure is high
pub const HIGH_FREE_PERCENT: f64 = 20.0;

/// Allocations above this share of total memory shift attention
pub const ATTENTION_SHIFT_PERCENT: f64 = 10.0;

// =============================================================================
// PROCESS DEFAULTS
// =============================================================================

/// Baseline CPU restored on restart when a process has no config
pub const DEFAULT_BASELINE_CPU: f64 = 10.0;

/// Baseline memory restored on restart when a process has no config
pub const DEFAULT_BASELINE_MEMORY: f64 = 50.0;

/// Baseline thread count restored on restart when a process has no config
pub const DEFAULT_BASELINE_THREADS: u32 = 1;

/// Exit code recorded for killed processes
pub const KILL_EXIT_CODE: i32 = -9;

/// Processes that must never be reclaimed from or killed without force
pub const CRITICAL_PROCESS_NAMES: &[&str] = &[
    "core_consciousness",
    "self_preservation",
    "identity_core",
    "memory_core",
    "emotional_regulation",
];

// =============================================================================
// OPTIMIZATION
// =============================================================================

/// Hard upper bound on a single CPU throttling step
pub const MAX_CPU_REDUCTION: f64 = 0.5;

/// Default CPU throttling target
pub const DEFAULT_CPU_TARGET_REDUCTION: f64 = 0.3;

/// Default memory consolidation target
pub const DEFAULT_MEMORY_TARGET_REDUCTION: f64 = 0.3;

/// Combined hybrid risk above which execution is refused outside safe mode
pub const MAX_COMBINED_RISK: f64 = 0.7;

/// Threads each unit of CPU headroom supports
pub const CPU_PER_THREAD: f64 = 15.0;

/// Thread bounds for rebalancing
pub const MIN_THREADS: u32 = 1;
pub const MAX_THREADS: u32 = 8;

/// Score the factory falls back to when nothing scores well
pub const FALLBACK_STRATEGY_SCORE: f64 = 10.0;

// =============================================================================
// COMMANDS
// =============================================================================

/// Default number of undoable commands kept by the history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
