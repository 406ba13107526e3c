/*!
 * Memory Types
 * Common types for memory management
 */

use crate::core::types::{Megabytes, Pid, SegmentId, Timestamp};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum MemoryError {
    #[error("Allocation of {size}MB is below minimum block size of {minimum}MB")]
    #[diagnostic(code(memory::below_minimum))]
    BelowMinimum { size: Megabytes, minimum: Megabytes },

    #[error("Allocation of {size}MB exceeds maximum allowed {maximum:.0}MB")]
    #[diagnostic(
        code(memory::exceeds_maximum),
        help("A single allocation may take at most the configured share of total memory.")
    )]
    ExceedsMaximum { size: Megabytes, maximum: f64 },

    #[error("Allocation of {size}MB would breach the {reserve}MB reserve ({available}MB available)")]
    #[diagnostic(
        code(memory::reserve_breach),
        help("Free memory first or pass force to bypass the reserve check.")
    )]
    ReserveBreach {
        size: Megabytes,
        available: Megabytes,
        reserve: Megabytes,
    },

    #[error("Out of memory: requested {requested}MB, available {available}MB")]
    #[diagnostic(code(memory::out_of_memory))]
    OutOfMemory {
        requested: Megabytes,
        available: Megabytes,
    },

    #[error("Predicted fragmentation {predicted:.1}% exceeds limit {limit:.1}%")]
    #[diagnostic(code(memory::fragmentation))]
    FragmentationLimit { predicted: f64, limit: f64 },

    #[error("Segment {0} not found")]
    #[diagnostic(code(memory::segment_not_found))]
    SegmentNotFound(SegmentId),

    #[error("Unknown allocation strategy: {0}")]
    #[diagnostic(
        code(memory::unknown_strategy),
        help("Use focused, distributed, dynamic, or emergency.")
    )]
    UnknownStrategy(String),
}

/// Memory capacity counters
///
/// `allocated + available == total` always holds; `reserved` is a soft
/// floor reported alongside and never subtracted from the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCapacity {
    pub total: Megabytes,
    pub allocated: Megabytes,
    pub available: Megabytes,
    pub reserved: Megabytes,
}

impl MemoryCapacity {
    pub const fn new(total: Megabytes, reserved: Megabytes) -> Self {
        Self {
            total,
            allocated: 0,
            available: total,
            reserved,
        }
    }

    /// Free share of total memory as a percentage
    pub fn free_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.available as f64 / self.total as f64 * 100.0
    }

    /// Check the accounting invariant
    #[inline]
    pub const fn is_consistent(&self) -> bool {
        self.allocated + self.available == self.total
    }
}

/// Memory allocation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// All memory to the target process
    Focused,
    /// Part of the block shared with related processes
    Distributed,
    /// Efficiency adapts to the process profile
    Dynamic,
    /// Reclaims memory from weak donors
    Emergency,
}

impl AllocationStrategy {
    pub const ALL: [AllocationStrategy; 4] = [
        AllocationStrategy::Focused,
        AllocationStrategy::Distributed,
        AllocationStrategy::Dynamic,
        AllocationStrategy::Emergency,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::Focused => "focused",
            AllocationStrategy::Distributed => "distributed",
            AllocationStrategy::Dynamic => "dynamic",
            AllocationStrategy::Emergency => "emergency",
        }
    }

    /// Fragmentation bias added on top of the simulated score
    pub const fn fragmentation_bias(&self) -> f64 {
        match self {
            AllocationStrategy::Focused => -2.0,
            AllocationStrategy::Distributed => 3.0,
            AllocationStrategy::Dynamic => 1.0,
            AllocationStrategy::Emergency => 5.0,
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStrategy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focused" => Ok(AllocationStrategy::Focused),
            "distributed" => Ok(AllocationStrategy::Distributed),
            "dynamic" => Ok(AllocationStrategy::Dynamic),
            "emergency" => Ok(AllocationStrategy::Emergency),
            other => Err(MemoryError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Allocation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for AllocationPriority {
    fn default() -> Self {
        AllocationPriority::Normal
    }
}

/// A single memory allocation record attributed to one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySegment {
    pub id: SegmentId,
    pub process_id: Pid,
    pub size: Megabytes,
    /// Synthetic hex address, opaque to callers
    pub address: String,
    pub strategy: AllocationStrategy,
    pub timestamp: Timestamp,
    pub priority: AllocationPriority,
    /// Milliseconds the allocation is meant to last; 0 means permanent
    pub duration: u64,
}

impl MemorySegment {
    #[inline]
    pub const fn is_permanent(&self) -> bool {
        self.duration == 0
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPressure {
    Normal,
    High,
    Critical,
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryPressure::Normal => write!(f, "NORMAL"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Memory statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub capacity: MemoryCapacity,
    pub segment_count: usize,
    /// Fragmentation as a `[0, 1]` level
    pub fragmentation_level: f64,
    pub pressure: MemoryPressure,
}
