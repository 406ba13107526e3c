/*!
 * Memory Allocator
 *
 * Owns the capacity counters and the segment map for one character.
 * Every commit and release recomputes fragmentation from the full segment
 * set. Undo works from whole-state snapshots: `restore` puts back the exact
 * capacity triple and replaces the segment map wholesale instead of
 * removing individual segments.
 */

use super::calculator::{self, FragmentationOptions};
use super::types::{
    AllocationPriority, AllocationStrategy, MemoryCapacity, MemoryError, MemoryResult,
    MemorySegment, MemoryStats,
};
use crate::core::config::KernelConfig;
use crate::core::types::{now_millis, Megabytes, Pid, SegmentId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parameters for a new segment
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub process_id: Pid,
    pub size: Megabytes,
    pub strategy: AllocationStrategy,
    pub priority: AllocationPriority,
    pub duration: u64,
}

/// Value snapshot of allocator state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    pub capacity: MemoryCapacity,
    pub fragmentation_level: f64,
    pub segments: BTreeMap<SegmentId, MemorySegment>,
}

#[derive(Debug)]
struct AllocatorState {
    capacity: MemoryCapacity,
    // Segment ids are monotonic, so key order is insertion order
    segments: BTreeMap<SegmentId, MemorySegment>,
    fragmentation_level: f64,
    next_segment_id: SegmentId,
}

impl AllocatorState {
    fn sizes(&self) -> Vec<Megabytes> {
        self.segments.values().map(|s| s.size).collect()
    }

    fn recompute_fragmentation(&mut self) {
        let score = calculator::calculate_fragmentation(
            &self.sizes(),
            &FragmentationOptions {
                total_memory: self.capacity.total,
            },
        );
        self.fragmentation_level = score / 100.0;
    }
}

/// Memory allocator
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryAllocator {
    state: Arc<Mutex<AllocatorState>>,
}

impl MemoryAllocator {
    pub fn new(total: Megabytes, reserved: Megabytes) -> Self {
        info!(total, reserved, "Memory allocator initialized");
        Self {
            state: Arc::new(Mutex::new(AllocatorState {
                capacity: MemoryCapacity::new(total, reserved),
                segments: BTreeMap::new(),
                fragmentation_level: 0.0,
                next_segment_id: 1,
            })),
        }
    }

    pub fn with_config(config: &KernelConfig) -> Self {
        Self::new(config.total_memory, config.reserved_memory)
    }

    pub fn capacity(&self) -> MemoryCapacity {
        self.state.lock().capacity
    }

    pub fn fragmentation_level(&self) -> f64 {
        self.state.lock().fragmentation_level
    }

    /// Segments in insertion order
    pub fn segments(&self) -> Vec<MemorySegment> {
        self.state.lock().segments.values().cloned().collect()
    }

    pub fn segment_sizes(&self) -> Vec<Megabytes> {
        self.state.lock().sizes()
    }

    pub fn segment(&self, id: SegmentId) -> Option<MemorySegment> {
        self.state.lock().segments.get(&id).cloned()
    }

    pub fn process_segments(&self, pid: Pid) -> Vec<MemorySegment> {
        self.state
            .lock()
            .segments
            .values()
            .filter(|s| s.process_id == pid)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        let state = self.state.lock();
        MemoryStats {
            capacity: state.capacity,
            segment_count: state.segments.len(),
            fragmentation_level: state.fragmentation_level,
            pressure: calculator::memory_pressure(&state.capacity),
        }
    }

    /// Commit a new segment and charge it against capacity
    pub fn commit(&self, request: SegmentRequest) -> MemoryResult<MemorySegment> {
        let mut state = self.state.lock();

        if request.size > state.capacity.available {
            warn!(
                pid = request.process_id,
                requested = request.size,
                available = state.capacity.available,
                "Allocation refused: out of memory"
            );
            return Err(MemoryError::OutOfMemory {
                requested: request.size,
                available: state.capacity.available,
            });
        }

        let id = state.next_segment_id;
        state.next_segment_id += 1;

        let timestamp = now_millis();
        let segment = MemorySegment {
            id,
            process_id: request.process_id,
            size: request.size,
            address: synthetic_address(timestamp),
            strategy: request.strategy,
            timestamp,
            priority: request.priority,
            duration: request.duration,
        };

        state.capacity.allocated += request.size;
        state.capacity.available -= request.size;
        state.segments.insert(id, segment.clone());
        state.recompute_fragmentation();

        debug!(
            segment = id,
            pid = request.process_id,
            size = request.size,
            address = %segment.address,
            fragmentation = state.fragmentation_level,
            "Committed memory segment"
        );

        Ok(segment)
    }

    /// Free a segment and return its size to the pool
    pub fn release(&self, id: SegmentId) -> MemoryResult<MemorySegment> {
        let mut state = self.state.lock();
        let segment = state
            .segments
            .remove(&id)
            .ok_or(MemoryError::SegmentNotFound(id))?;

        state.capacity.allocated = state.capacity.allocated.saturating_sub(segment.size);
        state.capacity.available = state.capacity.total - state.capacity.allocated;
        state.recompute_fragmentation();

        debug!(segment = id, size = segment.size, "Released memory segment");
        Ok(segment)
    }

    pub fn snapshot(&self) -> AllocatorSnapshot {
        let state = self.state.lock();
        AllocatorSnapshot {
            capacity: state.capacity,
            fragmentation_level: state.fragmentation_level,
            segments: state.segments.clone(),
        }
    }

    /// Put back a snapshot exactly
    ///
    /// The segment counter is left alone so ids stay unique across undo.
    pub fn restore(&self, snapshot: &AllocatorSnapshot) {
        let mut state = self.state.lock();
        state.capacity.allocated = snapshot.capacity.allocated;
        state.capacity.available = snapshot.capacity.available;
        state.fragmentation_level = snapshot.fragmentation_level;
        state.segments = snapshot.segments.clone();

        debug!(
            allocated = state.capacity.allocated,
            segments = state.segments.len(),
            "Restored allocator snapshot"
        );
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::with_config(&KernelConfig::default())
    }
}

/// Opaque address: millisecond clock plus a random suffix
fn synthetic_address(timestamp: u64) -> String {
    let suffix = (uuid::Uuid::new_v4().as_u128() & 0xffff) as u16;
    format!("0x{:x}{:04x}", timestamp, suffix)
}
