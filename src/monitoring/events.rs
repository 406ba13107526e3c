/*!
 * Event System
 * Strongly-typed kernel events for narrative and UI collaborators
 */

use crate::core::types::{now_millis, CharacterId, Megabytes, Pid, SegmentId, Timestamp};
use crate::memory::{AllocationStrategy, MemoryPressure};
use crate::optimization::StrategyKind;
use serde::{Deserialize, Serialize};

/// Event severity for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Critical = 3,
}

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Memory,
    Process,
    Optimization,
}

/// Every event the kernel emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KernelEvent {
    MemoryAllocated {
        character_id: CharacterId,
        process_id: Pid,
        segment_id: SegmentId,
        size: Megabytes,
        strategy: AllocationStrategy,
        fragmentation: f64,
        available: Megabytes,
    },
    MemoryPressure {
        character_id: CharacterId,
        level: MemoryPressure,
        free_percent: f64,
    },
    AttentionShifted {
        character_id: CharacterId,
        process_id: Pid,
        size: Megabytes,
        share_percent: f64,
    },
    MemoryAllocationUndone {
        character_id: CharacterId,
        process_id: Pid,
        segment_id: SegmentId,
        size: Megabytes,
    },
    MemoryReleased {
        character_id: CharacterId,
        process_id: Pid,
        segment_id: SegmentId,
        size: Megabytes,
    },
    MemoryReleaseUndone {
        character_id: CharacterId,
        process_id: Pid,
        segment_id: SegmentId,
    },
    ProcessOptimized {
        character_id: CharacterId,
        process_id: Pid,
        strategy: StrategyKind,
        cpu_improvement: f64,
        memory_improvement: f64,
        side_effects: Vec<String>,
    },
    OptimizationUndone {
        character_id: CharacterId,
        process_id: Pid,
        strategy: StrategyKind,
    },
    ProcessKilled {
        character_id: CharacterId,
        process_id: Pid,
        name: String,
        forced: bool,
    },
    ProcessKillUndone {
        character_id: CharacterId,
        process_id: Pid,
    },
    ProcessRestarted {
        character_id: CharacterId,
        process_id: Pid,
        restart_count: u32,
    },
    ProcessRestartUndone {
        character_id: CharacterId,
        process_id: Pid,
    },
}

impl KernelEvent {
    /// Wire name of the event
    pub const fn name(&self) -> &'static str {
        match self {
            KernelEvent::MemoryAllocated { .. } => "memory_allocated",
            KernelEvent::MemoryPressure { .. } => "memory_pressure",
            KernelEvent::AttentionShifted { .. } => "attention_shifted",
            KernelEvent::MemoryAllocationUndone { .. } => "memory_allocation_undone",
            KernelEvent::MemoryReleased { .. } => "memory_released",
            KernelEvent::MemoryReleaseUndone { .. } => "memory_release_undone",
            KernelEvent::ProcessOptimized { .. } => "process_optimized",
            KernelEvent::OptimizationUndone { .. } => "optimization_undone",
            KernelEvent::ProcessKilled { .. } => "process_killed",
            KernelEvent::ProcessKillUndone { .. } => "process_kill_undone",
            KernelEvent::ProcessRestarted { .. } => "process_restarted",
            KernelEvent::ProcessRestartUndone { .. } => "process_restart_undone",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            KernelEvent::MemoryAllocated { .. }
            | KernelEvent::MemoryPressure { .. }
            | KernelEvent::AttentionShifted { .. }
            | KernelEvent::MemoryAllocationUndone { .. }
            | KernelEvent::MemoryReleased { .. }
            | KernelEvent::MemoryReleaseUndone { .. } => Category::Memory,
            KernelEvent::ProcessOptimized { .. } | KernelEvent::OptimizationUndone { .. } => {
                Category::Optimization
            }
            KernelEvent::ProcessKilled { .. }
            | KernelEvent::ProcessKillUndone { .. }
            | KernelEvent::ProcessRestarted { .. }
            | KernelEvent::ProcessRestartUndone { .. } => Category::Process,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            KernelEvent::MemoryPressure {
                level: MemoryPressure::Critical,
                ..
            } => Severity::Critical,
            KernelEvent::MemoryPressure { .. } | KernelEvent::ProcessKilled { .. } => {
                Severity::Warn
            }
            KernelEvent::MemoryAllocationUndone { .. }
            | KernelEvent::MemoryReleaseUndone { .. }
            | KernelEvent::OptimizationUndone { .. }
            | KernelEvent::ProcessKillUndone { .. }
            | KernelEvent::ProcessRestartUndone { .. } => Severity::Debug,
            _ => Severity::Info,
        }
    }

    pub fn character_id(&self) -> &CharacterId {
        match self {
            KernelEvent::MemoryAllocated { character_id, .. }
            | KernelEvent::MemoryPressure { character_id, .. }
            | KernelEvent::AttentionShifted { character_id, .. }
            | KernelEvent::MemoryAllocationUndone { character_id, .. }
            | KernelEvent::MemoryReleased { character_id, .. }
            | KernelEvent::MemoryReleaseUndone { character_id, .. }
            | KernelEvent::ProcessOptimized { character_id, .. }
            | KernelEvent::OptimizationUndone { character_id, .. }
            | KernelEvent::ProcessKilled { character_id, .. }
            | KernelEvent::ProcessKillUndone { character_id, .. }
            | KernelEvent::ProcessRestarted { character_id, .. }
            | KernelEvent::ProcessRestartUndone { character_id, .. } => character_id,
        }
    }
}

/// Event stamped with its emission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: KernelEvent,
}

impl EventRecord {
    pub fn new(event: KernelEvent) -> Self {
        Self {
            timestamp: now_millis(),
            event,
        }
    }
}
