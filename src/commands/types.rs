/*!
 * Command Types
 * Outcome records returned by command execution and undo
 */

use crate::core::serde::{is_empty_vec, is_none};
use crate::core::types::{now_millis, CharacterId, Megabytes, Pid, SegmentId, Timestamp};
use crate::memory::MemorySegment;
use crate::optimization::{OptimizationOutcome, StrategyKind, StrategySelection};
use crate::process::ProcessStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AllocateMemory,
    ReleaseMemory,
    OptimizeProcess,
    KillProcess,
    RestartProcess,
}

impl CommandKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandKind::AllocateMemory => "allocate_memory",
            CommandKind::ReleaseMemory => "release_memory",
            CommandKind::OptimizeProcess => "optimize_process",
            CommandKind::KillProcess => "kill_process",
            CommandKind::RestartProcess => "restart_process",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory change applied to one process by an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMemoryDelta {
    pub process_id: Pid,
    pub name: String,
    /// Signed megabytes; donors go negative
    pub delta: f64,
}

/// Allocator-wide effect of an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationImpact {
    /// Percent, `[0, 100]`
    pub fragmentation: f64,
    pub available_memory: Megabytes,
    pub process_deltas: Vec<ProcessMemoryDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub segment: MemorySegment,
    pub requested_size: Megabytes,
    pub block_size: Megabytes,
    pub efficiency: f64,
    pub impact: AllocationImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Present when the strategy was picked by the factory
    #[serde(skip_serializing_if = "is_none", default)]
    pub selection: Option<StrategySelection>,
    pub outcome: OptimizationOutcome,
}

/// Command-specific payload of an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeDetail {
    Allocation(Box<AllocationReport>),
    AllocationUndone {
        segment_id: SegmentId,
        available_memory: Megabytes,
    },
    Release {
        segment: MemorySegment,
        available_memory: Megabytes,
    },
    ReleaseUndone {
        segment_id: SegmentId,
        available_memory: Megabytes,
    },
    Optimization(Box<OptimizationReport>),
    OptimizationUndone {
        process_id: Pid,
        strategy: StrategyKind,
    },
    Kill {
        process_id: Pid,
        name: String,
        forced: bool,
    },
    KillUndone {
        process_id: Pid,
        status: ProcessStatus,
    },
    Restart {
        process_id: Pid,
        restart_count: u32,
    },
    RestartUndone {
        process_id: Pid,
        status: ProcessStatus,
    },
}

/// Structured result of `execute` or `undo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub kind: CommandKind,
    pub character_id: CharacterId,
    pub timestamp: Timestamp,
    pub detail: OutcomeDetail,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub warnings: Vec<String>,
    /// Opaque tags forwarded to narrative collaborators
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub narrative_events: Vec<String>,
}

impl CommandOutcome {
    pub fn new(kind: CommandKind, character_id: CharacterId, detail: OutcomeDetail) -> Self {
        Self {
            success: true,
            kind,
            character_id,
            timestamp: now_millis(),
            detail,
            warnings: Vec::new(),
            narrative_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    #[must_use]
    pub fn with_narrative_events(mut self, events: Vec<String>) -> Self {
        self.narrative_events = events;
        self
    }
}
