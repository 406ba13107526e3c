/*!
 * Optimization Types
 * Shared vocabulary for strategies, their analyses, and their outcomes
 */

use crate::core::limits::*;
use crate::core::serde::{is_empty_vec, is_none};
use crate::core::types::{now_millis, Pid, RiskLevel, Timestamp};
use crate::process::{Process, ProcessPriority};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Strategy operation result
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Strategy errors
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum StrategyError {
    #[error("{strategy} cannot optimize process {pid}: {reason}")]
    #[diagnostic(code(optimization::not_applicable))]
    NotApplicable {
        strategy: StrategyKind,
        pid: Pid,
        reason: String,
    },

    #[error("Combined risk {risk:.2} exceeds limit {limit:.2}")]
    #[diagnostic(
        code(optimization::risk_too_high),
        help("Enable safe mode to run high-risk hybrid optimizations.")
    )]
    RiskTooHigh { risk: f64, limit: f64 },

    #[error("No process snapshot recorded for {0} revert")]
    #[diagnostic(code(optimization::missing_snapshot))]
    MissingSnapshot(StrategyKind),

    #[error("Snapshot belongs to process {found}, not {expected}")]
    #[diagnostic(code(optimization::snapshot_mismatch))]
    SnapshotMismatch { expected: Pid, found: Pid },

    #[error("Unknown optimization strategy: {0}")]
    #[diagnostic(
        code(optimization::unknown_strategy),
        help("Use cpu_throttling, memory_consolidation, thread_rebalancing, or hybrid.")
    )]
    UnknownStrategy(String),
}

/// Strategy tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    CpuThrottling,
    MemoryConsolidation,
    ThreadRebalancing,
    Hybrid,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::MemoryConsolidation,
        StrategyKind::CpuThrottling,
        StrategyKind::ThreadRebalancing,
        StrategyKind::Hybrid,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CpuThrottling => "cpu_throttling",
            StrategyKind::MemoryConsolidation => "memory_consolidation",
            StrategyKind::ThreadRebalancing => "thread_rebalancing",
            StrategyKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu_throttling" | "cpu" => Ok(StrategyKind::CpuThrottling),
            "memory_consolidation" | "memory" => Ok(StrategyKind::MemoryConsolidation),
            "thread_rebalancing" | "thread" => Ok(StrategyKind::ThreadRebalancing),
            "hybrid" => Ok(StrategyKind::Hybrid),
            other => Err(StrategyError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Environment a strategy runs in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyContext {
    pub safe_mode: bool,
    /// Global flag that disables CPU throttling
    pub system_unstable: bool,
    pub now: Timestamp,
}

impl StrategyContext {
    pub fn new(safe_mode: bool) -> Self {
        Self {
            safe_mode,
            system_unstable: false,
            now: now_millis(),
        }
    }

    #[must_use]
    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    #[must_use]
    pub fn unstable(mut self, unstable: bool) -> Self {
        self.system_unstable = unstable;
        self
    }
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Result of `analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAnalysis {
    pub strategy: StrategyKind,
    pub can_optimize: bool,
    pub risk_level: RiskLevel,
    /// Percent reduction of the strategy's primary resource
    pub estimated_reduction: f64,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub recommendations: Vec<String>,
    /// Why the strategy does not apply
    #[serde(skip_serializing_if = "is_none", default)]
    pub blocked_reason: Option<String>,
}

impl StrategyAnalysis {
    pub(crate) fn blocked(strategy: StrategyKind, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            can_optimize: false,
            risk_level: RiskLevel::Low,
            estimated_reduction: 0.0,
            recommendations: Vec::new(),
            blocked_reason: Some(reason.into()),
        }
    }

    pub(crate) fn not_applicable(&self, pid: Pid) -> StrategyError {
        StrategyError::NotApplicable {
            strategy: self.strategy,
            pid,
            reason: self
                .blocked_reason
                .clone()
                .unwrap_or_else(|| "analysis rejected optimization".to_string()),
        }
    }
}

/// Descriptor of memories merged by consolidation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMemory {
    pub id: String,
    pub emotion: String,
    pub combined_intensity: f64,
    pub fragments: usize,
}

/// Narrative-visible consequence of an optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    EmotionalDampening {
        intensity: f64,
    },
    PriorityLowered {
        from: ProcessPriority,
        to: ProcessPriority,
    },
    MemoryMerge {
        affected_memories: Vec<String>,
        merged_memory: MergedMemory,
    },
    TemporaryInstability {
        thread_delta: i64,
        effectiveness_dip: f64,
        recovery_at: Timestamp,
    },
    PotentialInstability {
        strategies_applied: usize,
        overall_improvement: f64,
    },
}

impl SideEffect {
    /// Narrative tag for the effect
    pub const fn tag(&self) -> &'static str {
        match self {
            SideEffect::EmotionalDampening { .. } => "emotional_dampening",
            SideEffect::PriorityLowered { .. } => "priority_lowered",
            SideEffect::MemoryMerge { .. } => "memory_merge",
            SideEffect::TemporaryInstability { .. } => "temporary_instability",
            SideEffect::PotentialInstability { .. } => "potential_instability",
        }
    }
}

/// Before/after resource figures of one process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub cpu_before: f64,
    pub cpu_after: f64,
    pub memory_before: f64,
    pub memory_after: f64,
    pub threads_before: u32,
    pub threads_after: u32,
    pub effectiveness_before: f64,
    pub effectiveness_after: f64,
}

impl ResourceDelta {
    pub fn between(before: &Process, after: &Process) -> Self {
        Self {
            cpu_before: before.cpu_usage,
            cpu_after: after.cpu_usage,
            memory_before: before.memory_usage,
            memory_after: after.memory_usage,
            threads_before: before.thread_count,
            threads_after: after.thread_count,
            effectiveness_before: before.effectiveness_score,
            effectiveness_after: after.effectiveness_score,
        }
    }

    /// CPU reduction as a percentage of the starting value
    pub fn cpu_improvement(&self) -> f64 {
        percent_drop(self.cpu_before, self.cpu_after)
    }

    /// Memory reduction as a percentage of the starting value
    pub fn memory_improvement(&self) -> f64 {
        percent_drop(self.memory_before, self.memory_after)
    }

    pub fn thread_delta(&self) -> i64 {
        self.threads_after as i64 - self.threads_before as i64
    }
}

fn percent_drop(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        0.0
    } else {
        (before - after) / before * 100.0
    }
}

/// Undo payload for an optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationUndo {
    pub strategy: StrategyKind,
    pub process_snapshot: Option<Process>,
    pub applied_at: Timestamp,
}

/// One sub-strategy run inside a hybrid optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub strategy: StrategyKind,
    pub delta: ResourceDelta,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub side_effects: Vec<SideEffect>,
}

/// Aggregate improvement of a hybrid optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedImprovement {
    pub cpu_improvement: f64,
    pub memory_improvement: f64,
    pub thread_change: i64,
    pub overall_improvement: f64,
    pub combined_risk: f64,
    pub strategies_applied: Vec<StrategyKind>,
}

/// Result of `optimize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub success: bool,
    pub strategy: StrategyKind,
    pub process_id: Pid,
    pub delta: ResourceDelta,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub side_effects: Vec<SideEffect>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub phases: Vec<PhaseOutcome>,
    #[serde(skip_serializing_if = "is_none", default)]
    pub combined: Option<CombinedImprovement>,
    pub undo: OptimizationUndo,
}

impl OptimizationOutcome {
    pub(crate) fn single(
        strategy: StrategyKind,
        before: Process,
        after: &Process,
        side_effects: Vec<SideEffect>,
        applied_at: Timestamp,
    ) -> Self {
        Self {
            success: true,
            strategy,
            process_id: after.id,
            delta: ResourceDelta::between(&before, after),
            side_effects,
            phases: Vec::new(),
            combined: None,
            undo: OptimizationUndo {
                strategy,
                process_snapshot: Some(before),
                applied_at,
            },
        }
    }
}

/// CPU throttling knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuThrottlingOptions {
    pub target_reduction: f64,
}

impl Default for CpuThrottlingOptions {
    fn default() -> Self {
        Self {
            target_reduction: DEFAULT_CPU_TARGET_REDUCTION,
        }
    }
}

/// Memory consolidation knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConsolidationOptions {
    pub target_memory_reduction: f64,
}

impl Default for MemoryConsolidationOptions {
    fn default() -> Self {
        Self {
            target_memory_reduction: DEFAULT_MEMORY_TARGET_REDUCTION,
        }
    }
}

/// Thread rebalancing knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadRebalancingOptions {
    /// Effectiveness lost while a large rebalance settles
    pub instability_dip: f64,
    /// Delay before the dip is recovered
    pub recovery_delay_ms: u64,
}

impl Default for ThreadRebalancingOptions {
    fn default() -> Self {
        Self {
            instability_dip: 0.1,
            recovery_delay_ms: 5_000,
        }
    }
}

/// Hybrid optimization knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridOptions {
    pub max_combined_risk: f64,
    /// Run memory, thread, cpu in sequence with adjusted targets
    pub coordinated: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            max_combined_risk: MAX_COMBINED_RISK,
            coordinated: true,
        }
    }
}

/// Options for every strategy variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    pub cpu: CpuThrottlingOptions,
    pub memory: MemoryConsolidationOptions,
    pub thread: ThreadRebalancingOptions,
    pub hybrid: HybridOptions,
}
