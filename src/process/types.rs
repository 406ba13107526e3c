/*!
 * Process Types
 * Common types for process management
 */

use crate::core::limits::{DEFAULT_BASELINE_CPU, DEFAULT_BASELINE_MEMORY, DEFAULT_BASELINE_THREADS};
use crate::core::serde::{is_empty_vec, is_false, is_none, is_zero_u32};
use crate::core::types::{clamp_unit, Pid, Timestamp};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProcessError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(process::not_found),
        help("The process may never have existed in this character's table.")
    )]
    NotFound(Pid),

    #[error("Process {0} is terminated")]
    #[diagnostic(
        code(process::terminated),
        help("Terminated processes are final and cannot be restarted or modified.")
    )]
    Terminated(Pid),

    #[error("Invalid state transition for process {pid}: {from} -> {to}")]
    #[diagnostic(code(process::invalid_transition))]
    InvalidTransition {
        pid: Pid,
        from: ProcessStatus,
        to: ProcessStatus,
    },
}

/// Process lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Stopped,
    Crashed,
    /// Terminal state; the process object is retained for audit and undo
    Terminated,
}

impl ProcessStatus {
    /// Lifecycle transition table
    ///
    /// `running -> {stopped, crashed} -> terminated`, `running -> terminated`,
    /// and restart `{running, stopped, crashed} -> running`.
    pub const fn can_transition_to(self, next: ProcessStatus) -> bool {
        use ProcessStatus::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Running, Stopped) | (Running, Crashed) | (Stopped, Crashed) => true,
            (_, Running) => true,
            _ => false,
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Terminated)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Crashed => "crashed",
            ProcessStatus::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Kind of mental activity a process models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    EmotionalProcessing,
    MemorySearch,
    Cognitive,
    Social,
    Executive,
    Creative,
    Background,
}

impl ProcessType {
    #[inline]
    pub const fn is_emotional(self) -> bool {
        matches!(self, ProcessType::EmotionalProcessing)
    }
}

/// Process priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl ProcessPriority {
    /// One step down, saturating at `Low`
    pub const fn lowered(self) -> Self {
        match self {
            ProcessPriority::Critical => ProcessPriority::High,
            ProcessPriority::High => ProcessPriority::Normal,
            ProcessPriority::Normal | ProcessPriority::Low => ProcessPriority::Low,
        }
    }

    #[inline]
    pub const fn is_elevated(self) -> bool {
        matches!(self, ProcessPriority::High | ProcessPriority::Critical)
    }
}

impl Default for ProcessPriority {
    fn default() -> Self {
        ProcessPriority::Normal
    }
}

/// Issue category attached to a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    HighCpu,
    MemoryLeak,
    Fragmentation,
    ThreadContention,
    Unresponsive,
    EmotionalOverload,
    Crash,
    Other(String),
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
}

impl ProcessIssue {
    pub fn new(kind: IssueKind, severity: IssueSeverity) -> Self {
        Self { kind, severity }
    }
}

/// What drives a process emotionally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSource {
    pub kind: String,
    pub intensity: f64,
}

impl EmotionSource {
    pub fn new(kind: impl Into<String>, intensity: f64) -> Self {
        Self {
            kind: kind.into(),
            intensity: clamp_unit(intensity),
        }
    }
}

impl Default for EmotionSource {
    fn default() -> Self {
        Self::new("neutral", 0.0)
    }
}

/// Resource baseline restored on restart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessBaseline {
    pub cpu: f64,
    pub memory: f64,
    pub threads: u32,
}

impl Default for ProcessBaseline {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_BASELINE_CPU,
            memory: DEFAULT_BASELINE_MEMORY,
            threads: DEFAULT_BASELINE_THREADS,
        }
    }
}

/// Effectiveness recovery scheduled after a disruptive change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledRecovery {
    pub amount: f64,
    pub due_at: Timestamp,
}

/// A simulated unit of mental activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Process {
    pub id: Pid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProcessType,
    pub status: ProcessStatus,
    pub priority: ProcessPriority,
    /// Percent, 0..100
    pub cpu_usage: f64,
    /// Megabytes
    pub memory_usage: f64,
    pub thread_count: u32,
    /// Milliseconds since the last reset
    pub lifetime_ms: u64,
    pub emotional_impact: f64,
    pub effectiveness_score: f64,
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub optimization_level: u32,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub current_issues: Vec<ProcessIssue>,
    #[serde(skip_serializing_if = "is_none", default)]
    pub config: Option<ProcessBaseline>,
    pub restart_count: u32,
    pub crash_count: u32,
    pub emotion_source: EmotionSource,
    pub started_at: Timestamp,
    pub last_activity: Timestamp,
    #[serde(skip_serializing_if = "is_none", default)]
    pub last_restart: Option<Timestamp>,
    #[serde(skip_serializing_if = "is_none", default)]
    pub end_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "is_none", default)]
    pub exit_code: Option<i32>,
    /// Set by dynamic memory allocation
    #[serde(skip_serializing_if = "is_false", default)]
    pub adaptive: bool,
    #[serde(skip_serializing_if = "is_none", default)]
    pub pending_recovery: Option<ScheduledRecovery>,
}

impl Process {
    /// Baseline from config, falling back to the documented defaults
    pub fn baseline(&self) -> ProcessBaseline {
        self.config.unwrap_or_default()
    }

    #[inline]
    pub const fn is_terminated(&self) -> bool {
        self.status.is_terminal()
    }

    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, ProcessStatus::Running)
    }

    /// Whether two processes count as related for distributed allocation
    pub fn is_related_to(&self, other: &Process) -> bool {
        self.id != other.id
            && (self.kind == other.kind || self.emotion_source.kind == other.emotion_source.kind)
    }

    pub fn has_issue(&self, kind: &IssueKind) -> bool {
        self.current_issues.iter().any(|issue| &issue.kind == kind)
    }
}

/// Parameters for creating a process
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub name: String,
    pub kind: ProcessType,
    pub priority: ProcessPriority,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub thread_count: u32,
    pub emotional_impact: f64,
    pub effectiveness_score: f64,
    pub emotion_source: EmotionSource,
    pub config: Option<ProcessBaseline>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, kind: ProcessType) -> Self {
        let baseline = ProcessBaseline::default();
        Self {
            name: name.into(),
            kind,
            priority: ProcessPriority::Normal,
            cpu_usage: baseline.cpu,
            memory_usage: baseline.memory,
            thread_count: baseline.threads,
            emotional_impact: 0.0,
            effectiveness_score: 0.5,
            emotion_source: EmotionSource::default(),
            config: None,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: ProcessPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_resources(mut self, cpu: f64, memory: f64, threads: u32) -> Self {
        self.cpu_usage = cpu;
        self.memory_usage = memory;
        self.thread_count = threads;
        self
    }

    #[must_use]
    pub fn with_emotional_impact(mut self, impact: f64) -> Self {
        self.emotional_impact = impact;
        self
    }

    #[must_use]
    pub fn with_effectiveness(mut self, score: f64) -> Self {
        self.effectiveness_score = score;
        self
    }

    #[must_use]
    pub fn with_emotion_source(mut self, source: EmotionSource) -> Self {
        self.emotion_source = source;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ProcessBaseline) -> Self {
        self.config = Some(config);
        self
    }
}

/// Aggregate table metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_processes: usize,
    pub active_processes: usize,
    pub terminated_processes: usize,
    pub total_cpu_usage: f64,
    pub total_memory_usage: f64,
    pub total_threads: u32,
    pub average_effectiveness: f64,
    pub killed_processes: u64,
    pub process_restarts: u64,
    pub process_crashes: u64,
}

/// Lifecycle counters stored with the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCounters {
    pub killed_processes: u64,
    pub process_restarts: u64,
    pub process_crashes: u64,
}
