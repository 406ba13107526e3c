/*!
 * Process Table
 * Owns one character's processes and lifecycle counters
 */

use super::lifecycle;
use super::types::{
    LifecycleCounters, PerformanceMetrics, Process, ProcessError, ProcessIssue, ProcessResult,
    ProcessSpec, ProcessStatus,
};
use crate::core::types::{clamp_unit, now_millis, Pid, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Value snapshot of one process
///
/// The table-wide counters are not captured; other processes may move them
/// while this one is locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub process: Process,
}

/// Lifecycle transition that bumps a table counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountedTransition {
    Kill,
    Restart,
    Crash,
}

#[derive(Debug, Default)]
struct TableState {
    // Pids are monotonic, so key order is creation order
    processes: BTreeMap<Pid, Process>,
    counters: LifecycleCounters,
}

impl TableState {
    fn get_mut(&mut self, pid: Pid) -> ProcessResult<&mut Process> {
        self.processes.get_mut(&pid).ok_or(ProcessError::NotFound(pid))
    }
}

/// Process table
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProcessTable {
    state: Arc<RwLock<TableState>>,
    next_pid: Arc<AtomicU32>,
}

impl ProcessTable {
    pub fn new() -> Self {
        info!("Process table initialized");
        Self {
            state: Arc::new(RwLock::new(TableState::default())),
            next_pid: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Create a running process with zeroed counters
    pub fn create_base_process(&self, spec: ProcessSpec) -> Pid {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let now = now_millis();

        let process = Process {
            id: pid,
            name: spec.name,
            kind: spec.kind,
            status: ProcessStatus::Running,
            priority: spec.priority,
            cpu_usage: spec.cpu_usage.clamp(0.0, 100.0),
            memory_usage: spec.memory_usage.max(0.0),
            thread_count: spec.thread_count.max(1),
            lifetime_ms: 0,
            emotional_impact: clamp_unit(spec.emotional_impact),
            effectiveness_score: clamp_unit(spec.effectiveness_score),
            optimization_level: 0,
            current_issues: Vec::new(),
            config: spec.config,
            restart_count: 0,
            crash_count: 0,
            emotion_source: spec.emotion_source,
            started_at: now,
            last_activity: now,
            last_restart: None,
            end_time: None,
            exit_code: None,
            adaptive: false,
            pending_recovery: None,
        };

        info!(pid, name = %process.name, kind = ?process.kind, "Created process");
        self.state.write().processes.insert(pid, process);
        pid
    }

    pub fn get(&self, pid: Pid) -> Option<Process> {
        self.state.read().processes.get(&pid).cloned()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.state.read().processes.contains_key(&pid)
    }

    /// All processes in creation order
    pub fn list(&self) -> Vec<Process> {
        self.state.read().processes.values().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Process> {
        self.state
            .read()
            .processes
            .values()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate a process in place
    pub fn update<F, R>(&self, pid: Pid, f: F) -> ProcessResult<R>
    where
        F: FnOnce(&mut Process) -> R,
    {
        let mut state = self.state.write();
        let process = state.get_mut(pid)?;
        Ok(f(process))
    }

    /// Terminate a process; it remains queryable
    pub fn kill(&self, pid: Pid) -> ProcessResult<Process> {
        let mut state = self.state.write();
        let process = state.get_mut(pid)?;
        lifecycle::kill(process, now_millis())?;
        let killed = process.clone();
        state.counters.killed_processes += 1;

        info!(pid, name = %killed.name, "Killed process");
        Ok(killed)
    }

    /// Reset a non-terminated process to its baseline
    pub fn restart(&self, pid: Pid) -> ProcessResult<Process> {
        let mut state = self.state.write();
        let process = state.get_mut(pid)?;
        lifecycle::restart(process, now_millis()).map_err(|e| {
            warn!(pid, error = %e, "Restart refused");
            e
        })?;
        let restarted = process.clone();
        state.counters.process_restarts += 1;

        info!(
            pid,
            name = %restarted.name,
            restart_count = restarted.restart_count,
            "Restarted process"
        );
        Ok(restarted)
    }

    /// Record a crash
    pub fn crash(&self, pid: Pid, issue: Option<ProcessIssue>) -> ProcessResult<Process> {
        let mut state = self.state.write();
        let process = state.get_mut(pid)?;
        lifecycle::crash(process, issue, now_millis())?;
        let crashed = process.clone();
        state.counters.process_crashes += 1;

        warn!(pid, name = %crashed.name, crash_count = crashed.crash_count, "Process crashed");
        Ok(crashed)
    }

    pub fn stop(&self, pid: Pid) -> ProcessResult<Process> {
        let mut state = self.state.write();
        let process = state.get_mut(pid)?;
        lifecycle::stop(process, now_millis())?;
        debug!(pid, "Stopped process");
        Ok(process.clone())
    }

    pub fn snapshot(&self, pid: Pid) -> ProcessResult<ProcessSnapshot> {
        let process = self
            .state
            .read()
            .processes
            .get(&pid)
            .cloned()
            .ok_or(ProcessError::NotFound(pid))?;
        Ok(ProcessSnapshot { process })
    }

    /// Put back a snapshot taken by `snapshot`; counters are left alone
    pub fn restore(&self, snapshot: &ProcessSnapshot) {
        let mut state = self.state.write();
        state
            .processes
            .insert(snapshot.process.id, snapshot.process.clone());
        debug!(pid = snapshot.process.id, "Restored process snapshot");
    }

    /// Undo one counted transition on the snapshotted process
    ///
    /// Only that transition's counter is decremented, so transitions recorded
    /// on other processes since the snapshot survive.
    pub fn restore_after(&self, transition: CountedTransition, snapshot: &ProcessSnapshot) {
        let mut state = self.state.write();
        state
            .processes
            .insert(snapshot.process.id, snapshot.process.clone());

        let counter = match transition {
            CountedTransition::Kill => &mut state.counters.killed_processes,
            CountedTransition::Restart => &mut state.counters.process_restarts,
            CountedTransition::Crash => &mut state.counters.process_crashes,
        };
        *counter = counter.saturating_sub(1);

        debug!(
            pid = snapshot.process.id,
            ?transition,
            "Reverted lifecycle transition"
        );
    }

    /// Replace a process record wholesale
    pub fn restore_process(&self, process: Process) {
        debug!(pid = process.id, "Restored process record");
        self.state.write().processes.insert(process.id, process);
    }

    pub fn counters(&self) -> LifecycleCounters {
        self.state.read().counters
    }

    /// Aggregate metrics over every process
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let state = self.state.read();
        let mut metrics = PerformanceMetrics {
            total_processes: state.processes.len(),
            killed_processes: state.counters.killed_processes,
            process_restarts: state.counters.process_restarts,
            process_crashes: state.counters.process_crashes,
            ..PerformanceMetrics::default()
        };

        let mut effectiveness_sum = 0.0;
        for process in state.processes.values() {
            if process.is_terminated() {
                metrics.terminated_processes += 1;
                continue;
            }
            if process.is_running() {
                metrics.active_processes += 1;
            }
            metrics.total_cpu_usage += process.cpu_usage;
            metrics.total_memory_usage += process.memory_usage;
            metrics.total_threads += process.thread_count;
            effectiveness_sum += process.effectiveness_score;
        }

        let live = metrics.total_processes - metrics.terminated_processes;
        if live > 0 {
            metrics.average_effectiveness = effectiveness_sum / live as f64;
        }
        metrics
    }

    /// Advance running processes' lifetimes and apply due recoveries
    ///
    /// Returns the number of recoveries applied.
    pub fn tick(&self, elapsed_ms: u64, now: Timestamp) -> usize {
        let mut state = self.state.write();
        let mut applied = 0;

        for process in state.processes.values_mut() {
            if process.is_running() {
                process.lifetime_ms += elapsed_ms;
            }
            if let Some(recovery) = process.pending_recovery {
                if recovery.due_at <= now && !process.is_terminated() {
                    process.effectiveness_score =
                        clamp_unit(process.effectiveness_score + recovery.amount);
                    process.pending_recovery = None;
                    applied += 1;
                    debug!(pid = process.id, amount = recovery.amount, "Applied scheduled recovery");
                }
            }
        }

        applied
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
