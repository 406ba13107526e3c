/*!
 * Process Lifecycle
 *
 * State transitions applied to a single process record. The table owns
 * lookup, counters, and locking; these functions only mutate the record
 * once the transition has been checked.
 *
 * # States
 *
 * - `running -> {stopped, crashed} -> terminated` (terminal)
 * - `running | stopped | crashed -> running` via restart
 * - `terminated` has no outbound transition
 */

use super::types::{IssueKind, IssueSeverity, Process, ProcessError, ProcessIssue, ProcessResult, ProcessStatus};
use crate::core::limits::KILL_EXIT_CODE;
use crate::core::types::Timestamp;

fn check_transition(process: &Process, next: ProcessStatus) -> ProcessResult<()> {
    if process.is_terminated() {
        return Err(ProcessError::Terminated(process.id));
    }
    if !process.status.can_transition_to(next) {
        return Err(ProcessError::InvalidTransition {
            pid: process.id,
            from: process.status,
            to: next,
        });
    }
    Ok(())
}

/// Terminate a process; the record stays for audit and undo
pub fn kill(process: &mut Process, now: Timestamp) -> ProcessResult<()> {
    check_transition(process, ProcessStatus::Terminated)?;
    process.status = ProcessStatus::Terminated;
    process.exit_code = Some(KILL_EXIT_CODE);
    process.end_time = Some(now);
    Ok(())
}

/// Restore a process to its baseline and mark it running
///
/// Identity, type, emotion source, emotional impact, and crash history are
/// preserved.
pub fn restart(process: &mut Process, now: Timestamp) -> ProcessResult<()> {
    check_transition(process, ProcessStatus::Running)?;

    let baseline = process.baseline();
    process.lifetime_ms = 0;
    process.current_issues.clear();
    process.cpu_usage = baseline.cpu;
    process.memory_usage = baseline.memory;
    process.thread_count = baseline.threads;
    process.restart_count += 1;
    process.status = ProcessStatus::Running;
    process.last_restart = Some(now);
    process.last_activity = now;
    process.exit_code = None;
    process.end_time = None;
    process.pending_recovery = None;
    Ok(())
}

/// Mark a process crashed and record the cause
pub fn crash(process: &mut Process, issue: Option<ProcessIssue>, now: Timestamp) -> ProcessResult<()> {
    check_transition(process, ProcessStatus::Crashed)?;
    process.status = ProcessStatus::Crashed;
    process.crash_count += 1;
    process.last_activity = now;
    process
        .current_issues
        .push(issue.unwrap_or_else(|| ProcessIssue::new(IssueKind::Crash, IssueSeverity::High)));
    Ok(())
}

/// Pause a running process
pub fn stop(process: &mut Process, now: Timestamp) -> ProcessResult<()> {
    check_transition(process, ProcessStatus::Stopped)?;
    process.status = ProcessStatus::Stopped;
    process.last_activity = now;
    Ok(())
}
