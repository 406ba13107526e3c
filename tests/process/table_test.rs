/*!
 * Process Table Tests
 */

use mind_kernel::process::{
    IssueKind, IssueSeverity, ProcessError, ProcessIssue, ProcessPriority, ProcessSpec,
    ProcessStatus, ProcessTable, ProcessType,
};
use pretty_assertions::assert_eq;

fn table_with(names: &[&str]) -> ProcessTable {
    let table = ProcessTable::new();
    for name in names {
        table.create_base_process(
            ProcessSpec::new(*name, ProcessType::Cognitive).with_resources(20.0, 100.0, 2),
        );
    }
    table
}

#[test]
fn test_list_in_creation_order() {
    let table = table_with(&["planning", "recall", "worry"]);
    let names: Vec<String> = table.list().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["planning", "recall", "worry"]);
    assert_eq!(table.find_by_name("recall").map(|p| p.id), Some(2));
    assert!(table.find_by_name("dreaming").is_none());
}

#[test]
fn test_spec_values_are_clamped() {
    let table = ProcessTable::new();
    let pid = table.create_base_process(
        ProcessSpec::new("overload", ProcessType::Executive)
            .with_priority(ProcessPriority::High)
            .with_resources(150.0, -5.0, 0)
            .with_emotional_impact(1.7)
            .with_effectiveness(-0.3),
    );
    let process = table.get(pid).unwrap();

    assert_eq!(process.cpu_usage, 100.0);
    assert_eq!(process.memory_usage, 0.0);
    assert_eq!(process.thread_count, 1);
    assert_eq!(process.emotional_impact, 1.0);
    assert_eq!(process.effectiveness_score, 0.0);
    assert_eq!(process.priority, ProcessPriority::High);
}

#[test]
fn test_crash_then_restart_counts() {
    let table = table_with(&["focus"]);
    table
        .crash(1, Some(ProcessIssue::new(IssueKind::Unresponsive, IssueSeverity::High)))
        .unwrap();
    let restarted = table.restart(1).unwrap();

    assert_eq!(restarted.status, ProcessStatus::Running);
    assert_eq!(restarted.crash_count, 1);
    let counters = table.counters();
    assert_eq!(counters.process_crashes, 1);
    assert_eq!(counters.process_restarts, 1);
}

#[test]
fn test_update_missing_process() {
    let table = table_with(&["a"]);
    assert_eq!(table.update(9, |p| p.cpu_usage = 1.0), Err(ProcessError::NotFound(9)));
    assert_eq!(table.update(1, |p| p.thread_count).unwrap(), 2);
}

#[test]
fn test_stopped_process_is_not_active() {
    let table = table_with(&["a", "b"]);
    table.stop(2).unwrap();

    let metrics = table.performance_metrics();
    assert_eq!(metrics.active_processes, 1);
    assert_eq!(metrics.total_threads, 4);
    assert_eq!(metrics.total_memory_usage, 200.0);
}

#[test]
fn test_tick_only_ages_running() {
    let table = table_with(&["a", "b"]);
    table.stop(2).unwrap();
    table.tick(250, 0);

    assert_eq!(table.get(1).unwrap().lifetime_ms, 250);
    assert_eq!(table.get(2).unwrap().lifetime_ms, 0);
}

#[test]
fn test_clones_share_state() {
    let table = table_with(&["a"]);
    let other = table.clone();
    other.kill(1).unwrap();
    assert!(table.get(1).unwrap().is_terminated());
}
