/*!
 * Kill, Restart, and Release Command Tests
 */

use super::common::*;
use mind_kernel::memory::MemoryError;
use mind_kernel::process::{IssueKind, IssueSeverity, ProcessIssue};
use mind_kernel::{
    AllocateMemoryCommand, AllocateParams, Command, CommandError, KillProcessCommand,
    OutcomeDetail, ProcessStatus, ReleaseMemoryCommand, RestartProcessCommand,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_kill_then_restart_is_rejected() {
    let h = Harness::new();
    let pid = h.spawn(worker("daydreaming"));

    let mut kill = KillProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    let outcome = kill.execute().await.unwrap();
    assert_eq!(
        outcome.detail,
        OutcomeDetail::Kill {
            process_id: pid,
            name: "daydreaming".into(),
            forced: false,
        }
    );

    let process = h.mind.processes().get(pid).unwrap();
    assert_eq!(process.status, ProcessStatus::Terminated);
    assert_eq!(process.exit_code, Some(-9));

    let mut restart = RestartProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    assert!(matches!(
        restart.can_execute().await,
        Err(CommandError::Precondition(_))
    ));
    assert!(restart.execute().await.is_err());
    assert_eq!(
        h.mind.processes().get(pid).unwrap().status,
        ProcessStatus::Terminated
    );
}

#[tokio::test]
async fn test_kill_undo_restores_process_and_counters() {
    let h = Harness::new();
    let pid = h.spawn(worker("worry"));
    let before = h.mind.processes().get(pid).unwrap();

    let mut kill = KillProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    kill.execute().await.unwrap();
    assert_eq!(h.mind.processes().counters().killed_processes, 1);

    let outcome = kill.undo().await.unwrap();
    assert_eq!(
        outcome.detail,
        OutcomeDetail::KillUndone {
            process_id: pid,
            status: ProcessStatus::Running,
        }
    );
    assert_eq!(h.mind.processes().get(pid).unwrap(), before);
    assert_eq!(h.mind.processes().counters().killed_processes, 0);
}

#[tokio::test]
async fn test_out_of_order_kill_undo_keeps_other_counts() {
    let h = Harness::new();
    let a = h.spawn(worker("worry"));
    let b = h.spawn(worker("doubt"));

    let mut kill_a = KillProcessCommand::new(CHARACTER, a, h.deps.clone()).unwrap();
    let mut kill_b = KillProcessCommand::new(CHARACTER, b, h.deps.clone()).unwrap();
    kill_a.execute().await.unwrap();
    kill_b.execute().await.unwrap();
    kill_a.undo().await.unwrap();

    let metrics = h.mind.processes().performance_metrics();
    assert_eq!(metrics.killed_processes, 1);
    assert_eq!(metrics.terminated_processes, 1);
    assert!(h.mind.processes().get(b).unwrap().is_terminated());
}

#[tokio::test]
async fn test_restart_undo_keeps_other_restarts() {
    let h = Harness::new();
    let a = h.spawn(worker("focus"));
    let b = h.spawn(worker("recall"));

    let mut restart_a = RestartProcessCommand::new(CHARACTER, a, h.deps.clone()).unwrap();
    let mut restart_b = RestartProcessCommand::new(CHARACTER, b, h.deps.clone()).unwrap();
    restart_a.execute().await.unwrap();
    restart_b.execute().await.unwrap();
    restart_a.undo().await.unwrap();

    assert_eq!(h.mind.processes().counters().process_restarts, 1);
    assert_eq!(h.mind.processes().get(b).unwrap().restart_count, 1);
}

#[tokio::test]
async fn test_protected_kill_requires_force() {
    let h = Harness::seeded();
    let core = h
        .mind
        .processes()
        .find_by_name("identity_core")
        .unwrap()
        .id;

    let mut plain = KillProcessCommand::new(CHARACTER, core, h.deps.clone()).unwrap();
    let err = plain.execute().await.unwrap_err();
    assert_eq!(
        err,
        CommandError::ProtectedProcess {
            pid: core,
            name: "identity_core".into(),
        }
    );
    assert!(h.mind.processes().get(core).unwrap().is_running());

    let mut forced = KillProcessCommand::new(CHARACTER, core, h.deps.clone())
        .unwrap()
        .with_force(true);
    let outcome = forced.execute().await.unwrap();
    assert!(matches!(
        outcome.detail,
        OutcomeDetail::Kill { forced: true, .. }
    ));
    assert!(h.mind.processes().get(core).unwrap().is_terminated());
}

#[tokio::test]
async fn test_restart_law_on_crashed_process() {
    let h = Harness::new();
    let pid = h.spawn(
        worker("obsession")
            .with_resources(80.0, 600.0, 6)
            .with_emotional_impact(0.6),
    );
    h.mind
        .processes()
        .update(pid, |p| p.lifetime_ms = 120_000)
        .unwrap();
    h.mind
        .processes()
        .crash(
            pid,
            Some(ProcessIssue::new(IssueKind::MemoryLeak, IssueSeverity::High)),
        )
        .unwrap();
    let crashed = h.mind.processes().get(pid).unwrap();

    let mut restart = RestartProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    let outcome = restart.execute().await.unwrap();
    assert_eq!(
        outcome.detail,
        OutcomeDetail::Restart {
            process_id: pid,
            restart_count: 1,
        }
    );

    let process = h.mind.processes().get(pid).unwrap();
    assert_eq!(process.status, ProcessStatus::Running);
    assert_eq!(process.lifetime_ms, 0);
    assert!(process.current_issues.is_empty());
    assert_eq!(process.cpu_usage, 10.0);
    assert_eq!(process.memory_usage, 50.0);
    assert_eq!(process.thread_count, 1);
    assert_eq!(process.crash_count, 1);
    assert_eq!(process.emotional_impact, 0.6);

    restart.undo().await.unwrap();
    assert_eq!(h.mind.processes().get(pid).unwrap(), crashed);
    assert_eq!(h.mind.processes().counters().process_restarts, 0);
}

#[tokio::test]
async fn test_release_returns_memory_and_undo_restores() {
    let h = Harness::new();
    let pid = h.spawn(worker("focus"));

    let mut allocate =
        AllocateMemoryCommand::new(AllocateParams::new(CHARACTER, pid, 256), h.deps.clone())
            .unwrap();
    let outcome = allocate.execute().await.unwrap();
    let segment_id = match &outcome.detail {
        OutcomeDetail::Allocation(report) => report.segment.id,
        other => panic!("unexpected detail {:?}", other),
    };
    // 256 * 0.9
    assert_eq!(h.memory_of(pid), 100.0 + 230.0);
    let allocated = h.mind.memory().snapshot();

    let mut release = ReleaseMemoryCommand::new(CHARACTER, segment_id, h.deps.clone()).unwrap();
    let released = release.execute().await.unwrap();
    assert!(matches!(
        released.detail,
        OutcomeDetail::Release { available_memory: 4096, .. }
    ));
    assert_eq!(h.memory_of(pid), 100.0);
    assert!(h.mind.memory().segment(segment_id).is_none());

    release.undo().await.unwrap();
    assert_eq!(h.mind.memory().snapshot(), allocated);
    assert_eq!(h.memory_of(pid), 330.0);
}

#[tokio::test]
async fn test_release_floors_owner_memory() {
    let h = Harness::new();
    let pid = h.spawn(worker("focus"));

    let mut allocate =
        AllocateMemoryCommand::new(AllocateParams::new(CHARACTER, pid, 256), h.deps.clone())
            .unwrap();
    let outcome = allocate.execute().await.unwrap();
    let segment_id = match &outcome.detail {
        OutcomeDetail::Allocation(report) => report.segment.id,
        other => panic!("unexpected detail {:?}", other),
    };
    h.mind
        .processes()
        .update(pid, |p| p.memory_usage = 20.0)
        .unwrap();

    let mut release = ReleaseMemoryCommand::new(CHARACTER, segment_id, h.deps.clone()).unwrap();
    release.execute().await.unwrap();
    assert_eq!(h.memory_of(pid), 0.0);
}

#[tokio::test]
async fn test_release_unknown_segment() {
    let h = Harness::new();
    let release = ReleaseMemoryCommand::new(CHARACTER, 42, h.deps.clone()).unwrap();
    assert_eq!(
        release.can_execute().await,
        Err(CommandError::Memory(MemoryError::SegmentNotFound(42)))
    );
    assert!(matches!(
        ReleaseMemoryCommand::new(CHARACTER, 0, h.deps.clone()),
        Err(CommandError::Construction(_))
    ));
}

#[tokio::test]
async fn test_undo_before_execute() {
    let h = Harness::new();
    let pid = h.spawn(worker("idle"));

    let mut kill = KillProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    assert!(matches!(kill.undo().await, Err(CommandError::NothingToUndo(_))));

    let mut restart = RestartProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    assert!(matches!(
        restart.undo().await,
        Err(CommandError::NothingToUndo(_))
    ));
    restart.execute().await.unwrap();
    assert!(matches!(
        restart.execute().await,
        Err(CommandError::AlreadyExecuted(_))
    ));
}
