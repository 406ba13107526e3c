/*!
 * Command Event Emission Tests
 */

use super::common::*;
use mind_kernel::memory::{AllocationPriority, AllocationStrategy, SegmentRequest};
use mind_kernel::monitoring::EventSink;
use mind_kernel::{
    AllocateMemoryCommand, AllocateParams, Command, CommandDeps, ConsciousnessRegistry,
    EventBus, KernelConfig, KernelEvent, KillProcessCommand, OptimizeParams,
    OptimizeProcessCommand, RestartProcessCommand, StrategyKind,
};
use mockall::{mock, Sequence};
use pretty_assertions::assert_eq;
use std::sync::Arc;

mock! {
    pub Sink {}

    impl EventSink for Sink {
        fn emit(&self, event: KernelEvent);
    }
}

fn mocked(h: &Harness, sink: MockSink) -> CommandDeps {
    let registry: ConsciousnessRegistry = h.registry.clone();
    CommandDeps::new(Arc::new(registry), Arc::new(sink), KernelConfig::default())
}

#[tokio::test]
async fn test_allocation_emits_in_order() {
    let h = Harness::new();
    let pid = h.spawn(worker("focus"));
    h.mind
        .memory()
        .commit(SegmentRequest {
            process_id: pid,
            size: 1024,
            strategy: AllocationStrategy::Focused,
            priority: AllocationPriority::Normal,
            duration: 0,
        })
        .unwrap();

    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    sink.expect_emit()
        .withf(move |e| {
            matches!(
                e,
                KernelEvent::MemoryAllocated { process_id, size: 461, .. } if *process_id == pid
            )
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_emit()
        .withf(|e| matches!(e, KernelEvent::AttentionShifted { size: 461, .. }))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let mut cmd =
        AllocateMemoryCommand::new(AllocateParams::new(CHARACTER, pid, 512), mocked(&h, sink))
            .unwrap();
    cmd.execute().await.unwrap();
}

#[tokio::test]
async fn test_rejected_command_emits_nothing() {
    let h = Harness::seeded();
    let core = h
        .mind
        .processes()
        .find_by_name("memory_core")
        .unwrap()
        .id;

    let mut sink = MockSink::new();
    sink.expect_emit().never();

    let deps = mocked(&h, sink);
    let mut kill = KillProcessCommand::new(CHARACTER, core, deps.clone()).unwrap();
    assert!(kill.execute().await.is_err());

    let mut allocate =
        AllocateMemoryCommand::new(AllocateParams::new(CHARACTER, core, 10), deps).unwrap();
    assert!(allocate.execute().await.is_err());
}

#[tokio::test]
async fn test_recorded_lifecycle_events() {
    let h = Harness::new();
    let pid = h.spawn(worker("daydreaming"));

    let mut restart = RestartProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    restart.execute().await.unwrap();
    restart.undo().await.unwrap();

    let mut kill = KillProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    kill.execute().await.unwrap();
    kill.undo().await.unwrap();

    assert_eq!(
        h.sink.names(),
        vec![
            "process_restarted",
            "process_restart_undone",
            "process_killed",
            "process_kill_undone",
        ]
    );
    assert!(h
        .sink
        .events()
        .iter()
        .all(|e| e.character_id().as_str() == CHARACTER));
}

#[tokio::test]
async fn test_optimization_event_lists_side_effects() {
    let h = Harness::new();
    let pid = h.spawn(worker("fixation").with_resources(80.0, 100.0, 2));

    let mut cmd = OptimizeProcessCommand::new(
        OptimizeParams::new(CHARACTER, pid).with_strategy(StrategyKind::CpuThrottling),
        h.deps.clone(),
    )
    .unwrap();
    cmd.execute().await.unwrap();

    match h.sink.events().as_slice() {
        [KernelEvent::ProcessOptimized {
            strategy,
            cpu_improvement,
            side_effects,
            ..
        }] => {
            assert_eq!(*strategy, StrategyKind::CpuThrottling);
            assert!((cpu_improvement - 30.0).abs() < 1e-9);
            assert!(side_effects.is_empty());
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_bus_delivers_records_to_subscribers() {
    let h = Harness::new();
    let pid = h.spawn(worker("focus"));
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let deps = CommandDeps::from_registry(&h.registry, Arc::new(bus.clone()));

    let mut kill = KillProcessCommand::new(CHARACTER, pid, deps).unwrap();
    kill.execute().await.unwrap();

    let record = rx.recv_async().await.unwrap();
    assert_eq!(record.event.name(), "process_killed");
    assert_eq!(bus.emitted(), 1);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["event"], "process_killed");
    assert_eq!(json["process_id"], pid);
    assert_eq!(json["forced"], false);
}

#[tokio::test]
async fn test_outcome_serializes_with_detail_tag() {
    let h = Harness::new();
    let pid = h.spawn(worker("focus"));

    let mut kill = KillProcessCommand::new(CHARACTER, pid, h.deps.clone()).unwrap();
    let outcome = kill.execute().await.unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["kind"], "kill_process");
    assert_eq!(json["character_id"], CHARACTER);
    assert_eq!(json["detail"]["type"], "kill");
    assert_eq!(json["detail"]["name"], "focus");
    assert_eq!(json["narrative_events"][0], "process_killed");
}
