/*!
 * Optimize Process Command Tests
 */

use super::common::*;
use mind_kernel::optimization::{OptimizationReason, StrategyError, TargetMetrics};
use mind_kernel::process::{ProcessPriority, ProcessType};
use mind_kernel::{
    Command, CommandError, KernelConfig, OptimizeParams, OptimizeProcessCommand, OutcomeDetail,
    ProcessSpec, StrategyKind,
};
use pretty_assertions::assert_eq;

fn optimize(h: &Harness, params: OptimizeParams) -> OptimizeProcessCommand {
    OptimizeProcessCommand::new(params, h.deps.clone()).unwrap()
}

/// Every hybrid risk term fires for this process
fn fragile() -> ProcessSpec {
    ProcessSpec::new("panic", ProcessType::EmotionalProcessing)
        .with_priority(ProcessPriority::Critical)
        .with_resources(90.0, 400.0, 1)
        .with_emotional_impact(0.9)
        .with_effectiveness(0.2)
}

#[tokio::test]
async fn test_explicit_cpu_throttling_and_undo() {
    let h = Harness::new();
    let pid = h.spawn(worker("overthinking").with_resources(80.0, 100.0, 2));
    let before = h.mind.processes().get(pid).unwrap();

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid).with_strategy(StrategyKind::CpuThrottling),
    );
    let outcome = cmd.execute().await.unwrap();

    let report = match &outcome.detail {
        OutcomeDetail::Optimization(report) => report,
        other => panic!("unexpected detail {:?}", other),
    };
    assert!(report.selection.is_none());
    assert_eq!(report.outcome.strategy, StrategyKind::CpuThrottling);
    let after = h.mind.processes().get(pid).unwrap();
    assert!((after.cpu_usage - 56.0).abs() < 1e-9);
    assert_eq!(after.optimization_level, 1);

    let undone = cmd.undo().await.unwrap();
    assert_eq!(
        undone.detail,
        OutcomeDetail::OptimizationUndone {
            process_id: pid,
            strategy: StrategyKind::CpuThrottling,
        }
    );
    assert_eq!(h.mind.processes().get(pid).unwrap(), before);
}

#[tokio::test]
async fn test_auto_selection_reports_choice() {
    let h = Harness::new();
    let pid = h.spawn(worker("hoarding").with_resources(30.0, 450.0, 2));

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid).with_reasons(vec![OptimizationReason::MemoryFragmented]),
    );
    let outcome = cmd.execute().await.unwrap();

    let report = match &outcome.detail {
        OutcomeDetail::Optimization(report) => report,
        other => panic!("unexpected detail {:?}", other),
    };
    let selection = report.selection.as_ref().expect("auto selection is reported");
    // 40 from the reason, 20 from memory above 300MB
    assert_eq!(selection.strategy, StrategyKind::MemoryConsolidation);
    assert_eq!(selection.score, 60.0);
    assert!(h.mind.processes().get(pid).unwrap().memory_usage < 450.0);
}

#[tokio::test]
async fn test_high_risk_hybrid_rejected_without_safe_mode() {
    let h = Harness::new();
    let pid = h.spawn(fragile());
    let before = h.mind.processes().get(pid).unwrap();

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid).with_strategy(StrategyKind::Hybrid),
    );
    let err = cmd.execute().await.unwrap_err();

    assert!(matches!(
        err,
        CommandError::Strategy(StrategyError::RiskTooHigh { .. })
    ));
    assert_eq!(h.mind.processes().get(pid).unwrap(), before);
    assert!(!cmd.can_undo());
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_high_risk_hybrid_runs_in_safe_mode() {
    let h = Harness::new();
    let pid = h.spawn(fragile());
    let before = h.mind.processes().get(pid).unwrap();

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid)
            .with_strategy(StrategyKind::Hybrid)
            .with_safe_mode(true),
    );
    let outcome = cmd.execute().await.unwrap();

    assert!(outcome
        .narrative_events
        .contains(&"potential_instability".to_string()));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.contains("strategies applied at once")));

    cmd.undo().await.unwrap();
    assert_eq!(h.mind.processes().get(pid).unwrap(), before);
}

#[tokio::test]
async fn test_configured_safe_mode_applies() {
    let h = Harness::with_config(KernelConfig::conservative());
    let pid = h.spawn(fragile());

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid).with_strategy(StrategyKind::Hybrid),
    );
    assert!(cmd.execute().await.is_ok());
}

#[tokio::test]
async fn test_protected_process_rejected() {
    let h = Harness::seeded();
    let core = h
        .mind
        .processes()
        .find_by_name("core_consciousness")
        .unwrap()
        .id;

    let cmd = optimize(&h, OptimizeParams::new(CHARACTER, core));
    assert!(matches!(
        cmd.can_execute().await,
        Err(CommandError::ProtectedProcess { .. })
    ));
}

#[tokio::test]
async fn test_not_applicable_strategy_leaves_process() {
    let h = Harness::new();
    let pid = h.spawn(worker("calm").with_resources(10.0, 50.0, 1));
    let before = h.mind.processes().get(pid).unwrap();

    let mut cmd = optimize(
        &h,
        OptimizeParams::new(CHARACTER, pid).with_strategy(StrategyKind::CpuThrottling),
    );
    assert!(matches!(
        cmd.execute().await,
        Err(CommandError::Strategy(StrategyError::NotApplicable { .. }))
    ));
    assert_eq!(h.mind.processes().get(pid).unwrap(), before);
}

#[test]
fn test_construction_validation() {
    let h = Harness::new();

    let bad_target = OptimizeParams::new(CHARACTER, 1).with_target(TargetMetrics {
        cpu_reduction: Some(1.5),
        memory_reduction: None,
    });
    assert!(matches!(
        OptimizeProcessCommand::new(bad_target, h.deps.clone()),
        Err(CommandError::Construction(_))
    ));
    assert!(matches!(
        OptimizeParams::new(CHARACTER, 1).with_strategy_name("defrag"),
        Err(CommandError::Construction(_))
    ));
    assert_eq!(
        OptimizeParams::new(CHARACTER, 1)
            .with_strategy_name("thread")
            .unwrap()
            .strategy,
        Some(StrategyKind::ThreadRebalancing)
    );
}

#[test]
fn test_strategy_options_follow_targets_and_config() {
    let params = OptimizeParams::new(CHARACTER, 1).with_target(TargetMetrics {
        cpu_reduction: Some(0.45),
        memory_reduction: Some(0.1),
    });
    let options = params.strategy_options(&KernelConfig::permissive());

    assert_eq!(options.cpu.target_reduction, 0.45);
    assert_eq!(options.memory.target_memory_reduction, 0.1);
    assert_eq!(options.hybrid.max_combined_risk, 1.0);
}
