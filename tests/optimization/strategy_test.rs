/*!
 * Strategy Tests
 * Behavior shared by every strategy variant and the hybrid risk gate
 */

use mind_kernel::core::RiskLevel;
use mind_kernel::optimization::{
    create, HybridOptimizationStrategy, Optimizer, SideEffect, StrategyContext, StrategyError,
    StrategyKind, StrategyOptions,
};
use mind_kernel::process::{Process, ProcessPriority, ProcessSpec, ProcessTable, ProcessType};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn process(spec: ProcessSpec) -> Process {
    let table = ProcessTable::new();
    let pid = table.create_base_process(spec);
    table.get(pid).unwrap()
}

/// Critical, emotionally loaded, and failing: every risk term fires
fn fragile() -> Process {
    process(
        ProcessSpec::new("panic", ProcessType::EmotionalProcessing)
            .with_priority(ProcessPriority::Critical)
            .with_resources(90.0, 400.0, 1)
            .with_emotional_impact(0.9)
            .with_effectiveness(0.2),
    )
}

fn kind_strategy() -> impl Strategy<Value = StrategyKind> {
    prop::sample::select(StrategyKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn revert_restores_original(
        kind in kind_strategy(),
        cpu in 0.0f64..100.0,
        memory in 0.0f64..1000.0,
        threads in 1u32..10,
        impact in 0.0f64..1.0,
    ) {
        let original = process(
            ProcessSpec::new("subject", ProcessType::Cognitive)
                .with_resources(cpu, memory, threads)
                .with_emotional_impact(impact),
        );
        let strategy = create(kind, &StrategyOptions::default());
        let ctx = StrategyContext::new(true).at(original.last_activity);

        let mut working = original.clone();
        match strategy.optimize(&mut working, &ctx) {
            Ok(outcome) => {
                prop_assert_eq!(outcome.process_id, original.id);
                strategy.revert(&mut working, &outcome.undo).unwrap();
                prop_assert_eq!(working, original);
            }
            Err(_) => prop_assert_eq!(working, original),
        }
    }
}

#[test]
fn test_terminated_blocks_every_strategy() {
    let table = ProcessTable::new();
    let pid = table.create_base_process(
        ProcessSpec::new("grief", ProcessType::Cognitive).with_resources(90.0, 600.0, 1),
    );
    table.kill(pid).unwrap();
    let dead = table.get(pid).unwrap();

    for kind in StrategyKind::ALL {
        let strategy = create(kind, &StrategyOptions::default());
        let analysis = strategy.analyze(&dead, &StrategyContext::default());
        assert!(!analysis.can_optimize, "{} should be blocked", kind);
        assert!(analysis.blocked_reason.is_some());
    }
}

#[test]
fn test_hybrid_rejects_high_risk_outside_safe_mode() {
    let strategy = create(StrategyKind::Hybrid, &StrategyOptions::default());
    let mut p = fragile();
    let before = p.clone();
    let ctx = StrategyContext::new(false).at(p.last_activity);

    let analysis = strategy.analyze(&p, &ctx);
    assert!(analysis.can_optimize);
    assert_eq!(analysis.risk_level, RiskLevel::High);

    let err = strategy.optimize(&mut p, &ctx).unwrap_err();
    assert_eq!(err, StrategyError::RiskTooHigh { risk: 1.0, limit: 0.7 });
    assert_eq!(p, before);
}

#[test]
fn test_hybrid_runs_in_safe_mode() {
    let strategy = create(StrategyKind::Hybrid, &StrategyOptions::default());
    let mut p = fragile();
    let ctx = StrategyContext::new(true).at(p.last_activity);

    let outcome = strategy.optimize(&mut p, &ctx).unwrap();
    let combined = outcome.combined.expect("hybrid reports combined improvement");

    assert_eq!(
        combined.strategies_applied,
        vec![
            StrategyKind::MemoryConsolidation,
            StrategyKind::ThreadRebalancing,
            StrategyKind::CpuThrottling,
        ]
    );
    assert_eq!(combined.combined_risk, 1.0);
    assert!(outcome
        .side_effects
        .iter()
        .any(|e| matches!(e, SideEffect::PotentialInstability { strategies_applied: 3, .. })));
    // Safe mode suppresses memory merges
    assert!(!outcome
        .side_effects
        .iter()
        .any(|e| matches!(e, SideEffect::MemoryMerge { .. })));
}

#[test]
fn test_combined_risk_grows_with_strategy_count() {
    let mut p = fragile();
    p.kind = ProcessType::Cognitive;
    p.emotional_impact = 0.0;
    p.priority = ProcessPriority::Normal;

    // Only the low-effectiveness term: 0.2 base
    let one = HybridOptimizationStrategy::combined_risk(&p, &[StrategyKind::CpuThrottling]);
    let two = HybridOptimizationStrategy::combined_risk(
        &p,
        &[StrategyKind::CpuThrottling, StrategyKind::ThreadRebalancing],
    );
    assert!((one - 0.2).abs() < 1e-9);
    assert!((two - 0.24).abs() < 1e-9);
}

#[test]
fn test_hybrid_needs_two_applicable() {
    // Quiet process: low cpu, small footprint, thread count already optimal
    let p = process(
        ProcessSpec::new("calm", ProcessType::Cognitive).with_resources(10.0, 50.0, 1),
    );
    let strategy = create(StrategyKind::Hybrid, &StrategyOptions::default());
    let ctx = StrategyContext::default().at(p.last_activity);

    let analysis = strategy.analyze(&p, &ctx);
    assert!(!analysis.can_optimize);
    assert!(matches!(
        strategy.optimize(&mut p.clone(), &ctx),
        Err(StrategyError::NotApplicable { .. })
    ));
}
