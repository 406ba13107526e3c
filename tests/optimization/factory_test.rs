/*!
 * Strategy Factory Tests
 * Heuristic selection, reason inference, and risk assessment
 */

use mind_kernel::core::RiskLevel;
use mind_kernel::optimization::{
    infer_reasons, select_strategy, CurrentMetrics, OptimizationReason, SelectionRequest,
    StrategyKind, TargetMetrics,
};
use mind_kernel::process::{IssueKind, IssueSeverity, ProcessIssue, ProcessSpec, ProcessTable, ProcessType};
use pretty_assertions::assert_eq;

fn metrics(cpu: f64, memory: f64, threads: u32, effectiveness: f64, impact: f64) -> CurrentMetrics {
    CurrentMetrics {
        cpu_usage: cpu,
        memory_usage: memory,
        thread_count: threads,
        effectiveness_score: effectiveness,
        emotional_impact: impact,
    }
}

#[test]
fn test_heavy_cpu_picks_throttling() {
    let request = SelectionRequest::new(
        vec![OptimizationReason::CpuUsageExcessive],
        metrics(85.0, 100.0, 2, 0.7, 0.2),
    );
    let selection = select_strategy(&request);

    // 40 from the reason, 20 from cpu above 60
    assert_eq!(selection.strategy, StrategyKind::CpuThrottling);
    assert_eq!(selection.score, 60.0);
    let alternatives: Vec<StrategyKind> =
        selection.alternatives.iter().map(|s| s.strategy).collect();
    assert_eq!(
        alternatives,
        vec![StrategyKind::Hybrid, StrategyKind::ThreadRebalancing]
    );
}

#[test]
fn test_emotional_impact_steers_away_from_cpu() {
    let request = SelectionRequest::new(
        vec![OptimizationReason::CpuUsageExcessive],
        metrics(85.0, 100.0, 2, 0.7, 0.9),
    );
    let selection = select_strategy(&request);

    // Throttling still wins at 50, but its risk report is high
    assert_eq!(selection.strategy, StrategyKind::CpuThrottling);
    assert_eq!(selection.score, 50.0);
    assert_eq!(
        selection.risk_assessment[&StrategyKind::CpuThrottling].risk_level,
        RiskLevel::High
    );
    assert_eq!(
        selection.risk_assessment[&StrategyKind::Hybrid].risk_level,
        RiskLevel::High
    );
}

#[test]
fn test_memory_target_tips_selection() {
    let base = SelectionRequest::new(
        vec![OptimizationReason::ThreadContention],
        metrics(30.0, 350.0, 2, 0.7, 0.2),
    );
    // Threads 40 vs memory 20
    assert_eq!(select_strategy(&base).strategy, StrategyKind::ThreadRebalancing);

    let targeted = base.clone().with_target(TargetMetrics {
        cpu_reduction: None,
        memory_reduction: Some(0.4),
    });
    let selection = select_strategy(&targeted);
    // Memory 20 + 15 still trails threads at 40
    assert_eq!(selection.strategy, StrategyKind::ThreadRebalancing);
    assert!(selection
        .alternatives
        .iter()
        .any(|s| s.strategy == StrategyKind::MemoryConsolidation && s.score == 35.0));
}

#[test]
fn test_reasoning_explains_every_score() {
    let request = SelectionRequest::new(
        vec![
            OptimizationReason::MemoryFragmented,
            OptimizationReason::ResponseTimeDegraded,
        ],
        metrics(30.0, 100.0, 2, 0.7, 0.2),
    );
    let selection = select_strategy(&request);

    // Hybrid: 20 + 25 + 15 for two concurrent issues
    assert_eq!(selection.strategy, StrategyKind::Hybrid);
    assert_eq!(selection.score, 60.0);
    assert!(selection
        .reasoning
        .iter()
        .any(|line| line.contains("two concurrent issues")));
}

#[test]
fn test_alternatives_are_sorted_and_exclude_winner() {
    let request = SelectionRequest::new(
        vec![
            OptimizationReason::CpuUsageExcessive,
            OptimizationReason::ThreadContention,
        ],
        metrics(70.0, 100.0, 8, 0.7, 0.2),
    );
    let selection = select_strategy(&request);

    assert!(selection
        .alternatives
        .iter()
        .all(|s| s.strategy != selection.strategy));
    assert!(selection
        .alternatives
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_infer_reasons_from_process() {
    let table = ProcessTable::new();
    let pid = table.create_base_process(
        ProcessSpec::new("spiral", ProcessType::EmotionalProcessing)
            .with_resources(75.0, 420.0, 8)
            .with_effectiveness(0.3),
    );
    let process = table.get(pid).unwrap();

    assert_eq!(
        infer_reasons(&process),
        vec![
            OptimizationReason::MemoryFragmented,
            OptimizationReason::CpuUsageExcessive,
            OptimizationReason::ThreadContention,
            OptimizationReason::ResponseTimeDegraded,
        ]
    );

    let quiet = table.create_base_process(ProcessSpec::new("calm", ProcessType::Background));
    table
        .update(quiet, |p| {
            p.current_issues
                .push(ProcessIssue::new(IssueKind::HighCpu, IssueSeverity::Low))
        })
        .unwrap();
    assert_eq!(
        infer_reasons(&table.get(quiet).unwrap()),
        vec![OptimizationReason::CpuUsageExcessive]
    );
}
