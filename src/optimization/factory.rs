/*!
 * Strategy Factory
 *
 * Scores every strategy against a selection request and builds the
 * winner. Scoring is a pure function of the request; nothing here touches
 * a process.
 */

use super::consolidation::MemoryConsolidationStrategy;
use super::cpu::CpuThrottlingStrategy;
use super::hybrid::HybridOptimizationStrategy;
use super::threads::ThreadRebalancingStrategy;
use super::types::*;
use super::OptimizationStrategy;
use crate::core::limits::FALLBACK_STRATEGY_SCORE;
use crate::core::types::RiskLevel;
use crate::process::{IssueKind, Process};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Alternatives must score above this to be listed
const ALTERNATIVE_MIN_SCORE: f64 = 5.0;

/// Why an optimization is wanted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationReason {
    MemoryFragmented,
    CpuUsageExcessive,
    ThreadContention,
    ResponseTimeDegraded,
}

impl OptimizationReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OptimizationReason::MemoryFragmented => "memory_fragmented",
            OptimizationReason::CpuUsageExcessive => "cpu_usage_excessive",
            OptimizationReason::ThreadContention => "thread_contention",
            OptimizationReason::ResponseTimeDegraded => "response_time_degraded",
        }
    }

    /// Per-strategy weights contributed by this reason
    fn weights(&self) -> &'static [(StrategyKind, f64)] {
        use StrategyKind::*;
        match self {
            OptimizationReason::MemoryFragmented => &[(MemoryConsolidation, 40.0), (Hybrid, 20.0)],
            OptimizationReason::CpuUsageExcessive => {
                &[(CpuThrottling, 40.0), (ThreadRebalancing, 10.0), (Hybrid, 20.0)]
            }
            OptimizationReason::ThreadContention => {
                &[(ThreadRebalancing, 40.0), (CpuThrottling, 10.0), (Hybrid, 20.0)]
            }
            OptimizationReason::ResponseTimeDegraded => {
                &[(CpuThrottling, 20.0), (ThreadRebalancing, 20.0), (Hybrid, 25.0)]
            }
        }
    }
}

impl fmt::Display for OptimizationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory_fragmented" => Ok(OptimizationReason::MemoryFragmented),
            "cpu_usage_excessive" => Ok(OptimizationReason::CpuUsageExcessive),
            "thread_contention" => Ok(OptimizationReason::ThreadContention),
            "response_time_degraded" => Ok(OptimizationReason::ResponseTimeDegraded),
            other => Err(format!(
                "Invalid reason '{}'. Valid: memory_fragmented, cpu_usage_excessive, thread_contention, response_time_degraded",
                other
            )),
        }
    }
}

/// Resource figures the factory scores against
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub thread_count: u32,
    pub effectiveness_score: f64,
    pub emotional_impact: f64,
}

impl From<&Process> for CurrentMetrics {
    fn from(process: &Process) -> Self {
        Self {
            cpu_usage: process.cpu_usage,
            memory_usage: process.memory_usage,
            thread_count: process.thread_count,
            effectiveness_score: process.effectiveness_score,
            emotional_impact: process.emotional_impact,
        }
    }
}

/// Desired reductions, as fractions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub cpu_reduction: Option<f64>,
    pub memory_reduction: Option<f64>,
}

/// Input to `select_strategy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub reasons: Vec<OptimizationReason>,
    pub current: CurrentMetrics,
    pub risk_level: RiskLevel,
    pub safe_mode: bool,
    pub target: TargetMetrics,
}

impl SelectionRequest {
    pub fn new(reasons: Vec<OptimizationReason>, current: CurrentMetrics) -> Self {
        Self {
            reasons,
            current,
            risk_level: RiskLevel::Medium,
            safe_mode: false,
            target: TargetMetrics::default(),
        }
    }

    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetMetrics) -> Self {
        self.target = target;
        self
    }
}

/// A strategy and its score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredStrategy {
    pub strategy: StrategyKind,
    pub score: f64,
}

/// Risks and mitigations of one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub risk_level: RiskLevel,
    pub risks: Vec<String>,
    pub mitigations: Vec<String>,
}

/// Result of `select_strategy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub strategy: StrategyKind,
    pub score: f64,
    pub reasoning: Vec<String>,
    pub alternatives: Vec<ScoredStrategy>,
    pub risk_assessment: BTreeMap<StrategyKind, RiskReport>,
}

/// Running score sheet with a log of why each score moved
struct ScoreSheet {
    scores: BTreeMap<StrategyKind, f64>,
    reasoning: Vec<String>,
}

impl ScoreSheet {
    fn new() -> Self {
        Self {
            scores: StrategyKind::ALL.iter().map(|k| (*k, 0.0)).collect(),
            reasoning: Vec::new(),
        }
    }

    fn add(&mut self, kind: StrategyKind, points: f64, why: &str) {
        *self.scores.entry(kind).or_insert(0.0) += points;
        self.reasoning.push(format!("{}: {:+} {}", why, points, kind));
    }

    fn score(&self, kind: StrategyKind) -> f64 {
        self.scores.get(&kind).copied().unwrap_or(0.0)
    }
}

/// Score every strategy and pick the best one
pub fn select_strategy(request: &SelectionRequest) -> StrategySelection {
    use StrategyKind::*;

    let mut sheet = ScoreSheet::new();
    let reasons: BTreeSet<OptimizationReason> = request.reasons.iter().copied().collect();

    for reason in &reasons {
        for (kind, weight) in reason.weights() {
            sheet.add(*kind, *weight, reason.as_str());
        }
    }

    let m = &request.current;
    if m.cpu_usage > 60.0 {
        sheet.add(CpuThrottling, 20.0, "cpu above 60%");
    }
    if m.memory_usage > 300.0 {
        sheet.add(MemoryConsolidation, 20.0, "memory above 300MB");
    }
    if m.thread_count > 6 {
        sheet.add(ThreadRebalancing, 20.0, "more than 6 threads");
    }
    if m.effectiveness_score < 0.4 && (m.cpu_usage > 60.0 || m.memory_usage > 300.0) {
        sheet.add(Hybrid, 25.0, "low effectiveness under heavy usage");
    }
    if m.emotional_impact > 0.7 {
        sheet.add(CpuThrottling, -10.0, "high emotional impact");
        sheet.add(Hybrid, -15.0, "high emotional impact");
    }

    match reasons.len() {
        0 | 1 => {}
        2 => sheet.add(Hybrid, 15.0, "two concurrent issues"),
        _ => sheet.add(Hybrid, 30.0, "three or more concurrent issues"),
    }

    if request.safe_mode {
        sheet.add(MemoryConsolidation, 10.0, "safe mode");
        sheet.add(CpuThrottling, 5.0, "safe mode");
        sheet.add(ThreadRebalancing, 5.0, "safe mode");
        sheet.add(Hybrid, -20.0, "safe mode");
    }

    match request.risk_level {
        RiskLevel::High => {
            sheet.add(MemoryConsolidation, 5.0, "high risk");
            sheet.add(CpuThrottling, -5.0, "high risk");
            sheet.add(ThreadRebalancing, -10.0, "high risk");
            sheet.add(Hybrid, -25.0, "high risk");
        }
        RiskLevel::Low => sheet.add(Hybrid, 15.0, "low risk"),
        RiskLevel::Medium => {}
    }

    if request.target.cpu_reduction.map_or(false, |r| r > 0.3) {
        sheet.add(CpuThrottling, 15.0, "cpu reduction target above 30%");
    }
    if request.target.memory_reduction.map_or(false, |r| r > 0.2) {
        sheet.add(MemoryConsolidation, 15.0, "memory reduction target above 20%");
    }

    // First maximum in ALL order wins ties
    let mut best = ScoredStrategy {
        strategy: MemoryConsolidation,
        score: f64::MIN,
    };
    for kind in StrategyKind::ALL {
        let score = sheet.score(kind);
        if score > best.score {
            best = ScoredStrategy {
                strategy: kind,
                score,
            };
        }
    }

    if best.score < FALLBACK_STRATEGY_SCORE {
        sheet.reasoning.push(format!(
            "no strategy reached {}; falling back to {}",
            FALLBACK_STRATEGY_SCORE, MemoryConsolidation
        ));
        best = ScoredStrategy {
            strategy: MemoryConsolidation,
            score: FALLBACK_STRATEGY_SCORE,
        };
    }

    let mut alternatives: Vec<ScoredStrategy> = StrategyKind::ALL
        .iter()
        .filter(|k| **k != best.strategy)
        .map(|k| ScoredStrategy {
            strategy: *k,
            score: sheet.score(*k),
        })
        .filter(|s| s.score > ALTERNATIVE_MIN_SCORE)
        .collect();
    alternatives.sort_by(|a, b| b.score.total_cmp(&a.score));

    let risk_assessment = StrategyKind::ALL
        .iter()
        .map(|k| (*k, risk_report(*k, request)))
        .collect();

    debug!(
        strategy = %best.strategy,
        score = best.score,
        alternatives = alternatives.len(),
        "Selected optimization strategy"
    );

    StrategySelection {
        strategy: best.strategy,
        score: best.score,
        reasoning: sheet.reasoning,
        alternatives,
        risk_assessment,
    }
}

fn risk_report(kind: StrategyKind, request: &SelectionRequest) -> RiskReport {
    let m = &request.current;
    let (risk_level, risks, mitigations) = match kind {
        StrategyKind::CpuThrottling => (
            if m.emotional_impact > 0.7 {
                RiskLevel::High
            } else if m.emotional_impact > 0.5 {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            },
            vec![
                "Slower responses while throttled".to_string(),
                "Emotional dampening on charged processes".to_string(),
            ],
            vec!["Cap the reduction for elevated priorities".to_string()],
        ),
        StrategyKind::MemoryConsolidation => (
            if m.emotional_impact > 0.6 && !request.safe_mode {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            },
            vec!["Emotionally charged memories may be merged".to_string()],
            vec!["Run in safe mode to suppress memory merges".to_string()],
        ),
        StrategyKind::ThreadRebalancing => (
            if m.thread_count > 6 {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            },
            vec!["Temporary instability on large thread changes".to_string()],
            vec!["Effectiveness recovers automatically after the dip".to_string()],
        ),
        StrategyKind::Hybrid => (
            if request.risk_level == RiskLevel::High || m.emotional_impact > 0.7 {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            },
            vec![
                "Compounded side effects across phases".to_string(),
                "Potential instability after three or more phases".to_string(),
            ],
            vec![
                "Combined risk gate rejects unsafe runs".to_string(),
                "Coordinated mode softens later phases".to_string(),
            ],
        ),
    };

    RiskReport {
        risk_level,
        risks,
        mitigations,
    }
}

/// Build a strategy variant
pub fn create(kind: StrategyKind, options: &StrategyOptions) -> OptimizationStrategy {
    match kind {
        StrategyKind::CpuThrottling => {
            OptimizationStrategy::CpuThrottling(CpuThrottlingStrategy::new(options.cpu))
        }
        StrategyKind::MemoryConsolidation => OptimizationStrategy::MemoryConsolidation(
            MemoryConsolidationStrategy::new(options.memory),
        ),
        StrategyKind::ThreadRebalancing => {
            OptimizationStrategy::ThreadRebalancing(ThreadRebalancingStrategy::new(options.thread))
        }
        StrategyKind::Hybrid => {
            OptimizationStrategy::Hybrid(HybridOptimizationStrategy::new(options))
        }
    }
}

/// Derive optimization reasons from a process's current state
pub fn infer_reasons(process: &Process) -> Vec<OptimizationReason> {
    let mut reasons = Vec::new();
    if process.memory_usage > 300.0 || process.has_issue(&IssueKind::Fragmentation) {
        reasons.push(OptimizationReason::MemoryFragmented);
    }
    if process.cpu_usage > 60.0 || process.has_issue(&IssueKind::HighCpu) {
        reasons.push(OptimizationReason::CpuUsageExcessive);
    }
    if process.thread_count > 6 || process.has_issue(&IssueKind::ThreadContention) {
        reasons.push(OptimizationReason::ThreadContention);
    }
    if process.effectiveness_score < 0.4 || process.has_issue(&IssueKind::Unresponsive) {
        reasons.push(OptimizationReason::ResponseTimeDegraded);
    }
    reasons
}
