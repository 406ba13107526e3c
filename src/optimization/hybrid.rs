/*!
 * Hybrid Optimization Strategy
 *
 * Runs several single strategies against one process. In coordinated
 * mode the phases run memory, thread, cpu, each re-analyzing the process
 * left by the previous phase, and the CPU target is softened when earlier
 * phases already improved things.
 */

use super::consolidation::MemoryConsolidationStrategy;
use super::cpu::CpuThrottlingStrategy;
use super::threads::ThreadRebalancingStrategy;
use super::traits::Optimizer;
use super::types::*;
use crate::core::types::{clamp_unit, RiskLevel};
use crate::process::{Process, ProcessPriority};
use tracing::{debug, info, warn};

/// Sub-strategies a hybrid needs before it applies
const MIN_APPLICABLE: usize = 2;

/// Phase order in coordinated mode
const COORDINATED_ORDER: [StrategyKind; 3] = [
    StrategyKind::MemoryConsolidation,
    StrategyKind::ThreadRebalancing,
    StrategyKind::CpuThrottling,
];

/// Phase order otherwise
const SEQUENTIAL_ORDER: [StrategyKind; 3] = [
    StrategyKind::CpuThrottling,
    StrategyKind::MemoryConsolidation,
    StrategyKind::ThreadRebalancing,
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HybridOptimizationStrategy {
    options: HybridOptions,
    cpu: CpuThrottlingStrategy,
    memory: MemoryConsolidationStrategy,
    threads: ThreadRebalancingStrategy,
}

impl HybridOptimizationStrategy {
    pub fn new(options: &StrategyOptions) -> Self {
        Self {
            options: options.hybrid,
            cpu: CpuThrottlingStrategy::new(options.cpu),
            memory: MemoryConsolidationStrategy::new(options.memory),
            threads: ThreadRebalancingStrategy::new(options.thread),
        }
    }

    pub fn options(&self) -> &HybridOptions {
        &self.options
    }

    fn sub_analyses(&self, process: &Process, ctx: &StrategyContext) -> Vec<StrategyAnalysis> {
        vec![
            self.cpu.analyze(process, ctx),
            self.memory.analyze(process, ctx),
            self.threads.analyze(process, ctx),
        ]
    }

    /// Sub-strategies that currently apply to the process
    pub fn applicable(&self, process: &Process, ctx: &StrategyContext) -> Vec<StrategyKind> {
        self.sub_analyses(process, ctx)
            .into_iter()
            .filter(|a| a.can_optimize)
            .map(|a| a.strategy)
            .collect()
    }

    /// Risk of applying `strategies` together, in `[0, 1]`
    pub fn combined_risk(process: &Process, strategies: &[StrategyKind]) -> f64 {
        let mut base = 0.0;
        if process.emotional_impact > 0.7 {
            base += 0.3;
        }
        if process.priority == ProcessPriority::Critical {
            base += 0.2;
        }
        if process.effectiveness_score < 0.3 {
            base += 0.2;
        }

        let n = strategies.len().max(1) as f64;
        let mut risk = base * (1.0 + (n - 1.0) * 0.2);

        let touches_memory = strategies.contains(&StrategyKind::MemoryConsolidation);
        let touches_cpu = strategies.contains(&StrategyKind::CpuThrottling);
        if touches_memory && touches_cpu && process.kind.is_emotional() {
            risk += 0.15;
        }

        clamp_unit(risk)
    }

    fn gate(&self, process: &Process, risk: f64, ctx: &StrategyContext) -> StrategyResult<()> {
        if risk > self.options.max_combined_risk && !ctx.safe_mode {
            warn!(
                pid = process.id,
                risk,
                limit = self.options.max_combined_risk,
                "Hybrid optimization rejected"
            );
            return Err(StrategyError::RiskTooHigh {
                risk,
                limit: self.options.max_combined_risk,
            });
        }
        Ok(())
    }

    /// CPU phase strategy, softened by what earlier phases achieved
    fn cpu_phase(&self, original: &Process, current: &Process) -> CpuThrottlingStrategy {
        let so_far = ResourceDelta::between(original, current);
        let improvement = (so_far.cpu_improvement() + so_far.memory_improvement()) / 2.0;

        let factor = if improvement > 20.0 {
            0.8
        } else if improvement > 0.0 {
            0.9
        } else {
            1.0
        };

        let mut options = *self.cpu.options();
        options.target_reduction *= factor;
        CpuThrottlingStrategy::new(options)
    }

    fn run_phase(
        &self,
        kind: StrategyKind,
        original: &Process,
        process: &mut Process,
        ctx: &StrategyContext,
    ) -> StrategyResult<Option<OptimizationOutcome>> {
        let adjusted;
        let strategy: &dyn Optimizer = match kind {
            StrategyKind::CpuThrottling if self.options.coordinated => {
                adjusted = self.cpu_phase(original, process);
                &adjusted
            }
            StrategyKind::CpuThrottling => &self.cpu,
            StrategyKind::MemoryConsolidation => &self.memory,
            StrategyKind::ThreadRebalancing => &self.threads,
            StrategyKind::Hybrid => return Ok(None),
        };

        // Earlier phases may have made this one pointless
        if !strategy.analyze(process, ctx).can_optimize {
            debug!(pid = process.id, phase = %kind, "Skipping phase");
            return Ok(None);
        }

        strategy.optimize(process, ctx).map(Some)
    }
}

impl Optimizer for HybridOptimizationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    fn analyze(&self, process: &Process, ctx: &StrategyContext) -> StrategyAnalysis {
        if process.is_terminated() {
            return StrategyAnalysis::blocked(self.kind(), "process is terminated");
        }

        let analyses = self.sub_analyses(process, ctx);
        let applicable: Vec<&StrategyAnalysis> =
            analyses.iter().filter(|a| a.can_optimize).collect();

        if applicable.len() < MIN_APPLICABLE {
            return StrategyAnalysis::blocked(
                self.kind(),
                format!(
                    "only {} sub-strategies apply, {} required",
                    applicable.len(),
                    MIN_APPLICABLE
                ),
            );
        }

        let kinds: Vec<StrategyKind> = applicable.iter().map(|a| a.strategy).collect();
        let risk = Self::combined_risk(process, &kinds);

        let mut recommendations: Vec<String> = applicable
            .iter()
            .flat_map(|a| a.recommendations.iter().cloned())
            .collect();
        if risk > self.options.max_combined_risk && !ctx.safe_mode {
            recommendations.push(format!(
                "Combined risk {:.2} exceeds {:.2}; enable safe mode to proceed",
                risk, self.options.max_combined_risk
            ));
        }

        let estimated = applicable.iter().map(|a| a.estimated_reduction).sum::<f64>()
            / applicable.len() as f64;

        StrategyAnalysis {
            strategy: self.kind(),
            can_optimize: true,
            risk_level: RiskLevel::from_score(risk),
            estimated_reduction: estimated,
            recommendations,
            blocked_reason: None,
        }
    }

    fn optimize(
        &self,
        process: &mut Process,
        ctx: &StrategyContext,
    ) -> StrategyResult<OptimizationOutcome> {
        let analysis = self.analyze(process, ctx);
        if !analysis.can_optimize {
            return Err(analysis.not_applicable(process.id));
        }

        let applicable = self.applicable(process, ctx);
        let risk = Self::combined_risk(process, &applicable);
        self.gate(process, risk, ctx)?;

        let before = process.clone();
        let order = if self.options.coordinated {
            COORDINATED_ORDER
        } else {
            SEQUENTIAL_ORDER
        };

        let mut phases = Vec::new();
        let mut side_effects = Vec::new();
        for kind in order {
            if !applicable.contains(&kind) {
                continue;
            }
            if let Some(outcome) = self.run_phase(kind, &before, process, ctx)? {
                side_effects.extend(outcome.side_effects.iter().cloned());
                phases.push(PhaseOutcome {
                    strategy: kind,
                    delta: outcome.delta,
                    side_effects: outcome.side_effects,
                });
            }
        }

        let delta = ResourceDelta::between(&before, process);
        let cpu_improvement = delta.cpu_improvement();
        let memory_improvement = delta.memory_improvement();
        let overall_improvement = (cpu_improvement + memory_improvement) / 2.0;
        let strategies_applied: Vec<StrategyKind> = phases.iter().map(|p| p.strategy).collect();

        if strategies_applied.len() >= 3 || overall_improvement > 40.0 {
            side_effects.push(SideEffect::PotentialInstability {
                strategies_applied: strategies_applied.len(),
                overall_improvement,
            });
        }

        info!(
            pid = process.id,
            phases = strategies_applied.len(),
            overall_improvement,
            combined_risk = risk,
            "Hybrid optimization applied"
        );

        Ok(OptimizationOutcome {
            success: true,
            strategy: self.kind(),
            process_id: process.id,
            delta,
            side_effects,
            phases,
            combined: Some(CombinedImprovement {
                cpu_improvement,
                memory_improvement,
                thread_change: delta.thread_delta(),
                overall_improvement,
                combined_risk: risk,
                strategies_applied,
            }),
            undo: OptimizationUndo {
                strategy: self.kind(),
                process_snapshot: Some(before),
                applied_at: ctx.now,
            },
        })
    }
}
