/*!
 * Memory Consolidation Strategy
 *
 * Compacts a process's working memory. Eligibility comes from a
 * process-local fragmentation estimate that grows with memory footprint,
 * lifetime and idle time, and shrinks with every previous optimization.
 */

use super::traits::Optimizer;
use super::types::*;
use crate::core::types::{clamp_unit, Pid, RiskLevel, Timestamp};
use crate::process::Process;
use tracing::debug;

/// Local fragmentation a process needs before consolidation pays off
const MIN_LOCAL_FRAGMENTATION: f64 = 20.0;

/// Effectiveness gained from a consolidation
const EFFECTIVENESS_GAIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryConsolidationStrategy {
    options: MemoryConsolidationOptions,
}

impl MemoryConsolidationStrategy {
    pub fn new(options: MemoryConsolidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MemoryConsolidationOptions {
        &self.options
    }

    /// Process-local fragmentation estimate, floored at zero
    pub fn local_fragmentation(process: &Process, now: Timestamp) -> f64 {
        let footprint = (process.memory_usage / 10.0).min(50.0);
        let age = (process.lifetime_ms as f64 / 1000.0).min(20.0);
        let idle = now.saturating_sub(process.last_activity) as f64 / 10_000.0;
        let relief = process.optimization_level as f64 * 5.0;

        (footprint + age + idle - relief).max(0.0)
    }

    /// Percent of memory a consolidation is expected to recover
    pub fn estimated_reduction(fragmentation: f64) -> f64 {
        (fragmentation * 0.5).min(50.0)
    }

    fn planned_reduction(&self, fragmentation: f64) -> f64 {
        self.options
            .target_memory_reduction
            .min(Self::estimated_reduction(fragmentation) / 100.0)
            .max(0.0)
    }

    fn emits_merge(process: &Process, ctx: &StrategyContext) -> bool {
        process.emotional_impact > 0.6 && !ctx.safe_mode
    }

    fn merge_effect(process: &Process, fragmentation: f64, reduction: f64, now: Timestamp) -> SideEffect {
        let fragments = ((fragmentation / 10.0).ceil() as usize).clamp(2, 8);
        let affected_memories = (0..fragments).map(|i| memory_id(process.id, i)).collect();

        SideEffect::MemoryMerge {
            affected_memories,
            merged_memory: MergedMemory {
                id: format!("merged_{}_{}", process.id, now),
                emotion: process.emotion_source.kind.clone(),
                combined_intensity: clamp_unit(process.emotion_source.intensity * (1.0 + reduction)),
                fragments,
            },
        }
    }
}

fn memory_id(pid: Pid, index: usize) -> String {
    format!("mem_{}_{}", pid, index)
}

impl Optimizer for MemoryConsolidationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MemoryConsolidation
    }

    fn analyze(&self, process: &Process, ctx: &StrategyContext) -> StrategyAnalysis {
        if process.is_terminated() {
            return StrategyAnalysis::blocked(self.kind(), "process is terminated");
        }

        let fragmentation = Self::local_fragmentation(process, ctx.now);
        if fragmentation <= MIN_LOCAL_FRAGMENTATION {
            return StrategyAnalysis::blocked(
                self.kind(),
                format!(
                    "local fragmentation {:.1} is below {:.0}",
                    fragmentation, MIN_LOCAL_FRAGMENTATION
                ),
            );
        }

        let estimated = Self::estimated_reduction(fragmentation);
        let mut recommendations = vec![format!(
            "Consolidate memory fragments (fragmentation {:.1})",
            fragmentation
        )];
        if Self::emits_merge(process, ctx) {
            recommendations.push("Emotionally charged memories will be merged".to_string());
        }

        let risk_level = if process.emotional_impact > 0.8 {
            RiskLevel::High
        } else if process.emotional_impact > 0.6 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        StrategyAnalysis {
            strategy: self.kind(),
            can_optimize: true,
            risk_level,
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

        let before = process.clone();
        let fragmentation = Self::local_fragmentation(process, ctx.now);
        let reduction = self.planned_reduction(fragmentation);

        process.memory_usage *= 1.0 - reduction;
        process.effectiveness_score = clamp_unit(process.effectiveness_score + EFFECTIVENESS_GAIN);
        process.optimization_level += 1;
        process.last_activity = ctx.now;

        let mut side_effects = Vec::new();
        if Self::emits_merge(&before, ctx) {
            side_effects.push(Self::merge_effect(&before, fragmentation, reduction, ctx.now));
        }

        debug!(
            pid = process.id,
            fragmentation,
            reduction,
            memory_before = before.memory_usage,
            memory_after = process.memory_usage,
            "Memory consolidated"
        );

        Ok(OptimizationOutcome::single(
            self.kind(),
            before,
            process,
            side_effects,
            ctx.now,
        ))
    }
}
