/*!
 * CPU Throttling Strategy
 *
 * Scales a process's CPU usage down by a bounded fraction. The bound
 * depends on how much the process matters: elevated priorities and
 * emotionally loaded processes in safe mode get the gentlest cap, background
 * work the most aggressive one.
 */

use super::traits::Optimizer;
use super::types::*;
use crate::core::limits::MAX_CPU_REDUCTION;
use crate::core::types::RiskLevel;
use crate::process::{Process, ProcessType};
use tracing::debug;

/// CPU usage at or below this is not worth throttling
const MIN_THROTTLE_CPU: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuThrottlingStrategy {
    options: CpuThrottlingOptions,
}

impl CpuThrottlingStrategy {
    pub fn new(options: CpuThrottlingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CpuThrottlingOptions {
        &self.options
    }

    /// Largest reduction considered safe for this process
    pub fn max_safe_reduction(process: &Process, ctx: &StrategyContext) -> f64 {
        if process.priority.is_elevated() {
            0.2
        } else if ctx.safe_mode && process.emotional_impact > 0.5 {
            0.15
        } else if process.effectiveness_score < 0.3 {
            0.3
        } else if process.kind == ProcessType::Background {
            0.6
        } else {
            0.5
        }
    }

    /// Reduction this strategy would apply
    pub fn planned_reduction(&self, process: &Process, ctx: &StrategyContext) -> f64 {
        self.options
            .target_reduction
            .min(Self::max_safe_reduction(process, ctx))
            .min(MAX_CPU_REDUCTION)
            .max(0.0)
    }

    fn risk(process: &Process, reduction: f64) -> RiskLevel {
        if process.priority.is_elevated() || process.emotional_impact > 0.7 {
            RiskLevel::High
        } else if process.emotional_impact > 0.5 || reduction > 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl Optimizer for CpuThrottlingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CpuThrottling
    }

    fn analyze(&self, process: &Process, ctx: &StrategyContext) -> StrategyAnalysis {
        if process.is_terminated() {
            return StrategyAnalysis::blocked(self.kind(), "process is terminated");
        }
        if ctx.system_unstable {
            return StrategyAnalysis::blocked(self.kind(), "system is globally unstable");
        }
        if process.cpu_usage <= MIN_THROTTLE_CPU {
            return StrategyAnalysis::blocked(
                self.kind(),
                format!(
                    "cpu usage {:.1}% is below the {:.0}% throttling threshold",
                    process.cpu_usage, MIN_THROTTLE_CPU
                ),
            );
        }

        let reduction = self.planned_reduction(process, ctx);
        let mut recommendations = vec![format!(
            "Throttle CPU by {:.0}% ({:.1}% -> {:.1}%)",
            reduction * 100.0,
            process.cpu_usage,
            process.cpu_usage * (1.0 - reduction)
        )];
        if reduction > 0.3 {
            recommendations.push(format!(
                "Priority will drop to {:?}",
                process.priority.lowered()
            ));
        }
        if process.emotional_impact > 0.5 {
            recommendations.push("Expect muted emotional responses while throttled".to_string());
        }

        StrategyAnalysis {
            strategy: self.kind(),
            can_optimize: true,
            risk_level: Self::risk(process, reduction),
            estimated_reduction: reduction * 100.0,
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
        let reduction = self.planned_reduction(process, ctx);
        let mut side_effects = Vec::new();

        process.cpu_usage *= 1.0 - reduction;

        if reduction > 0.3 {
            let lowered = process.priority.lowered();
            if lowered != process.priority {
                side_effects.push(SideEffect::PriorityLowered {
                    from: process.priority,
                    to: lowered,
                });
                process.priority = lowered;
            }
            if process.emotional_impact > 0.5 {
                side_effects.push(SideEffect::EmotionalDampening {
                    intensity: process.emotional_impact * reduction,
                });
            }
        }

        process.optimization_level += 1;
        process.last_activity = ctx.now;

        debug!(
            pid = process.id,
            reduction,
            cpu_before = before.cpu_usage,
            cpu_after = process.cpu_usage,
            "CPU throttled"
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
