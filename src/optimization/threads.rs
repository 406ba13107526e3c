/*!
 * Thread Rebalancing Strategy
 * Moves a process toward the thread count its CPU load justifies
 */

use super::traits::Optimizer;
use super::types::*;
use crate::core::limits::{CPU_PER_THREAD, MAX_THREADS, MIN_THREADS};
use crate::core::types::{clamp_unit, RiskLevel};
use crate::process::{Process, ProcessType, ScheduledRecovery};
use tracing::{debug, warn};

/// Thread changes larger than this destabilize the process for a while
const DISRUPTIVE_THREAD_DELTA: i64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreadRebalancingStrategy {
    options: ThreadRebalancingOptions,
}

impl ThreadRebalancingStrategy {
    pub fn new(options: ThreadRebalancingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ThreadRebalancingOptions {
        &self.options
    }

    /// Thread count the process's load and type call for
    pub fn optimal_thread_count(process: &Process) -> u32 {
        let mut optimal = (process.cpu_usage / CPU_PER_THREAD).ceil() as i64;

        match process.kind {
            ProcessType::EmotionalProcessing => optimal = optimal.min(4),
            ProcessType::Background => optimal -= 1,
            ProcessType::MemorySearch => optimal = (optimal + 1).min(6),
            _ => {}
        }

        if process.emotional_impact > 0.7 {
            optimal = optimal.min(3);
        }

        optimal.clamp(MIN_THREADS as i64, MAX_THREADS as i64) as u32
    }

    /// CPU usage after moving from `from` to `to` threads
    pub fn rebalanced_cpu(cpu: f64, from: u32, to: u32) -> f64 {
        let ratio = to as f64 / from.max(1) as f64;
        let mut cpu = cpu * ratio.powf(0.8);
        if to < from {
            cpu *= 0.95;
        }
        cpu.clamp(0.0, 100.0)
    }
}

impl Optimizer for ThreadRebalancingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ThreadRebalancing
    }

    fn analyze(&self, process: &Process, _ctx: &StrategyContext) -> StrategyAnalysis {
        if process.is_terminated() {
            return StrategyAnalysis::blocked(self.kind(), "process is terminated");
        }

        let optimal = Self::optimal_thread_count(process);
        if optimal == process.thread_count {
            return StrategyAnalysis::blocked(
                self.kind(),
                format!("thread count {} is already optimal", optimal),
            );
        }

        let delta = optimal as i64 - process.thread_count as i64;
        let new_cpu = Self::rebalanced_cpu(process.cpu_usage, process.thread_count, optimal);
        let estimated = if process.cpu_usage > 0.0 {
            (process.cpu_usage - new_cpu) / process.cpu_usage * 100.0
        } else {
            0.0
        };

        let mut recommendations = vec![format!(
            "Rebalance threads {} -> {}",
            process.thread_count, optimal
        )];
        let risk_level = if delta.abs() > DISRUPTIVE_THREAD_DELTA {
            recommendations.push("Large rebalance; effectiveness dips until it settles".to_string());
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
        let optimal = Self::optimal_thread_count(process);
        let delta = optimal as i64 - process.thread_count as i64;

        process.cpu_usage = Self::rebalanced_cpu(process.cpu_usage, process.thread_count, optimal);
        process.thread_count = optimal;
        process.optimization_level += 1;
        process.last_activity = ctx.now;

        let mut side_effects = Vec::new();
        if delta.abs() > DISRUPTIVE_THREAD_DELTA {
            let dip = self.options.instability_dip;
            let recovery_at = ctx.now + self.options.recovery_delay_ms;
            process.effectiveness_score = clamp_unit(process.effectiveness_score - dip);
            process.pending_recovery = Some(ScheduledRecovery {
                amount: dip,
                due_at: recovery_at,
            });
            side_effects.push(SideEffect::TemporaryInstability {
                thread_delta: delta,
                effectiveness_dip: dip,
                recovery_at,
            });
            warn!(pid = process.id, thread_delta = delta, "Large thread rebalance");
        }

        debug!(
            pid = process.id,
            threads_before = before.thread_count,
            threads_after = process.thread_count,
            cpu_after = process.cpu_usage,
            "Threads rebalanced"
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
