/*!
 * Optimization Module
 * Resource optimization strategies and heuristic strategy selection
 */

pub mod consolidation;
pub mod cpu;
pub mod factory;
pub mod hybrid;
pub mod threads;
pub mod traits;
pub mod types;

pub use consolidation::MemoryConsolidationStrategy;
pub use cpu::CpuThrottlingStrategy;
pub use factory::{
    create, infer_reasons, select_strategy, CurrentMetrics, OptimizationReason, RiskReport,
    ScoredStrategy, SelectionRequest, StrategySelection, TargetMetrics,
};
pub use hybrid::HybridOptimizationStrategy;
pub use threads::ThreadRebalancingStrategy;
pub use traits::Optimizer;
pub use types::*;

use crate::process::Process;

/// Closed set of strategy variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizationStrategy {
    CpuThrottling(CpuThrottlingStrategy),
    MemoryConsolidation(MemoryConsolidationStrategy),
    ThreadRebalancing(ThreadRebalancingStrategy),
    Hybrid(HybridOptimizationStrategy),
}

impl OptimizationStrategy {
    fn inner(&self) -> &dyn Optimizer {
        match self {
            OptimizationStrategy::CpuThrottling(s) => s,
            OptimizationStrategy::MemoryConsolidation(s) => s,
            OptimizationStrategy::ThreadRebalancing(s) => s,
            OptimizationStrategy::Hybrid(s) => s,
        }
    }
}

impl Optimizer for OptimizationStrategy {
    fn kind(&self) -> StrategyKind {
        self.inner().kind()
    }

    fn analyze(&self, process: &Process, ctx: &StrategyContext) -> StrategyAnalysis {
        self.inner().analyze(process, ctx)
    }

    fn optimize(
        &self,
        process: &mut Process,
        ctx: &StrategyContext,
    ) -> StrategyResult<OptimizationOutcome> {
        self.inner().optimize(process, ctx)
    }

    fn revert(&self, process: &mut Process, undo: &OptimizationUndo) -> StrategyResult<()> {
        self.inner().revert(process, undo)
    }
}
