/*!
 * Optimization Traits
 * Common contract shared by every strategy variant
 */

use super::types::*;
use crate::process::Process;

/// Analyze, apply, and revert one resource optimization on a process
pub trait Optimizer: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Inspect a process without touching it
    fn analyze(&self, process: &Process, ctx: &StrategyContext) -> StrategyAnalysis;

    /// Apply the optimization in place
    ///
    /// Fails with `StrategyError::NotApplicable` when `analyze` would report
    /// `can_optimize == false`; the process is untouched in that case.
    fn optimize(
        &self,
        process: &mut Process,
        ctx: &StrategyContext,
    ) -> StrategyResult<OptimizationOutcome>;

    /// Restore a process from the snapshot recorded by `optimize`
    fn revert(&self, process: &mut Process, undo: &OptimizationUndo) -> StrategyResult<()> {
        let snapshot = undo
            .process_snapshot
            .as_ref()
            .ok_or(StrategyError::MissingSnapshot(self.kind()))?;

        if snapshot.id != process.id {
            return Err(StrategyError::SnapshotMismatch {
                expected: process.id,
                found: snapshot.id,
            });
        }

        *process = snapshot.clone();
        Ok(())
    }
}
