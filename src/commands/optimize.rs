/*!
 * Optimize Process Command
 *
 * Runs one optimization strategy against a process. The strategy is either
 * named by the caller or picked by the factory from the process's current
 * metrics. Strategies mutate a working copy, which replaces the stored
 * record only once the strategy succeeded.
 */

use super::deps::{check_ids, live_process, CommandDeps};
use super::traits::Command;
use super::types::{CommandKind, CommandOutcome, OptimizationReport, OutcomeDetail};
use crate::consciousness::Consciousness;
use crate::core::config::KernelConfig;
use crate::core::errors::{CommandError, CommandResult};
use crate::core::guard::{EntityKey, SnapshotTransaction};
use crate::core::types::{CharacterId, Pid, RiskLevel};
use crate::monitoring::{CommandSpan, KernelEvent};
use crate::optimization::{
    self, infer_reasons, select_strategy, CurrentMetrics, OptimizationReason,
    OptimizationStrategy, OptimizationUndo, Optimizer, SelectionRequest, SideEffect,
    StrategyKind, StrategyOptions, TargetMetrics,
};
use crate::process::{Process, ProcessError};
use async_trait::async_trait;
use tracing::{info, warn};

/// Optimization parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeParams {
    pub character_id: CharacterId,
    pub process_id: Pid,
    /// Explicit strategy; `None` lets the factory choose
    pub strategy: Option<StrategyKind>,
    /// Reasons for the factory; inferred from the process when empty
    pub reasons: Vec<OptimizationReason>,
    pub target: TargetMetrics,
    /// Risk level for the factory (default: medium)
    pub risk_level: Option<RiskLevel>,
    pub safe_mode: bool,
}

impl OptimizeParams {
    pub fn new(character_id: impl Into<CharacterId>, process_id: Pid) -> Self {
        Self {
            character_id: character_id.into(),
            process_id,
            strategy: None,
            reasons: Vec::new(),
            target: TargetMetrics::default(),
            risk_level: None,
            safe_mode: false,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the strategy from its wire name
    pub fn with_strategy_name(self, name: &str) -> CommandResult<Self> {
        let strategy = name
            .parse::<StrategyKind>()
            .map_err(|e| CommandError::Construction(e.to_string()))?;
        Ok(self.with_strategy(strategy))
    }

    #[must_use]
    pub fn with_reasons(mut self, reasons: Vec<OptimizationReason>) -> Self {
        self.reasons = reasons;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetMetrics) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = Some(risk_level);
        self
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Strategy knobs derived from targets and configuration
    pub fn strategy_options(&self, config: &KernelConfig) -> StrategyOptions {
        let mut options = StrategyOptions::default();
        if let Some(cpu) = self.target.cpu_reduction {
            options.cpu.target_reduction = cpu;
        }
        if let Some(memory) = self.target.memory_reduction {
            options.memory.target_memory_reduction = memory;
        }
        options.hybrid.max_combined_risk = config.max_combined_risk;
        options
    }
}

#[derive(Debug, Clone)]
struct OptimizeUndo {
    strategy: OptimizationStrategy,
    undo: OptimizationUndo,
}

/// Undoable process optimization
pub struct OptimizeProcessCommand {
    params: OptimizeParams,
    deps: CommandDeps,
    undo: Option<OptimizeUndo>,
}

impl OptimizeProcessCommand {
    pub fn new(params: OptimizeParams, deps: CommandDeps) -> CommandResult<Self> {
        check_ids(&params.character_id, params.process_id)?;
        for (name, value) in [
            ("cpu_reduction", params.target.cpu_reduction),
            ("memory_reduction", params.target.memory_reduction),
        ] {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CommandError::Construction(format!(
                        "{} must be within [0, 1], got {}",
                        name, value
                    )));
                }
            }
        }
        Ok(Self {
            params,
            deps,
            undo: None,
        })
    }

    pub fn params(&self) -> &OptimizeParams {
        &self.params
    }

    fn check(&self, consciousness: &Consciousness) -> CommandResult<Process> {
        let process = live_process(consciousness, self.params.process_id)?;
        if consciousness.is_protected(&process.name) {
            return Err(CommandError::ProtectedProcess {
                pid: process.id,
                name: process.name,
            });
        }
        Ok(process)
    }

    async fn run(&mut self) -> CommandResult<CommandOutcome> {
        let consciousness = self.deps.resolve(&self.params.character_id)?;
        let pid = self.params.process_id;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Process(pid)])
            .await;

        let process = self.check(&consciousness)?;
        let ctx = consciousness.strategy_context(self.params.safe_mode);

        let (kind, selection) = match self.params.strategy {
            Some(kind) => (kind, None),
            None => {
                let reasons = if self.params.reasons.is_empty() {
                    infer_reasons(&process)
                } else {
                    self.params.reasons.clone()
                };
                let selection = select_strategy(
                    &SelectionRequest::new(reasons, CurrentMetrics::from(&process))
                        .with_risk_level(self.params.risk_level.unwrap_or_default())
                        .with_safe_mode(ctx.safe_mode)
                        .with_target(self.params.target),
                );
                info!(
                    pid,
                    strategy = %selection.strategy,
                    score = selection.score,
                    "Strategy selected"
                );
                (selection.strategy, Some(selection))
            }
        };

        let options = self.params.strategy_options(consciousness.config());
        let strategy = optimization::create(kind, &options);

        let table = consciousness.processes().clone();
        let mut tx = SnapshotTransaction::begin("optimize_process");
        {
            let table = table.clone();
            let snapshot = process.clone();
            tx.record(format!("process:{}", pid), move || table.restore_process(snapshot))?;
        }

        let mut working = process;
        let outcome = strategy.optimize(&mut working, &ctx)?;
        table.update(pid, |p| *p = working)?;
        tx.commit()?;

        let mut warnings = Vec::new();
        let mut narrative = vec!["process_optimized".to_string()];
        for effect in &outcome.side_effects {
            narrative.push(effect.tag().to_string());
            match effect {
                SideEffect::TemporaryInstability { recovery_at, .. } => warnings.push(format!(
                    "Effectiveness dip until {} while threads settle",
                    recovery_at
                )),
                SideEffect::PotentialInstability {
                    strategies_applied, ..
                } => warnings.push(format!(
                    "{} strategies applied at once; watch for instability",
                    strategies_applied
                )),
                _ => {}
            }
        }

        self.deps.emit(KernelEvent::ProcessOptimized {
            character_id: self.params.character_id.clone(),
            process_id: pid,
            strategy: kind,
            cpu_improvement: outcome.delta.cpu_improvement(),
            memory_improvement: outcome.delta.memory_improvement(),
            side_effects: outcome
                .side_effects
                .iter()
                .map(|e| e.tag().to_string())
                .collect(),
        });
        info!(
            character = %self.params.character_id,
            pid,
            strategy = %kind,
            cpu_improvement = outcome.delta.cpu_improvement(),
            memory_improvement = outcome.delta.memory_improvement(),
            "Process optimized"
        );

        self.undo = Some(OptimizeUndo {
            strategy,
            undo: outcome.undo.clone(),
        });

        Ok(CommandOutcome::new(
            CommandKind::OptimizeProcess,
            self.params.character_id.clone(),
            OutcomeDetail::Optimization(Box::new(OptimizationReport { selection, outcome })),
        )
        .with_warnings(warnings)
        .with_narrative_events(narrative))
    }

    async fn revert(&mut self) -> CommandResult<CommandOutcome> {
        let undo = self
            .undo
            .clone()
            .ok_or_else(|| CommandError::NothingToUndo(self.description()))?;
        let consciousness = self.deps.resolve(&self.params.character_id)?;
        let pid = self.params.process_id;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Process(pid)])
            .await;

        let table = consciousness.processes();
        let mut current = table.get(pid).ok_or(ProcessError::NotFound(pid))?;
        undo.strategy.revert(&mut current, &undo.undo)?;
        table.update(pid, |p| *p = current)?;
        self.undo = None;

        self.deps.emit(KernelEvent::OptimizationUndone {
            character_id: self.params.character_id.clone(),
            process_id: pid,
            strategy: undo.undo.strategy,
        });
        info!(pid, strategy = %undo.undo.strategy, "Optimization undone");

        Ok(CommandOutcome::new(
            CommandKind::OptimizeProcess,
            self.params.character_id.clone(),
            OutcomeDetail::OptimizationUndone {
                process_id: pid,
                strategy: undo.undo.strategy,
            },
        )
        .with_narrative_events(vec!["optimization_undone".into()]))
    }
}

#[async_trait]
impl Command for OptimizeProcessCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::OptimizeProcess
    }

    fn description(&self) -> String {
        let strategy = self
            .params
            .strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "auto".to_string());
        format!(
            "Optimize process {} of {} ({})",
            self.params.process_id, self.params.character_id, strategy
        )
    }

    async fn can_execute(&self) -> CommandResult<bool> {
        let consciousness = self.deps.resolve(&self.params.character_id)?;
        self.check(&consciousness)?;
        Ok(true)
    }

    async fn execute(&mut self) -> CommandResult<CommandOutcome> {
        if self.undo.is_some() {
            return Err(CommandError::AlreadyExecuted(self.description()));
        }
        let span = CommandSpan::new(
            CommandKind::OptimizeProcess.as_str(),
            "execute",
            self.params.character_id.as_str(),
        );
        let result = self.run().await;
        if let Err(e) = &result {
            warn!(trace_id = span.trace_id(), error = %e, "Optimization failed");
        }
        span.record_result(result.is_ok());
        result
    }

    async fn undo(&mut self) -> CommandResult<CommandOutcome> {
        let span = CommandSpan::new(
            CommandKind::OptimizeProcess.as_str(),
            "undo",
            self.params.character_id.as_str(),
        );
        let result = self.revert().await;
        span.record_result(result.is_ok());
        result
    }

    fn can_undo(&self) -> bool {
        self.undo.is_some()
    }
}
