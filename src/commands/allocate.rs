/*!
 * Allocate Memory Command
 *
 * Rounds the request to a block, scales it by the strategy's efficiency,
 * commits one segment and spreads the memory across the target and, for
 * the distributed and emergency strategies, its partner processes.
 *
 * Undo restores the whole allocator snapshot plus every process record the
 * execution touched.
 */

use super::deps::{check_ids, live_process, CommandDeps};
use super::traits::Command;
use super::types::{
    AllocationImpact, AllocationReport, CommandKind, CommandOutcome, OutcomeDetail,
    ProcessMemoryDelta,
};
use crate::consciousness::Consciousness;
use crate::core::errors::{CommandError, CommandResult};
use crate::core::guard::{EntityKey, SnapshotTransaction};
use crate::core::limits::{ATTENTION_SHIFT_PERCENT, DEFAULT_ALIGNMENT, MIN_BLOCK_SIZE};
use crate::core::types::{CharacterId, Megabytes, Pid, SegmentId};
use crate::memory::{
    calculator, AllocationPriority, AllocationStrategy, AllocatorSnapshot, AllocatorView,
    BlockSizeOptions, MemoryError, MemoryPressure, SegmentRequest, ValidationOptions,
};
use crate::monitoring::{CommandSpan, KernelEvent};
use crate::process::Process;
use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Share of a distributed allocation handed to related processes
const DISTRIBUTED_SHARE: f64 = 0.3;
const MAX_RECIPIENTS: usize = 2;

/// Largest share of a donor's memory an emergency allocation reclaims
const EMERGENCY_RECLAIM_SHARE: f64 = 0.3;

/// Allocation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AllocateParams {
    pub character_id: CharacterId,
    pub process_id: Pid,
    pub size: Megabytes,
    pub strategy: AllocationStrategy,
    pub priority: AllocationPriority,
    /// Milliseconds; 0 means permanent
    pub duration: u64,
    /// Skip reserve validation and the fragmentation ceiling
    pub force: bool,
}

impl AllocateParams {
    pub fn new(character_id: impl Into<CharacterId>, process_id: Pid, size: Megabytes) -> Self {
        Self {
            character_id: character_id.into(),
            process_id,
            size,
            strategy: AllocationStrategy::Focused,
            priority: AllocationPriority::Normal,
            duration: 0,
            force: false,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the strategy from its wire name
    pub fn with_strategy_name(self, name: &str) -> CommandResult<Self> {
        let strategy = name
            .parse::<AllocationStrategy>()
            .map_err(|e| CommandError::Construction(e.to_string()))?;
        Ok(self.with_strategy(strategy))
    }

    #[must_use]
    pub fn with_priority(mut self, priority: AllocationPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Share of the block a strategy actually delivers
pub fn strategy_efficiency(strategy: AllocationStrategy, process: &Process) -> f64 {
    match strategy {
        AllocationStrategy::Focused => 0.9,
        AllocationStrategy::Distributed => 0.7,
        AllocationStrategy::Dynamic => {
            let mut efficiency = 0.8;
            if process.effectiveness_score > 0.8 {
                efficiency += 0.1;
            }
            if process.emotional_impact > 0.7 {
                efficiency -= 0.1;
            }
            efficiency
        }
        AllocationStrategy::Emergency => 0.6,
    }
}

/// Up to two live processes related to the target, in pid order
pub fn related_processes(processes: &[Process], target: &Process) -> Vec<Process> {
    processes
        .iter()
        .filter(|p| !p.is_terminated() && target.is_related_to(p))
        .take(MAX_RECIPIENTS)
        .cloned()
        .collect()
}

/// Processes memory may be reclaimed from, weakest first
pub fn emergency_donors(
    processes: &[Process],
    target: &Process,
    is_critical: impl Fn(&str) -> bool,
) -> Vec<Process> {
    let mut donors: Vec<Process> = processes
        .iter()
        .filter(|p| {
            p.id != target.id
                && !p.is_terminated()
                && !is_critical(&p.name)
                && p.emotional_impact <= 0.8
                && p.memory_usage >= 100.0
                && (p.effectiveness_score < 0.6 || p.memory_usage > 500.0)
        })
        .cloned()
        .collect();

    donors.sort_by(|a, b| {
        let rank = |p: &Process| p.effectiveness_score + p.memory_usage / 1000.0;
        rank(a).total_cmp(&rank(b))
    });
    donors
}

#[derive(Debug, Clone)]
struct AllocationUndo {
    allocator: AllocatorSnapshot,
    processes: Vec<Process>,
    segment_id: SegmentId,
    size: Megabytes,
}

#[derive(Debug, Default)]
struct Distribution {
    deltas: Vec<ProcessMemoryDelta>,
    warnings: Vec<String>,
    narrative: Vec<String>,
}

/// Guarded, undoable memory allocation
pub struct AllocateMemoryCommand {
    params: AllocateParams,
    deps: CommandDeps,
    undo: Option<AllocationUndo>,
}

impl AllocateMemoryCommand {
    pub fn new(params: AllocateParams, deps: CommandDeps) -> CommandResult<Self> {
        check_ids(&params.character_id, params.process_id)?;
        if params.size == 0 {
            return Err(CommandError::Construction("size must be greater than 0".into()));
        }
        Ok(Self {
            params,
            deps,
            undo: None,
        })
    }

    pub fn params(&self) -> &AllocateParams {
        &self.params
    }

    /// Preconditions, evaluated against current state
    fn check(&self, consciousness: &Consciousness) -> CommandResult<Process> {
        let process = live_process(consciousness, self.params.process_id)?;
        let config = consciousness.config();
        let size = self.params.size;

        if size < MIN_BLOCK_SIZE {
            return Err(MemoryError::BelowMinimum {
                size,
                minimum: MIN_BLOCK_SIZE,
            }
            .into());
        }
        let maximum = config.max_allocation();
        if size as f64 > maximum {
            return Err(MemoryError::ExceedsMaximum { size, maximum }.into());
        }

        if self.params.force {
            return Ok(process);
        }

        let memory = consciousness.memory();
        let capacity = memory.capacity();
        calculator::validate_allocation(
            size,
            capacity.available,
            &ValidationOptions {
                min_reserve: config.min_reserve,
                max_allocation_percent: config.max_allocation_percent,
                total_memory: capacity.total,
            },
        )?;

        let sizes = memory.segment_sizes();
        let predicted = calculator::predict_fragmentation(
            size,
            self.params.strategy,
            &AllocatorView {
                segment_sizes: &sizes,
                total_memory: capacity.total,
            },
        );
        if predicted > config.max_predicted_fragmentation {
            return Err(MemoryError::FragmentationLimit {
                predicted,
                limit: config.max_predicted_fragmentation,
            }
            .into());
        }

        Ok(process)
    }

    /// Recipients or donors the strategy would touch
    fn partners(&self, consciousness: &Consciousness, target: &Process) -> Vec<Process> {
        let processes = consciousness.processes().list();
        match self.params.strategy {
            AllocationStrategy::Distributed => related_processes(&processes, target),
            AllocationStrategy::Emergency => {
                emergency_donors(&processes, target, |name| consciousness.is_protected(name))
            }
            AllocationStrategy::Focused | AllocationStrategy::Dynamic => Vec::new(),
        }
    }

    fn distribute(
        &self,
        consciousness: &Consciousness,
        target: &Process,
        partners: &[Process],
        actual: Megabytes,
    ) -> CommandResult<Distribution> {
        let processes = consciousness.processes();
        let mut out = Distribution::default();
        let actual = actual as f64;
        let mut target_gain = actual;

        match self.params.strategy {
            AllocationStrategy::Focused => {}
            AllocationStrategy::Dynamic => {
                processes.update(target.id, |p| p.adaptive = true)?;
                out.narrative.push("adaptive_allocation".into());
            }
            AllocationStrategy::Distributed => {
                if partners.is_empty() {
                    out.warnings
                        .push("No related processes; distributed allocation went to the target".into());
                } else {
                    let shared = actual * DISTRIBUTED_SHARE;
                    let each = shared / partners.len() as f64;
                    for partner in partners {
                        processes.update(partner.id, |p| p.memory_usage += each)?;
                        out.deltas.push(ProcessMemoryDelta {
                            process_id: partner.id,
                            name: partner.name.clone(),
                            delta: each,
                        });
                    }
                    target_gain -= shared;
                    out.narrative.push("memory_shared".into());
                }
            }
            AllocationStrategy::Emergency => {
                let mut needed = actual;
                for donor in partners {
                    if needed <= 0.0 {
                        break;
                    }
                    let taken = (donor.memory_usage * EMERGENCY_RECLAIM_SHARE).min(needed);
                    processes.update(donor.id, |p| {
                        p.memory_usage = (p.memory_usage - taken).max(0.0)
                    })?;
                    needed -= taken;
                    out.deltas.push(ProcessMemoryDelta {
                        process_id: donor.id,
                        name: donor.name.clone(),
                        delta: -taken,
                    });
                    debug!(donor = donor.id, reclaimed = taken, "Reclaimed donor memory");
                }
                if out.deltas.is_empty() {
                    out.warnings
                        .push("No eligible donors; emergency allocation reclaimed nothing".into());
                } else {
                    out.narrative.push("emergency_reclaim".into());
                }
            }
        }

        processes.update(target.id, |p| p.memory_usage += target_gain)?;
        out.deltas.insert(
            0,
            ProcessMemoryDelta {
                process_id: target.id,
                name: target.name.clone(),
                delta: target_gain,
            },
        );
        Ok(out)
    }

    async fn run(&mut self) -> CommandResult<CommandOutcome> {
        let consciousness = self.deps.resolve(&self.params.character_id)?;
        let pid = self.params.process_id;

        // Pick partners up front so their guards join the canonical order
        let target = live_process(&consciousness, pid)?;
        let candidates: BTreeSet<Pid> = self
            .partners(&consciousness, &target)
            .iter()
            .map(|p| p.id)
            .collect();
        let keys = [EntityKey::Allocator, EntityKey::Process(pid)]
            .into_iter()
            .chain(candidates.iter().map(|id| EntityKey::Process(*id)));
        let guard = consciousness.locks().acquire(keys).await;

        let target = self.check(&consciousness)?;
        let partners: Vec<Process> = self
            .partners(&consciousness, &target)
            .into_iter()
            .filter(|p| guard.holds(EntityKey::Process(p.id)))
            .collect();

        let block_size =
            calculator::find_optimal_block_size(self.params.size, DEFAULT_ALIGNMENT, &BlockSizeOptions::default());
        let efficiency = strategy_efficiency(self.params.strategy, &target);
        let actual = (block_size as f64 * efficiency).round() as Megabytes;

        let memory = consciousness.memory().clone();
        let table = consciousness.processes().clone();

        let mut tx = SnapshotTransaction::begin("allocate_memory");
        let allocator_snapshot = memory.snapshot();
        {
            let memory = memory.clone();
            let snapshot = allocator_snapshot.clone();
            tx.record("allocator", move || memory.restore(&snapshot))?;
        }
        let mut touched = Vec::with_capacity(partners.len() + 1);
        touched.push(target.clone());
        touched.extend(partners.iter().cloned());
        for process in &touched {
            let table = table.clone();
            let process = process.clone();
            tx.record(format!("process:{}", process.id), move || {
                table.restore_process(process)
            })?;
        }

        let segment = memory.commit(SegmentRequest {
            process_id: pid,
            size: actual,
            strategy: self.params.strategy,
            priority: self.params.priority,
            duration: self.params.duration,
        })?;
        let distribution = self.distribute(&consciousness, &target, &partners, actual)?;
        tx.commit()?;

        let stats = memory.stats();
        let character_id = self.params.character_id.clone();
        let mut warnings = distribution.warnings;
        let mut narrative = vec!["memory_allocated".to_string()];
        narrative.extend(distribution.narrative);

        if self.params.force {
            warnings.push("Allocation forced past reserve and fragmentation checks".into());
        }

        self.deps.emit(KernelEvent::MemoryAllocated {
            character_id: character_id.clone(),
            process_id: pid,
            segment_id: segment.id,
            size: actual,
            strategy: self.params.strategy,
            fragmentation: stats.fragmentation_level * 100.0,
            available: stats.capacity.available,
        });

        if stats.pressure != MemoryPressure::Normal {
            let free_percent = stats.capacity.free_percent();
            warnings.push(format!(
                "Memory pressure {}: {:.1}% free",
                stats.pressure, free_percent
            ));
            narrative.push("memory_pressure".into());
            self.deps.emit(KernelEvent::MemoryPressure {
                character_id: character_id.clone(),
                level: stats.pressure,
                free_percent,
            });
        }

        let share_percent = actual as f64 / stats.capacity.total.max(1) as f64 * 100.0;
        if share_percent > ATTENTION_SHIFT_PERCENT {
            narrative.push("attention_shifted".into());
            self.deps.emit(KernelEvent::AttentionShifted {
                character_id: character_id.clone(),
                process_id: pid,
                size: actual,
                share_percent,
            });
        }

        info!(
            character = %character_id,
            pid,
            requested = self.params.size,
            block_size,
            actual,
            strategy = %self.params.strategy,
            "Memory allocated"
        );

        self.undo = Some(AllocationUndo {
            allocator: allocator_snapshot,
            processes: touched,
            segment_id: segment.id,
            size: actual,
        });

        let report = AllocationReport {
            requested_size: self.params.size,
            block_size,
            efficiency,
            impact: AllocationImpact {
                fragmentation: stats.fragmentation_level * 100.0,
                available_memory: stats.capacity.available,
                process_deltas: distribution.deltas,
            },
            segment,
        };

        Ok(CommandOutcome::new(
            CommandKind::AllocateMemory,
            character_id,
            OutcomeDetail::Allocation(Box::new(report)),
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

        let keys = std::iter::once(EntityKey::Allocator)
            .chain(undo.processes.iter().map(|p| EntityKey::Process(p.id)));
        let _guard = consciousness.locks().acquire(keys).await;

        // Whole-allocator restore: any later allocation's segment goes too,
        // while its recipients keep their charge. Undo through CommandHistory.
        consciousness.memory().restore(&undo.allocator);
        for process in &undo.processes {
            consciousness.processes().restore_process(process.clone());
        }
        self.undo = None;

        let available = consciousness.memory().capacity().available;
        self.deps.emit(KernelEvent::MemoryAllocationUndone {
            character_id: self.params.character_id.clone(),
            process_id: self.params.process_id,
            segment_id: undo.segment_id,
            size: undo.size,
        });
        info!(
            character = %self.params.character_id,
            segment = undo.segment_id,
            restored = undo.processes.len(),
            "Memory allocation undone"
        );

        Ok(CommandOutcome::new(
            CommandKind::AllocateMemory,
            self.params.character_id.clone(),
            OutcomeDetail::AllocationUndone {
                segment_id: undo.segment_id,
                available_memory: available,
            },
        )
        .with_narrative_events(vec!["memory_allocation_undone".into()]))
    }
}

#[async_trait]
impl Command for AllocateMemoryCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AllocateMemory
    }

    fn description(&self) -> String {
        format!(
            "Allocate {}MB ({}) to process {} of {}",
            self.params.size, self.params.strategy, self.params.process_id, self.params.character_id
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
            CommandKind::AllocateMemory.as_str(),
            "execute",
            self.params.character_id.as_str(),
        );
        let result = self.run().await;
        if let Err(e) = &result {
            warn!(trace_id = span.trace_id(), error = %e, "Allocation failed");
        }
        span.record_result(result.is_ok());
        result
    }

    async fn undo(&mut self) -> CommandResult<CommandOutcome> {
        let span = CommandSpan::new(
            CommandKind::AllocateMemory.as_str(),
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
