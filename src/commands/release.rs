/*!
 * Release Memory Command
 * Frees one segment and takes its size off the owning process's memory usage
 */

use super::deps::CommandDeps;
use super::traits::Command;
use super::types::{CommandKind, CommandOutcome, OutcomeDetail};
use crate::consciousness::Consciousness;
use crate::core::errors::{CommandError, CommandResult};
use crate::core::guard::{EntityKey, SnapshotTransaction};
use crate::core::types::{CharacterId, SegmentId};
use crate::memory::{AllocatorSnapshot, MemoryError, MemorySegment};
use crate::monitoring::{CommandSpan, KernelEvent};
use crate::process::Process;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
struct ReleaseUndo {
    allocator: AllocatorSnapshot,
    process: Option<Process>,
    segment: MemorySegment,
}

/// Undoable release of one memory segment
pub struct ReleaseMemoryCommand {
    character_id: CharacterId,
    segment_id: SegmentId,
    deps: CommandDeps,
    undo: Option<ReleaseUndo>,
}

impl ReleaseMemoryCommand {
    pub fn new(
        character_id: impl Into<CharacterId>,
        segment_id: SegmentId,
        deps: CommandDeps,
    ) -> CommandResult<Self> {
        let character_id = character_id.into();
        if character_id.is_empty() {
            return Err(CommandError::Construction("character_id is required".into()));
        }
        if segment_id == 0 {
            return Err(CommandError::Construction("segment_id is required".into()));
        }
        Ok(Self {
            character_id,
            segment_id,
            deps,
            undo: None,
        })
    }

    fn check(&self, consciousness: &Consciousness) -> CommandResult<MemorySegment> {
        consciousness
            .memory()
            .segment(self.segment_id)
            .ok_or(CommandError::Memory(MemoryError::SegmentNotFound(
                self.segment_id,
            )))
    }

    async fn run(&mut self) -> CommandResult<CommandOutcome> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        let owner = self.check(&consciousness)?.process_id;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Allocator, EntityKey::Process(owner)])
            .await;

        let memory = consciousness.memory().clone();
        let table = consciousness.processes().clone();

        let mut tx = SnapshotTransaction::begin("release_memory");
        let allocator = memory.snapshot();
        {
            let memory = memory.clone();
            let snapshot = allocator.clone();
            tx.record("allocator", move || memory.restore(&snapshot))?;
        }
        let process = table.get(owner);
        if let Some(process) = process.clone() {
            let table = table.clone();
            tx.record(format!("process:{}", process.id), move || {
                table.restore_process(process)
            })?;
        }

        let segment = memory.release(self.segment_id)?;
        if process.is_some() {
            table.update(owner, |p| {
                p.memory_usage = (p.memory_usage - segment.size as f64).max(0.0)
            })?;
        }
        tx.commit()?;

        let available = memory.capacity().available;
        self.deps.emit(KernelEvent::MemoryReleased {
            character_id: self.character_id.clone(),
            process_id: owner,
            segment_id: segment.id,
            size: segment.size,
        });
        info!(
            character = %self.character_id,
            segment = segment.id,
            size = segment.size,
            available,
            "Memory released"
        );

        self.undo = Some(ReleaseUndo {
            allocator,
            process,
            segment: segment.clone(),
        });

        Ok(CommandOutcome::new(
            CommandKind::ReleaseMemory,
            self.character_id.clone(),
            OutcomeDetail::Release {
                segment,
                available_memory: available,
            },
        )
        .with_narrative_events(vec!["memory_released".into()]))
    }

    async fn revert(&mut self) -> CommandResult<CommandOutcome> {
        let undo = self
            .undo
            .clone()
            .ok_or_else(|| CommandError::NothingToUndo(self.description()))?;
        let consciousness = self.deps.resolve(&self.character_id)?;
        let _guard = consciousness
            .locks()
            .acquire([
                EntityKey::Allocator,
                EntityKey::Process(undo.segment.process_id),
            ])
            .await;

        consciousness.memory().restore(&undo.allocator);
        if let Some(process) = undo.process {
            consciousness.processes().restore_process(process);
        }
        self.undo = None;

        self.deps.emit(KernelEvent::MemoryReleaseUndone {
            character_id: self.character_id.clone(),
            process_id: undo.segment.process_id,
            segment_id: undo.segment.id,
        });

        Ok(CommandOutcome::new(
            CommandKind::ReleaseMemory,
            self.character_id.clone(),
            OutcomeDetail::ReleaseUndone {
                segment_id: undo.segment.id,
                available_memory: consciousness.memory().capacity().available,
            },
        ))
    }
}

#[async_trait]
impl Command for ReleaseMemoryCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ReleaseMemory
    }

    fn description(&self) -> String {
        format!("Release segment {} of {}", self.segment_id, self.character_id)
    }

    async fn can_execute(&self) -> CommandResult<bool> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        self.check(&consciousness)?;
        Ok(true)
    }

    async fn execute(&mut self) -> CommandResult<CommandOutcome> {
        if self.undo.is_some() {
            return Err(CommandError::AlreadyExecuted(self.description()));
        }
        let span = CommandSpan::new(
            CommandKind::ReleaseMemory.as_str(),
            "execute",
            self.character_id.as_str(),
        );
        let result = self.run().await;
        span.record_result(result.is_ok());
        result
    }

    async fn undo(&mut self) -> CommandResult<CommandOutcome> {
        let span = CommandSpan::new(
            CommandKind::ReleaseMemory.as_str(),
            "undo",
            self.character_id.as_str(),
        );
        let result = self.revert().await;
        span.record_result(result.is_ok());
        result
    }

    fn can_undo(&self) -> bool {
        self.undo.is_some()
    }
}
