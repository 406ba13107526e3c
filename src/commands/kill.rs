/*!
 * Kill Process Command
 *
 * Terminates a process. The record stays in the table, so undo puts the
 * pre-kill snapshot back together with the lifecycle counters.
 */

use super::deps::{check_ids, live_process, CommandDeps};
use super::traits::Command;
use super::types::{CommandKind, CommandOutcome, OutcomeDetail};
use crate::consciousness::Consciousness;
use crate::core::errors::{CommandError, CommandResult};
use crate::core::guard::EntityKey;
use crate::core::types::{CharacterId, Pid};
use crate::monitoring::{CommandSpan, KernelEvent};
use crate::process::{CountedTransition, Process, ProcessSnapshot};
use async_trait::async_trait;
use tracing::{info, warn};

/// Undoable process termination
pub struct KillProcessCommand {
    character_id: CharacterId,
    process_id: Pid,
    force: bool,
    deps: CommandDeps,
    snapshot: Option<ProcessSnapshot>,
}

impl KillProcessCommand {
    pub fn new(
        character_id: impl Into<CharacterId>,
        process_id: Pid,
        deps: CommandDeps,
    ) -> CommandResult<Self> {
        let character_id = character_id.into();
        check_ids(&character_id, process_id)?;
        Ok(Self {
            character_id,
            process_id,
            force: false,
            deps,
            snapshot: None,
        })
    }

    /// Allow killing system-protected processes
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn check(&self, consciousness: &Consciousness) -> CommandResult<Process> {
        let process = live_process(consciousness, self.process_id)?;
        if !self.force && consciousness.is_protected(&process.name) {
            return Err(CommandError::ProtectedProcess {
                pid: process.id,
                name: process.name,
            });
        }
        Ok(process)
    }

    async fn run(&mut self) -> CommandResult<CommandOutcome> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Process(self.process_id)])
            .await;

        let process = self.check(&consciousness)?;
        let table = consciousness.processes();
        let snapshot = table.snapshot(self.process_id)?;
        table.kill(self.process_id)?;

        if self.force && consciousness.is_protected(&process.name) {
            warn!(pid = process.id, name = %process.name, "Force-killed protected process");
        }

        self.deps.emit(KernelEvent::ProcessKilled {
            character_id: self.character_id.clone(),
            process_id: process.id,
            name: process.name.clone(),
            forced: self.force,
        });
        self.snapshot = Some(snapshot);

        Ok(CommandOutcome::new(
            CommandKind::KillProcess,
            self.character_id.clone(),
            OutcomeDetail::Kill {
                process_id: process.id,
                name: process.name,
                forced: self.force,
            },
        )
        .with_narrative_events(vec!["process_killed".into()]))
    }

    async fn revert(&mut self) -> CommandResult<CommandOutcome> {
        let snapshot = self
            .snapshot
            .clone()
            .ok_or_else(|| CommandError::NothingToUndo(self.description()))?;
        let consciousness = self.deps.resolve(&self.character_id)?;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Process(self.process_id)])
            .await;

        consciousness
            .processes()
            .restore_after(CountedTransition::Kill, &snapshot);
        self.snapshot = None;

        self.deps.emit(KernelEvent::ProcessKillUndone {
            character_id: self.character_id.clone(),
            process_id: self.process_id,
        });
        info!(pid = self.process_id, "Kill undone");

        Ok(CommandOutcome::new(
            CommandKind::KillProcess,
            self.character_id.clone(),
            OutcomeDetail::KillUndone {
                process_id: self.process_id,
                status: snapshot.process.status,
            },
        ))
    }
}

#[async_trait]
impl Command for KillProcessCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::KillProcess
    }

    fn description(&self) -> String {
        let forced = if self.force { " (forced)" } else { "" };
        format!(
            "Kill process {} of {}{}",
            self.process_id, self.character_id, forced
        )
    }

    async fn can_execute(&self) -> CommandResult<bool> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        self.check(&consciousness)?;
        Ok(true)
    }

    async fn execute(&mut self) -> CommandResult<CommandOutcome> {
        if self.snapshot.is_some() {
            return Err(CommandError::AlreadyExecuted(self.description()));
        }
        let span = CommandSpan::new(
            CommandKind::KillProcess.as_str(),
            "execute",
            self.character_id.as_str(),
        );
        let result = self.run().await;
        span.record_result(result.is_ok());
        result
    }

    async fn undo(&mut self) -> CommandResult<CommandOutcome> {
        let span = CommandSpan::new(
            CommandKind::KillProcess.as_str(),
            "undo",
            self.character_id.as_str(),
        );
        let result = self.revert().await;
        span.record_result(result.is_ok());
        result
    }

    fn can_undo(&self) -> bool {
        self.snapshot.is_some()
    }
}
