/*!
 * Restart Process Command
 * Resets a stopped, crashed, or running process to its baseline
 */

use super::deps::{check_ids, live_process, CommandDeps};
use super::traits::Command;
use super::types::{CommandKind, CommandOutcome, OutcomeDetail};
use crate::core::errors::{CommandError, CommandResult};
use crate::core::guard::EntityKey;
use crate::core::types::{CharacterId, Pid};
use crate::monitoring::{CommandSpan, KernelEvent};
use crate::process::{CountedTransition, ProcessSnapshot};
use async_trait::async_trait;
use tracing::info;

/// Undoable process restart
///
/// Terminated processes are final and are refused.
pub struct RestartProcessCommand {
    character_id: CharacterId,
    process_id: Pid,
    deps: CommandDeps,
    snapshot: Option<ProcessSnapshot>,
}

impl RestartProcessCommand {
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
            deps,
            snapshot: None,
        })
    }

    async fn run(&mut self) -> CommandResult<CommandOutcome> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        let _guard = consciousness
            .locks()
            .acquire([EntityKey::Process(self.process_id)])
            .await;

        live_process(&consciousness, self.process_id)?;
        let table = consciousness.processes();
        let snapshot = table.snapshot(self.process_id)?;
        let restarted = table.restart(self.process_id)?;

        self.deps.emit(KernelEvent::ProcessRestarted {
            character_id: self.character_id.clone(),
            process_id: restarted.id,
            restart_count: restarted.restart_count,
        });
        self.snapshot = Some(snapshot);

        Ok(CommandOutcome::new(
            CommandKind::RestartProcess,
            self.character_id.clone(),
            OutcomeDetail::Restart {
                process_id: restarted.id,
                restart_count: restarted.restart_count,
            },
        )
        .with_narrative_events(vec!["process_restarted".into()]))
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
            .restore_after(CountedTransition::Restart, &snapshot);
        self.snapshot = None;

        self.deps.emit(KernelEvent::ProcessRestartUndone {
            character_id: self.character_id.clone(),
            process_id: self.process_id,
        });
        info!(pid = self.process_id, "Restart undone");

        Ok(CommandOutcome::new(
            CommandKind::RestartProcess,
            self.character_id.clone(),
            OutcomeDetail::RestartUndone {
                process_id: self.process_id,
                status: snapshot.process.status,
            },
        ))
    }
}

#[async_trait]
impl Command for RestartProcessCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RestartProcess
    }

    fn description(&self) -> String {
        format!("Restart process {} of {}", self.process_id, self.character_id)
    }

    async fn can_execute(&self) -> CommandResult<bool> {
        let consciousness = self.deps.resolve(&self.character_id)?;
        live_process(&consciousness, self.process_id)?;
        Ok(true)
    }

    async fn execute(&mut self) -> CommandResult<CommandOutcome> {
        if self.snapshot.is_some() {
            return Err(CommandError::AlreadyExecuted(self.description()));
        }
        let span = CommandSpan::new(
            CommandKind::RestartProcess.as_str(),
            "execute",
            self.character_id.as_str(),
        );
        let result = self.run().await;
        span.record_result(result.is_ok());
        result
    }

    async fn undo(&mut self) -> CommandResult<CommandOutcome> {
        let span = CommandSpan::new(
            CommandKind::RestartProcess.as_str(),
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
