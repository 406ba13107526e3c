/*!
 * Command History
 * Executes commands and keeps a bounded undo stack
 */

use super::traits::Command;
use super::types::CommandOutcome;
use crate::core::errors::{CommandError, CommandResult};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Invoker with an undo stack
///
/// Undo is strictly last-in first-out. Allocation undo restores a whole
/// allocator snapshot, so allocations must be undone in reverse order; this
/// stack is the supported way to undo them.
///
/// The oldest command is dropped once the stack exceeds its limit; dropped
/// commands can no longer be undone.
pub struct CommandHistory {
    undo_stack: VecDeque<Box<dyn Command>>,
    limit: usize,
    executed: u64,
    undone: u64,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            limit: limit.max(1),
            executed: 0,
            undone: 0,
        }
    }

    /// Validate, execute, and remember a command
    pub async fn execute(&mut self, mut command: Box<dyn Command>) -> CommandResult<CommandOutcome> {
        command.can_execute().await?;
        let outcome = command.execute().await?;
        self.executed += 1;

        debug!(command = %command.description(), "Command recorded");
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.limit {
            if let Some(dropped) = self.undo_stack.pop_front() {
                debug!(command = %dropped.description(), "Undo history full, dropping oldest");
            }
        }
        Ok(outcome)
    }

    /// Undo the most recent command
    ///
    /// A command whose undo fails stays on the stack.
    pub async fn undo_last(&mut self) -> CommandResult<CommandOutcome> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or_else(|| CommandError::NothingToUndo("command history is empty".into()))?;

        match command.undo().await {
            Ok(outcome) => {
                self.undone += 1;
                info!(command = %command.description(), "Command undone");
                Ok(outcome)
            }
            Err(e) => {
                self.undo_stack.push_back(command);
                Err(e)
            }
        }
    }

    /// Descriptions of undoable commands, oldest first
    pub fn descriptions(&self) -> Vec<String> {
        self.undo_stack.iter().map(|c| c.description()).collect()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.back().is_some_and(|c| c.can_undo())
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Commands executed and undone so far
    pub fn counts(&self) -> (u64, u64) {
        (self.executed, self.undone)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("pending", &self.undo_stack.len())
            .field("limit", &self.limit)
            .field("executed", &self.executed)
            .field("undone", &self.undone)
            .finish()
    }
}
