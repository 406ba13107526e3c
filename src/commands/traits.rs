/*!
 * Command Traits
 */

use super::types::{CommandKind, CommandOutcome};
use crate::core::errors::CommandResult;
use async_trait::async_trait;

/// Undoable mutation of one consciousness
///
/// `can_execute` front-loads validation and never mutates. `execute`
/// re-checks under the entity guards before touching state, and `undo`
/// restores the exact pre-execute state.
#[async_trait]
pub trait Command: Send + Sync {
    fn kind(&self) -> CommandKind;

    fn description(&self) -> String;

    /// Validate every precondition; errors name the violated one
    async fn can_execute(&self) -> CommandResult<bool>;

    async fn execute(&mut self) -> CommandResult<CommandOutcome>;

    /// Fails with `NothingToUndo` unless `execute` succeeded
    async fn undo(&mut self) -> CommandResult<CommandOutcome>;

    fn can_undo(&self) -> bool;
}
