/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::guard::GuardError;
use crate::core::types::{CharacterId, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::memory::MemoryError;
pub use crate::optimization::StrategyError;
pub use crate::process::ProcessError;

/// Command framework errors
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum CommandError {
    #[error("Invalid command parameters: {0}")]
    #[diagnostic(
        code(command::construction),
        help("Check the required parameters of the command before building it.")
    )]
    Construction(String),

    #[error("Precondition failed: {0}")]
    #[diagnostic(code(command::precondition))]
    Precondition(String),

    #[error("Consciousness instance {0} not found")]
    #[diagnostic(
        code(command::character_not_found),
        help("Register the character with the consciousness registry first.")
    )]
    CharacterNotFound(CharacterId),

    #[error("Process {pid} ({name}) is system-protected")]
    #[diagnostic(
        code(command::protected_process),
        help("Protected processes are only touched when force is set explicitly.")
    )]
    ProtectedProcess { pid: Pid, name: String },

    #[error("Nothing to undo: {0} has not been executed")]
    #[diagnostic(code(command::nothing_to_undo))]
    NothingToUndo(String),

    #[error("Command already executed: {0}")]
    #[diagnostic(
        code(command::already_executed),
        help("Undo the command before executing it again.")
    )]
    AlreadyExecuted(String),

    #[error("Strategy error: {0}")]
    #[diagnostic(transparent)]
    Strategy(#[from] StrategyError),

    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Memory error: {0}")]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("Guard error: {0}")]
    #[diagnostic(code(command::guard))]
    Guard(#[from] GuardError),
}

impl CommandError {
    /// Whether the command was rejected before it touched any state
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CommandError::Precondition(_)
                | CommandError::CharacterNotFound(_)
                | CommandError::ProtectedProcess { .. }
                | CommandError::Memory(_)
        )
    }
}

/// Command result
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Memory error: {0}")]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Strategy error: {0}")]
    #[diagnostic(transparent)]
    Strategy(#[from] StrategyError),

    #[error("Command error: {0}")]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kernel::configuration_error),
        help("Invalid configuration. Review configuration parameters.")
    )]
    Configuration(String),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(kernel::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),
}

impl From<String> for KernelError {
    fn from(msg: String) -> Self {
        KernelError::Internal(msg)
    }
}

impl From<&str> for KernelError {
    fn from(msg: &str) -> Self {
        KernelError::Internal(msg.to_string())
    }
}

/// Serializable error representation for outcome reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SerializableError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_type: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

impl From<&CommandError> for SerializableError {
    fn from(err: &CommandError) -> Self {
        let error_type = match err {
            CommandError::Construction(_) => "construction_error",
            CommandError::Precondition(_)
            | CommandError::CharacterNotFound(_)
            | CommandError::ProtectedProcess { .. } => "precondition_error",
            CommandError::NothingToUndo(_) | CommandError::AlreadyExecuted(_) => "undo_state_error",
            CommandError::Strategy(_) => "strategy_execution_error",
            CommandError::Process(_) => "process_error",
            CommandError::Memory(_) => "memory_error",
            CommandError::Guard(_) => "guard_error",
        };

        match miette::Diagnostic::help(err) {
            Some(help) => SerializableError::with_details(error_type, err.to_string(), help.to_string()),
            None => SerializableError::new(error_type, err.to_string()),
        }
    }
}

impl From<KernelError> for SerializableError {
    fn from(err: KernelError) -> Self {
        match &err {
            KernelError::Command(inner) => SerializableError::from(inner),
            KernelError::Memory(_) => SerializableError::new("memory_error", err.to_string()),
            KernelError::Process(_) => SerializableError::new("process_error", err.to_string()),
            KernelError::Strategy(_) => {
                SerializableError::new("strategy_execution_error", err.to_string())
            }
            KernelError::Configuration(_) => {
                SerializableError::new("configuration_error", err.to_string())
            }
            KernelError::Internal(_) => SerializableError::new("internal_error", err.to_string()),
        }
    }
}

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;
