/*!
 * Command Dependencies
 * Capabilities injected into every command
 */

use crate::consciousness::{Consciousness, ConsciousnessLookup, ConsciousnessRegistry};
use crate::core::config::KernelConfig;
use crate::core::errors::{CommandError, CommandResult};
use crate::core::types::{CharacterId, Pid};
use crate::monitoring::{EventSink, KernelEvent, NullSink};
use crate::process::{Process, ProcessError};
use std::sync::Arc;

/// Capability bag shared by commands
///
/// Commands never reach into global state; every collaborator comes
/// through here.
#[derive(Clone)]
pub struct CommandDeps {
    lookup: Arc<dyn ConsciousnessLookup>,
    events: Arc<dyn EventSink>,
    config: KernelConfig,
}

impl CommandDeps {
    pub fn new(
        lookup: Arc<dyn ConsciousnessLookup>,
        events: Arc<dyn EventSink>,
        config: KernelConfig,
    ) -> Self {
        Self {
            lookup,
            events,
            config,
        }
    }

    /// Dependencies backed by a registry, using its configuration
    pub fn from_registry(registry: &ConsciousnessRegistry, events: Arc<dyn EventSink>) -> Self {
        Self::new(Arc::new(registry.clone()), events, registry.config().clone())
    }

    /// Registry-backed dependencies that drop every event
    pub fn silent(registry: &ConsciousnessRegistry) -> Self {
        Self::from_registry(registry, Arc::new(NullSink))
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub(crate) fn emit(&self, event: KernelEvent) {
        self.events.emit(event);
    }

    pub(crate) fn resolve(&self, id: &CharacterId) -> CommandResult<Arc<Consciousness>> {
        self.lookup
            .lookup(id)
            .ok_or_else(|| CommandError::CharacterNotFound(id.clone()))
    }
}

impl std::fmt::Debug for CommandDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDeps")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Fetch a process that exists and is not terminated
pub(crate) fn live_process(consciousness: &Consciousness, pid: Pid) -> CommandResult<Process> {
    let process = consciousness
        .processes()
        .get(pid)
        .ok_or_else(|| CommandError::Precondition(ProcessError::NotFound(pid).to_string()))?;
    if process.is_terminated() {
        return Err(CommandError::Precondition(
            ProcessError::Terminated(pid).to_string(),
        ));
    }
    Ok(process)
}

/// Validate the identifiers every command takes
pub(crate) fn check_ids(character_id: &CharacterId, pid: Pid) -> CommandResult<()> {
    if character_id.is_empty() {
        return Err(CommandError::Construction("character_id is required".into()));
    }
    if pid == 0 {
        return Err(CommandError::Construction("process_id is required".into()));
    }
    Ok(())
}
