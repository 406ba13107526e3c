/*!
 * Mind Kernel Library
 * Process, memory, and optimization modeling for simulated minds
 */

pub mod commands;
pub mod consciousness;
pub mod core;
pub mod memory;
pub mod monitoring;
pub mod optimization;
pub mod process;

// Re-exports
pub use commands::{
    AllocateMemoryCommand, AllocateParams, Command, CommandDeps, CommandHistory, CommandKind,
    CommandOutcome, KillProcessCommand, OptimizeParams, OptimizeProcessCommand, OutcomeDetail,
    ReleaseMemoryCommand, RestartProcessCommand,
};
pub use consciousness::{Consciousness, ConsciousnessLookup, ConsciousnessRegistry};
pub use core::{
    CharacterId, CommandError, CommandResult, KernelConfig, KernelError, Megabytes, Pid,
    SerializableError,
};
pub use memory::{AllocationStrategy, MemoryAllocator, MemoryStats};
pub use monitoring::{init_tracing, EventBus, EventSink, KernelEvent, RecordingSink};
pub use optimization::{OptimizationStrategy, Optimizer, StrategyKind};
pub use process::{Process, ProcessSpec, ProcessStatus, ProcessTable, ProcessType};
