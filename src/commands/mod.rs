/*!
 * Commands Module
 *
 * Atomic, undoable mutations of a consciousness. Every command acquires
 * the entity guards it needs in canonical order, records value snapshots
 * in a `SnapshotTransaction`, and emits typed events through the injected
 * sink.
 */

pub mod allocate;
pub mod deps;
pub mod history;
pub mod kill;
pub mod optimize;
pub mod release;
pub mod restart;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use allocate::{
    emergency_donors, related_processes, strategy_efficiency, AllocateMemoryCommand,
    AllocateParams,
};
pub use deps::CommandDeps;
pub use history::CommandHistory;
pub use kill::KillProcessCommand;
pub use optimize::{OptimizeParams, OptimizeProcessCommand};
pub use release::ReleaseMemoryCommand;
pub use restart::RestartProcessCommand;
pub use traits::Command;
pub use types::*;
