/*!
 * Core Module
 * Fundamental kernel types, configuration, guards and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod limits;
pub mod serde;
pub mod types;

// Re-export for convenience
pub use config::KernelConfig;
pub use errors::*;
pub use guard::{
    EntityGuard, EntityKey, EntityLocks, GuardError, GuardResult, SnapshotTransaction,
    TransactionState,
};
pub use types::*;
