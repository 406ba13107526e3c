/*!
 * RAII Guards
 *
 * Guards that scope access to shared kernel state.
 *
 * ## Guard Types
 *
 * - **EntityGuard**: Exclusive access to a set of processes and the
 *   memory allocator, acquired in canonical order
 * - **SnapshotTransaction**: Restores recorded snapshots unless committed
 *
 * ## Example
 *
 * ```ignore
 * let _guard = consciousness.locks().acquire([EntityKey::Allocator, EntityKey::Process(pid)]).await;
 * let mut tx = SnapshotTransaction::begin("allocate_memory");
 * tx.record("allocator", move || allocator.restore(&snapshot))?;
 * // Mutate...
 * tx.commit()?; // Or auto-rollback on drop
 * ```
 */

mod entity;
mod transaction;

pub use entity::{EntityGuard, EntityKey, EntityLocks};
pub use transaction::{SnapshotTransaction, TransactionState};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
