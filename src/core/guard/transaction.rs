/*!
 * Snapshot Transactions
 *
 * RAII guard for multi-step mutations with automatic rollback. Callers
 * record a restore step for every snapshot they take before mutating; if
 * the transaction is dropped without `commit`, the restores run in reverse
 * order.
 */

use super::{GuardError, GuardMetadata, GuardResult};
use tracing::{debug, warn};

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction in progress
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction rolled back
    RolledBack,
}

type Restore = Box<dyn FnOnce() + Send>;

/// Transaction guard that restores snapshots unless committed
///
/// # Example
///
/// ```ignore
/// let mut tx = SnapshotTransaction::begin("kill_process");
/// let table = table.clone();
/// let snapshot = table.snapshot(pid)?;
/// tx.record("process", move || table.restore(&snapshot))?;
///
/// table.kill(pid)?; // An early return here rolls back
///
/// tx.commit()?;
/// ```
pub struct SnapshotTransaction {
    label: &'static str,
    state: TransactionState,
    restores: Vec<(String, Restore)>,
    metadata: GuardMetadata,
}

impl SnapshotTransaction {
    pub fn begin(label: &'static str) -> Self {
        Self {
            label,
            state: TransactionState::Active,
            restores: Vec::new(),
            metadata: GuardMetadata::new("transaction"),
        }
    }

    fn ensure_active(&self, to: &str) -> GuardResult<()> {
        if self.state != TransactionState::Active {
            return Err(GuardError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Register a restore step
    pub fn record<F>(&mut self, name: impl Into<String>, restore: F) -> GuardResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_active("Active")?;
        self.restores.push((name.into(), Box::new(restore)));
        Ok(())
    }

    /// Keep every mutation made under this transaction
    pub fn commit(mut self) -> GuardResult<()> {
        self.ensure_active("Committed")?;
        self.restores.clear();
        self.state = TransactionState::Committed;
        debug!(
            label = self.label,
            duration_micros = self.metadata.lifetime_micros(),
            "Transaction committed"
        );
        Ok(())
    }

    /// Undo every recorded step now
    pub fn rollback(mut self) -> GuardResult<()> {
        self.ensure_active("RolledBack")?;
        self.do_rollback();
        Ok(())
    }

    fn do_rollback(&mut self) {
        let steps = self.restores.len();
        while let Some((name, restore)) = self.restores.pop() {
            debug!(label = self.label, step = %name, "Restoring snapshot");
            restore();
        }
        self.state = TransactionState::RolledBack;
        debug!(label = self.label, steps, "Transaction rolled back");
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of recorded restore steps
    pub fn len(&self) -> usize {
        self.restores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restores.is_empty()
    }
}

impl Drop for SnapshotTransaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            warn!(
                label = self.label,
                steps = self.restores.len(),
                "Transaction auto-rolling back"
            );
            self.do_rollback();
        }
    }
}
