/*!
 * Entity Guards
 *
 * Per-entity exclusive access tokens. Every process and the memory
 * allocator of a consciousness get a lazily created async mutex; a command
 * acquires all the entities it touches before mutating anything and holds
 * them until it is done.
 *
 * Keys are always acquired in `EntityKey` order (allocator first, then
 * processes by pid), so two commands with overlapping key sets cannot
 * deadlock.
 */

use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::types::Pid;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Lockable entity of one consciousness
///
/// The derived order is the acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Allocator,
    Process(Pid),
}

/// Table of per-entity locks
///
/// Cheap to clone; clones share the table.
#[derive(Clone)]
pub struct EntityLocks {
    locks: Arc<DashMap<EntityKey, Arc<Mutex<()>>, RandomState>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    fn slot(&self, key: EntityKey) -> Arc<Mutex<()>> {
        // Clone out of the shard so no map reference is held across an await
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn canonical(keys: impl IntoIterator<Item = EntityKey>) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Wait for exclusive access to every key
    pub async fn acquire(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityGuard {
        let keys = Self::canonical(keys);
        let mut guards = Vec::with_capacity(keys.len());

        for key in &keys {
            guards.push(self.slot(*key).lock_owned().await);
        }

        trace!(?keys, "Acquired entity guard");
        EntityGuard {
            keys,
            _guards: guards,
            metadata: GuardMetadata::new("entity"),
        }
    }

    /// Acquire every key or none
    pub fn try_acquire(&self, keys: impl IntoIterator<Item = EntityKey>) -> GuardResult<EntityGuard> {
        let keys = Self::canonical(keys);
        let mut guards = Vec::with_capacity(keys.len());

        for key in &keys {
            match self.slot(*key).try_lock_owned() {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    return Err(GuardError::ResourceUnavailable(format!(
                        "{:?} is held by another command",
                        key
                    )))
                }
            }
        }

        Ok(EntityGuard {
            keys,
            _guards: guards,
            metadata: GuardMetadata::new("entity"),
        })
    }

    /// Whether some guard currently holds `key`
    pub fn is_locked(&self, key: EntityKey) -> bool {
        self.slot(key).try_lock().is_err()
    }

    /// Number of entities that have ever been locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for EntityLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityLocks")
            .field("entities", &self.locks.len())
            .finish()
    }
}

/// Held entity locks, released on drop
pub struct EntityGuard {
    keys: Vec<EntityKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
    metadata: GuardMetadata,
}

impl EntityGuard {
    /// Keys held, in acquisition order
    pub fn keys(&self) -> &[EntityKey] {
        &self.keys
    }

    pub fn holds(&self, key: EntityKey) -> bool {
        self.keys.binary_search(&key).is_ok()
    }
}

impl std::fmt::Debug for EntityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityGuard")
            .field("keys", &self.keys)
            .finish()
    }
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        trace!(
            keys = ?self.keys,
            held_micros = self.metadata.lifetime_micros(),
            "Released entity guard"
        );
    }
}
