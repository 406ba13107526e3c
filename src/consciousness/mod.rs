/*!
 * Consciousness Instances
 *
 * One character's kernel: its process table, memory allocator and the
 * per-entity lock table commands serialize on. The registry maps character
 * ids to shared instances and is what commands receive as their
 * `ConsciousnessLookup` capability.
 */

use crate::core::config::KernelConfig;
use crate::core::guard::EntityLocks;
use crate::core::types::{CharacterId, Pid};
use crate::memory::{calculator, MemoryAllocator, MemoryStats};
use crate::optimization::StrategyContext;
use crate::process::{
    EmotionSource, PerformanceMetrics, ProcessBaseline, ProcessPriority, ProcessSpec,
    ProcessTable, ProcessType,
};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Leak scores above this are listed in reports
const LEAK_REPORT_THRESHOLD: f64 = 50.0;

/// Resolves a character id to its consciousness instance
pub trait ConsciousnessLookup: Send + Sync {
    fn lookup(&self, id: &CharacterId) -> Option<Arc<Consciousness>>;
}

/// Health summary of one consciousness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsciousnessReport {
    pub character_id: CharacterId,
    pub processes: PerformanceMetrics,
    pub memory: MemoryStats,
    /// `[0, 100]` heuristic
    pub corruption_risk: f64,
    /// Processes whose leak score exceeds the report threshold
    pub leaking: Vec<(Pid, f64)>,
}

/// One character's kernel state
pub struct Consciousness {
    id: CharacterId,
    processes: ProcessTable,
    memory: MemoryAllocator,
    locks: EntityLocks,
    config: KernelConfig,
}

impl Consciousness {
    pub fn new(id: impl Into<CharacterId>, config: KernelConfig) -> Self {
        let id = id.into();
        info!(character = %id, total_memory = config.total_memory, "Consciousness created");
        Self {
            memory: MemoryAllocator::with_config(&config),
            processes: ProcessTable::new(),
            locks: EntityLocks::new(),
            id,
            config,
        }
    }

    /// Create an instance seeded with the protected core processes
    pub fn with_core_processes(id: impl Into<CharacterId>, config: KernelConfig) -> Self {
        let consciousness = Self::new(id, config);
        for (name, kind) in [
            ("core_consciousness", ProcessType::Executive),
            ("self_preservation", ProcessType::Background),
            ("identity_core", ProcessType::Cognitive),
            ("memory_core", ProcessType::MemorySearch),
            ("emotional_regulation", ProcessType::EmotionalProcessing),
        ] {
            if !consciousness.config.is_critical(name) {
                continue;
            }
            consciousness.processes.create_base_process(
                ProcessSpec::new(name, kind)
                    .with_priority(ProcessPriority::Critical)
                    .with_resources(15.0, 128.0, 2)
                    .with_effectiveness(0.9)
                    .with_emotion_source(EmotionSource::new("stability", 0.3))
                    .with_config(ProcessBaseline {
                        cpu: 15.0,
                        memory: 128.0,
                        threads: 2,
                    }),
            );
        }
        consciousness
    }

    pub fn id(&self) -> &CharacterId {
        &self.id
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn memory(&self) -> &MemoryAllocator {
        &self.memory
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Whether a process is on the protected list
    pub fn is_protected(&self, name: &str) -> bool {
        self.config.is_critical(name)
    }

    /// Strategy context built from configuration flags
    pub fn strategy_context(&self, safe_mode: bool) -> StrategyContext {
        StrategyContext::new(safe_mode || self.config.safe_mode).unstable(self.config.system_unstable)
    }

    /// Advance simulated time
    pub fn tick(&self, elapsed_ms: u64) -> usize {
        let applied = self
            .processes
            .tick(elapsed_ms, crate::core::types::now_millis());
        debug!(character = %self.id, elapsed_ms, applied, "Tick");
        applied
    }

    pub fn report(&self) -> ConsciousnessReport {
        let memory = self.memory.stats();
        let processes = self.processes.list();
        let crashes = processes.iter().map(|p| p.crash_count).sum();

        let leaking = processes
            .iter()
            .filter(|p| !p.is_terminated())
            .map(|p| (p.id, calculator::leak_score(p)))
            .filter(|(_, score)| *score > LEAK_REPORT_THRESHOLD)
            .collect();

        ConsciousnessReport {
            character_id: self.id.clone(),
            processes: self.processes.performance_metrics(),
            corruption_risk: calculator::corruption_risk(
                memory.fragmentation_level * 100.0,
                memory.pressure,
                crashes,
            ),
            memory,
            leaking,
        }
    }
}

impl std::fmt::Debug for Consciousness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consciousness")
            .field("id", &self.id)
            .field("processes", &self.processes.len())
            .field("memory", &self.memory.capacity())
            .field("locks", &self.locks)
            .finish()
    }
}

/// Registry of live consciousness instances
///
/// Cheap to clone; clones share instances.
#[derive(Clone)]
pub struct ConsciousnessRegistry {
    instances: Arc<DashMap<CharacterId, Arc<Consciousness>, RandomState>>,
    config: KernelConfig,
}

impl ConsciousnessRegistry {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            instances: Arc::new(DashMap::with_hasher(RandomState::new())),
            config,
        }
    }

    /// Register an existing instance, replacing any with the same id
    pub fn register(&self, consciousness: Consciousness) -> Arc<Consciousness> {
        let consciousness = Arc::new(consciousness);
        self.instances
            .insert(consciousness.id().clone(), consciousness.clone());
        info!(character = %consciousness.id(), "Consciousness registered");
        consciousness
    }

    /// Get or create the instance for `id`, seeded with core processes
    pub fn get_or_create(&self, id: impl Into<CharacterId>) -> Arc<Consciousness> {
        let id = id.into();
        self.instances
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(Consciousness::with_core_processes(id, self.config.clone()))
            })
            .clone()
    }

    pub fn get(&self, id: &CharacterId) -> Option<Arc<Consciousness>> {
        self.instances.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &CharacterId) -> Option<Arc<Consciousness>> {
        self.instances.remove(id).map(|(_, instance)| instance)
    }

    pub fn ids(&self) -> Vec<CharacterId> {
        let mut ids: Vec<CharacterId> = self.instances.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

impl Default for ConsciousnessRegistry {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl ConsciousnessLookup for ConsciousnessRegistry {
    fn lookup(&self, id: &CharacterId) -> Option<Arc<Consciousness>> {
        self.get(id)
    }
}
