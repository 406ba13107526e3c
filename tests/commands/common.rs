/*!
 * Shared fixtures for command tests
 */

#![allow(dead_code)]

use mind_kernel::process::EmotionSource;
use mind_kernel::{
    CommandDeps, Consciousness, ConsciousnessRegistry, KernelConfig, Pid, ProcessSpec,
    ProcessType, RecordingSink,
};
use std::sync::Arc;

pub const CHARACTER: &str = "ada";

/// One registered consciousness with an event recorder attached
pub struct Harness {
    pub registry: ConsciousnessRegistry,
    pub mind: Arc<Consciousness>,
    pub sink: RecordingSink,
    pub deps: CommandDeps,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Harness whose consciousness carries no core processes
    pub fn with_config(config: KernelConfig) -> Self {
        let registry = ConsciousnessRegistry::new(config.clone());
        let mind = registry.register(Consciousness::new(CHARACTER, config));
        Self::wire(registry, mind)
    }

    /// Harness seeded with the protected core processes
    pub fn seeded() -> Self {
        let registry = ConsciousnessRegistry::default();
        let mind = registry.get_or_create(CHARACTER);
        Self::wire(registry, mind)
    }

    fn wire(registry: ConsciousnessRegistry, mind: Arc<Consciousness>) -> Self {
        let sink = RecordingSink::new();
        let deps = CommandDeps::from_registry(&registry, Arc::new(sink.clone()));
        Self {
            registry,
            mind,
            sink,
            deps,
        }
    }

    pub fn spawn(&self, spec: ProcessSpec) -> Pid {
        self.mind.processes().create_base_process(spec)
    }

    pub fn memory_of(&self, pid: Pid) -> f64 {
        self.mind
            .processes()
            .get(pid)
            .map(|p| p.memory_usage)
            .unwrap_or_default()
    }
}

pub fn worker(name: &str) -> ProcessSpec {
    ProcessSpec::new(name, ProcessType::Cognitive).with_resources(30.0, 100.0, 2)
}

pub fn feeling(name: &str, emotion: &str) -> ProcessSpec {
    ProcessSpec::new(name, ProcessType::EmotionalProcessing)
        .with_resources(30.0, 100.0, 2)
        .with_emotion_source(EmotionSource::new(emotion, 0.5))
}
