/*!
 * Mind Kernel - Demo Entry Point
 *
 * Boots one consciousness, runs a short scripted scene of commands
 * through the command history, and prints every outcome as JSON.
 */

use anyhow::{Context, Result};
use mind_kernel::commands::{
    AllocateParams, OptimizeParams, RestartProcessCommand,
};
use mind_kernel::monitoring::EventRecord;
use mind_kernel::process::EmotionSource;
use mind_kernel::{
    init_tracing, AllocateMemoryCommand, AllocationStrategy, Command, CommandDeps,
    CommandHistory, ConsciousnessRegistry, EventBus, KernelConfig, KillProcessCommand,
    CommandError, CommandOutcome, OptimizeProcessCommand, ProcessSpec, ProcessType,
    SerializableError,
};
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = KernelConfig::from_env();
    config.validate().context("invalid kernel configuration")?;
    info!(
        total_memory = config.total_memory,
        safe_mode = config.safe_mode,
        "Mind kernel starting"
    );

    let registry = ConsciousnessRegistry::new(config.clone());
    let bus = EventBus::new();
    let events = bus.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(record) = events.recv_async().await {
            log_event(&record);
        }
    });

    let character = registry.get_or_create("protagonist");
    let processes = character.processes();
    let anxiety = processes.create_base_process(
        ProcessSpec::new("anxiety", ProcessType::EmotionalProcessing)
            .with_resources(85.0, 420.0, 7)
            .with_emotional_impact(0.6)
            .with_effectiveness(0.35)
            .with_emotion_source(EmotionSource::new("fear", 0.7)),
    );
    let daydream = processes.create_base_process(
        ProcessSpec::new("daydreaming", ProcessType::Creative).with_resources(25.0, 150.0, 2),
    );

    let deps = CommandDeps::from_registry(&registry, Arc::new(bus.clone()));
    let mut history = CommandHistory::new(config.history_limit);

    let scene: Vec<Box<dyn Command>> = vec![
        Box::new(AllocateMemoryCommand::new(
            AllocateParams::new("protagonist", anxiety, 512),
            deps.clone(),
        )?),
        Box::new(AllocateMemoryCommand::new(
            AllocateParams::new("protagonist", daydream, 256)
                .with_strategy(AllocationStrategy::Distributed),
            deps.clone(),
        )?),
        Box::new(OptimizeProcessCommand::new(
            OptimizeParams::new("protagonist", anxiety),
            deps.clone(),
        )?),
        Box::new(KillProcessCommand::new("protagonist", daydream, deps.clone())?),
        Box::new(RestartProcessCommand::new("protagonist", daydream, deps.clone())?),
    ];

    for command in scene {
        let description = command.description();
        match history.execute(command).await {
            Ok(outcome) => print_json(&description, &outcome)?,
            Err(e) => print_json(&description, &SerializableError::from(&e))?,
        }
    }

    let undone = history.undo_last().await.context("undo last command")?;
    print_json("undo", &undone)?;

    print_json("report", &character.report())?;

    // A second character allocates for several processes at once; each
    // command locks only its own entities
    let rival = registry.get_or_create("rival");
    let rival_pids: Vec<_> = ["jealousy", "ambition", "planning"]
        .into_iter()
        .map(|name| {
            rival
                .processes()
                .create_base_process(ProcessSpec::new(name, ProcessType::Cognitive))
        })
        .collect();
    let allocations = rival_pids.into_iter().map(|pid| {
        let deps = deps.clone();
        async move {
            let mut command =
                AllocateMemoryCommand::new(AllocateParams::new("rival", pid, 192), deps)?;
            command.execute().await
        }
    });
    let results: Vec<Result<CommandOutcome, CommandError>> =
        futures::future::join_all(allocations).await;
    for result in &results {
        match result {
            Ok(outcome) => print_json("rival allocation", outcome)?,
            Err(e) => print_json("rival allocation", &SerializableError::from(e))?,
        }
    }
    print_json("rival report", &rival.report())?;
    info!(
        executed = history.counts().0,
        events = bus.emitted(),
        "Scene complete"
    );

    drop(deps);
    drop(bus);
    listener.abort();
    Ok(())
}

fn log_event(record: &EventRecord) {
    debug!(
        event = record.event.name(),
        timestamp = record.timestamp,
        "Event received"
    );
}

fn print_json<T: serde::Serialize>(label: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("== {}\n{}", label, json);
    Ok(())
}
