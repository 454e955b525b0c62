//! GameKit Runtime
//!
//! Harness binary: builds a demo world and drives every threaded execution
//! group on its own OS thread for a bounded number of ticks.

mod demo;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use demo::Demo;
use gamekit_core::ecs::{ExecutionGroup, World};
use gamekit_core::time::tick_interval;
use settings::RuntimeSettings;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gamekit")]
#[command(version = gamekit_core::VERSION)]
#[command(about = "Concurrent component-system substrate demo", long_about = None)]
struct Args {
    /// Path to a settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticks each lane runs
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of demo entities
    #[arg(long)]
    entities: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => RuntimeSettings::load(path)?,
        None => RuntimeSettings::default(),
    };
    if let Some(ticks) = args.ticks {
        settings.ticks = ticks;
    }
    if let Some(entities) = args.entities {
        settings.entities = entities;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("GameKit v{}", gamekit_core::VERSION);
    if !gamekit_metrics::ENABLED {
        warn!("built without metrics; lane timings will read zero");
    }
    let world = Arc::new(World::with_config(settings.core.clone()));
    let demo = Demo::setup(&world, settings.entities)?;

    let started = Instant::now();
    run_lanes(&world, &settings)?;
    info!(elapsed = ?started.elapsed(), "lanes stopped");

    for (group, _) in settings.lanes() {
        let (fastest, slowest) = world.scheduler().group_tick_range(group);
        info!(
            %group,
            ticks = world.scheduler().group_ticks(group),
            tick_time = ?world.scheduler().group_tick_time(group),
            ?fastest,
            ?slowest,
            "lane timing"
        );
    }

    Demo::request_report(&world);
    world.run_group(ExecutionGroup::Render);
    demo.summary(&world);
    demo.teardown(&world);

    info!("Runtime shut down cleanly");
    Ok(())
}

/// One thread per lane; the update lane also advances the entity manager.
fn run_lanes(world: &Arc<World>, settings: &RuntimeSettings) -> Result<()> {
    let handles = settings
        .lanes()
        .map(|(group, hz)| {
            let world = Arc::clone(world);
            let ticks = settings.ticks;
            thread::Builder::new()
                .name(format!("lane-{group}"))
                .spawn(move || run_lane(&world, group, hz, ticks))
                .with_context(|| format!("failed to spawn {group} lane"))
        })
        .collect::<Result<Vec<_>>>()?;

    for handle in handles {
        if handle.join().is_err() {
            warn!("lane thread panicked");
        }
    }
    Ok(())
}

fn run_lane(world: &World, group: ExecutionGroup, hz: u32, ticks: u64) {
    let interval = tick_interval(hz);
    let mut next_tick = Instant::now();
    for tick in 0..ticks {
        if group == ExecutionGroup::Update {
            world.update_entities();
            if tick % 60 == 0 {
                Demo::request_report(world);
            }
        }
        world.run_group(group);

        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }
}
