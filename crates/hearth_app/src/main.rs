//! # hearth_app
//!
//! Headless runner for the world core. Builds a demo scene, drives it at a
//! fixed rate, then snapshots the world and checks the reload matches.
//!
//! ```text
//! hearth_app --frames 600 --tick-rate 60 --config world.json --save world.hearth
//! ```

mod scene;
mod tick;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use hearth_math::Transform2D;
use hearth_world::{World, WorldConfig, builtin_registry, load, load_from_path, save, save_to_path};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scene::Scene;
use tick::{TickConfig, TickLoop};

#[derive(Parser)]
#[command(name = "hearth_app", about = "Run the world core headless at a fixed frame rate")]
struct Args {
    /// Frames to run (0 = until killed)
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Frames per second
    #[arg(short, long, default_value_t = 60.0)]
    tick_rate: f64,

    /// JSON world configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the final snapshot here instead of keeping it in memory
    #[arg(short, long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hearth_app=info".parse()?)
                .add_directive("hearth_world=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WorldConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WorldConfig::default(),
    };

    let mut world = World::with_config(config);
    let scene = scene::populate(&mut world)?;
    info!(world = %world.id(), frames = args.frames, "hearth starting");

    let mut tick_loop = TickLoop::new(
        TickConfig {
            tick_rate: args.tick_rate,
            max_ticks: args.frames,
        },
        world,
    );
    let summary = tick_loop.run()?;
    let world = tick_loop.into_world();

    if let Some(ball) = world.get::<Transform2D>(scene.ball) {
        info!(x = ball.position.x, y = ball.position.y, "ball resting place");
    }
    info!(
        ticks = summary.ticks,
        failures = summary.failures,
        envelopes = summary.envelopes,
        bytes = summary.envelope_bytes,
        overruns = summary.overruns,
        "run finished"
    );

    verify_round_trip(&world, &scene, args.save.as_deref())?;
    info!("hearth shut down");
    Ok(())
}

/// Snapshot `world`, load it back and compare what the scene cares about.
fn verify_round_trip(world: &World, scene: &Scene, path: Option<&Path>) -> Result<()> {
    let registry = builtin_registry()?;
    let loaded = match path {
        Some(path) => {
            save_to_path(world, path).with_context(|| format!("saving {}", path.display()))?;
            load_from_path(path, &registry)?
        }
        None => {
            let mut bytes = Vec::new();
            save(world, &mut bytes)?;
            load(bytes.as_slice(), &registry)?
        }
    };

    ensure!(
        loaded.entity_count() == world.entity_count(),
        "reload has {} entities, expected {}",
        loaded.entity_count(),
        world.entity_count()
    );
    for (name, entity) in [
        ("ground", scene.ground),
        ("ball", scene.ball),
        ("wanderer", scene.wanderer),
        ("guard", scene.guard),
    ] {
        ensure!(
            loaded.find_by_name(name) == Some(entity),
            "`{name}` did not survive the reload"
        );
        ensure!(
            loaded.get::<Transform2D>(entity) == world.get::<Transform2D>(entity),
            "`{name}` moved during the reload"
        );
    }
    info!(entities = loaded.entity_count(), "snapshot verified");
    Ok(())
}
