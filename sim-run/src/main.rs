//! Headless driver for the cell world.
//!
//! Loads a world description (or generates a random one), advances it for a
//! number of steps and writes the resulting description as JSON. Energy
//! diagnostics are logged through `tracing`; set `RUST_LOG=debug` to see
//! one line per step.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cellworld_core::generator::{WorldRecipe, random_world};
use cellworld_core::{DataDescription, Simulation, SimulationParameters};
use clap::Parser;
use glam::UVec2;
use rand::{SeedableRng, rngs::SmallRng};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cellworld-run", version, about = "Advance a cell world description")]
struct Cli {
    /// World description to load (JSON).
    #[arg(long, conflicts_with = "random")]
    world: Option<PathBuf>,

    /// Generate a random world with this many clusters instead.
    #[arg(long)]
    random: Option<usize>,

    /// Simulation parameters (JSON); omitted options keep their defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Number of steps to run.
    #[arg(long, default_value_t = 100)]
    steps: usize,

    /// Where to write the resulting description; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// World width, overrides the parameter file.
    #[arg(long)]
    width: Option<u32>,

    /// World height, overrides the parameter file.
    #[arg(long)]
    height: Option<u32>,

    /// Step time delta, overrides the parameter file.
    #[arg(long)]
    dt: Option<f32>,

    /// Radiation probability, overrides the parameter file.
    #[arg(long)]
    radiation: Option<f32>,

    /// Seed, overrides the parameter file.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let params = load_params(&cli)?;
    let data = load_world(&cli, &params)?;

    let mut sim = Simulation::new(params).context("invalid simulation parameters")?;
    for err in sim.update_data(&data) {
        warn!(%err, "skipping cluster");
    }
    let start = sim.energy();
    info!(
        clusters = sim.clusters().len(),
        particles = sim.particles().particles.len(),
        energy = start.total(),
        "world loaded"
    );

    let mut breaches = 0usize;
    for report in sim.run(cli.steps) {
        if !report.is_balanced() {
            breaches += 1;
        }
    }

    let end = sim.energy();
    info!(
        steps = cli.steps,
        energy = end.total(),
        drift = end.total() - start.total(),
        breaches,
        "run finished"
    );

    let json = serde_json::to_string_pretty(&sim.to_description())?;
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_params(cli: &Cli) -> Result<SimulationParameters> {
    let mut params = match &cli.params {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => SimulationParameters::default(),
    };
    if cli.width.is_some() || cli.height.is_some() {
        params.world_size = UVec2::new(
            cli.width.unwrap_or(params.world_size.x),
            cli.height.unwrap_or(params.world_size.y),
        );
    }
    if let Some(dt) = cli.dt {
        params.dt = dt;
    }
    if let Some(radiation) = cli.radiation {
        params.radiation_probability = radiation;
    }
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    params.validate()?;
    Ok(params)
}

fn load_world(cli: &Cli, params: &SimulationParameters) -> Result<DataDescription> {
    if let Some(path) = &cli.world {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()));
    }
    let recipe = WorldRecipe {
        clusters: cli.random.unwrap_or(WorldRecipe::default().clusters),
        ..WorldRecipe::default()
    };
    let mut rng = SmallRng::seed_from_u64(params.seed);
    Ok(random_world(&recipe, params, &mut rng))
}
