//! Orchestration layer for the trail-field simulations.
//!
//! This crate turns a JSON configuration into a running GPU simulation:
//! - [`config`] -- parsing, defaults, and fail-fast validation.
//! - [`gradient`] -- spawn-time color gradient.
//! - [`spawn`] -- the spawn policies that seed the element state.
//! - [`runner`] -- background-thread lifecycle around the tick loop.

#![warn(missing_docs)]

pub mod config;
pub mod gradient;
pub mod runner;
pub mod spawn;

pub use config::{SimulationConfig, SimulationKind};
pub use gradient::ColorGradient;
pub use runner::{RunnerState, SimulationRunner};
pub use spawn::SpawnMode;

use rand::rngs::StdRng;
use rand::SeedableRng;

use kernel::{GpuContext, PendulumSim, Simulation, SlimeSim};

/// Build a ready-to-step simulation from a validated configuration.
///
/// Acquires the GPU device, seeds the spawn RNG, runs the configured spawn
/// policy, and constructs the matching engine. Everything that can fail does
/// so here, before any frame work.
pub fn build_simulation(
    config: &SimulationConfig,
) -> Result<Box<dyn Simulation + Send>, Box<dyn std::error::Error>> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!("spawn seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let ctx = GpuContext::new()?;

    match &config.simulation {
        SimulationKind::Pendulum(p) => {
            let gradient = ColorGradient::new(p.gradient_start, p.gradient_end);
            let elements = spawn::spawn_pendulums(p, p.quantity, &gradient);
            let sim = PendulumSim::new(ctx, p.kernel_params(config), elements)?;
            Ok(Box::new(sim))
        }
        SimulationKind::Slime(s) => {
            let elements = spawn::spawn_agents(
                s.spawn_mode,
                config.width,
                config.height,
                s.num_agents,
                &mut rng,
            );
            let sim = SlimeSim::new(ctx, s.kernel_params(config), elements)?;
            Ok(Box::new(sim))
        }
    }
}

/// Load a configuration file and wrap the simulation in a lifecycle runner.
///
/// ```no_run
/// let runner = orchestrator::create_simulation("configs/slime.json", Some(600))?;
/// runner.start();
/// runner.join()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_simulation(
    config_path: &str,
    max_ticks: Option<u64>,
) -> Result<SimulationRunner, Box<dyn std::error::Error>> {
    tracing::info!("creating simulation from config: {}", config_path);
    let config = SimulationConfig::load(config_path)?;
    tracing::info!(
        "configuration loaded: {} ({} elements)",
        config.name,
        config.element_count()
    );

    let sim = build_simulation(&config)?;
    Ok(SimulationRunner::new(sim, max_ticks))
}
