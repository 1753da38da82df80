//! Spawn policies: initial element state from index and configuration.
//!
//! Agent spawning is a closed strategy set -- one pure function per variant,
//! matched exhaustively. Pendulum spawning is fully deterministic: the
//! index-proportional angle offsets are the scientific point of the
//! simulation (nearby trajectories diverging under chaotic dynamics), so
//! they are additive, never randomized.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use kernel::{AgentState, PendulumState};

use crate::config::PendulumConfig;
use crate::gradient::ColorGradient;

/// Radius of the `CircleDisperse` spawn ring, in field pixels.
const CIRCLE_RADIUS: f32 = 200.0;

/// Width of the `AlongsideWall` spawn band at the left edge, in pixels.
const WALL_BAND: f32 = 10.0;

/// How the agent swarm is seeded across the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnMode {
    /// All agents at the field center, headings fanned out evenly.
    #[default]
    CentralDisperse,
    /// Positions and headings uniformly random over the whole field.
    RandomDistribution,
    /// On a fixed-radius circle around the center, heading inward.
    CircleDisperse,
    /// In a narrow band at the left edge, heading right with slight jitter.
    AlongsideWall,
}

/// Produce the initial agent records for a run.
pub fn spawn_agents(
    mode: SpawnMode,
    width: u32,
    height: u32,
    count: u32,
    rng: &mut StdRng,
) -> Vec<AgentState> {
    (0..count)
        .map(|i| spawn_agent(mode, width, height, count, i, rng))
        .collect()
}

fn spawn_agent(
    mode: SpawnMode,
    width: u32,
    height: u32,
    count: u32,
    index: u32,
    rng: &mut StdRng,
) -> AgentState {
    let w = width as f32;
    let h = height as f32;
    let center = [w / 2.0, h / 2.0];
    let tau = std::f32::consts::TAU;

    match mode {
        SpawnMode::CentralDisperse => AgentState {
            position: center,
            angle: tau * index as f32 / count as f32,
        },
        SpawnMode::RandomDistribution => AgentState {
            position: [rng.gen_range(0.0..w), rng.gen_range(0.0..h)],
            angle: rng.gen_range(0.0..tau),
        },
        SpawnMode::CircleDisperse => {
            let angle = rng.gen_range(0.0..tau);
            AgentState {
                position: [
                    center[0] + CIRCLE_RADIUS * angle.cos(),
                    center[1] + CIRCLE_RADIUS * angle.sin(),
                ],
                angle: angle + std::f32::consts::PI,
            }
        }
        SpawnMode::AlongsideWall => AgentState {
            position: [rng.gen_range(0.0..WALL_BAND), rng.gen_range(0.0..h)],
            angle: rng.gen::<f32>() / 10.0,
        },
    }
}

/// Produce the initial pendulum records for a run.
///
/// Each pendulum starts at `initial_angles` (degrees) plus `angle_offsets *
/// index` (radians), at rest, colored by its position along the gradient.
pub fn spawn_pendulums(
    config: &PendulumConfig,
    count: u32,
    gradient: &ColorGradient,
) -> Vec<PendulumState> {
    let deg_to_rad = std::f32::consts::PI / 180.0;
    (0..count)
        .map(|i| {
            let fan = i as f32;
            PendulumState {
                angles: [
                    config.initial_angles[0] * deg_to_rad + config.angle_offsets[0] * fan,
                    config.initial_angles[1] * deg_to_rad + config.angle_offsets[1] * fan,
                ],
                lengths: config.lengths,
                masses: config.masses,
                velocity: [0.0, 0.0],
                acceleration: [0.0, 0.0],
                color: gradient.evaluate(fan / count as f32),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const TAU: f32 = std::f32::consts::TAU;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xC0FFEE)
    }

    #[test]
    fn central_disperse_fans_headings_evenly() {
        let agents = spawn_agents(SpawnMode::CentralDisperse, 200, 100, 16, &mut rng());
        assert_eq!(agents.len(), 16);
        for (i, agent) in agents.iter().enumerate() {
            assert_eq!(agent.position, [100.0, 50.0]);
            assert_eq!(agent.angle, TAU * i as f32 / 16.0);
        }
        // All headings distinct, spaced by 2*pi/count.
        for pair in agents.windows(2) {
            let gap = pair[1].angle - pair[0].angle;
            assert!((gap - TAU / 16.0).abs() < 1.0e-6);
        }
    }

    #[test]
    fn random_distribution_is_marginally_uniform() {
        let (width, height, count) = (512, 256, 4000);
        let agents = spawn_agents(SpawnMode::RandomDistribution, width, height, count, &mut rng());

        let mut sum_x = 0.0_f64;
        let mut sum_y = 0.0_f64;
        for agent in &agents {
            assert!(agent.position[0] >= 0.0 && agent.position[0] < width as f32);
            assert!(agent.position[1] >= 0.0 && agent.position[1] < height as f32);
            assert!(agent.angle >= 0.0 && agent.angle < TAU);
            sum_x += agent.position[0] as f64;
            sum_y += agent.position[1] as f64;
        }

        // Means of uniform marginals sit near the domain midpoints; with
        // n = 4000 a 5% band is comfortably beyond sampling noise.
        let mean_x = sum_x / count as f64;
        let mean_y = sum_y / count as f64;
        assert!((mean_x - 256.0).abs() < 0.05 * 512.0, "mean_x = {mean_x}");
        assert!((mean_y - 128.0).abs() < 0.05 * 256.0, "mean_y = {mean_y}");
    }

    #[test]
    fn circle_disperse_points_inward_from_the_ring() {
        let agents = spawn_agents(SpawnMode::CircleDisperse, 1000, 1000, 64, &mut rng());
        for agent in &agents {
            let dx = agent.position[0] - 500.0;
            let dy = agent.position[1] - 500.0;
            let radius = (dx * dx + dy * dy).sqrt();
            assert!((radius - CIRCLE_RADIUS).abs() < 1.0e-3);
            // Heading is the spawn angle plus pi: pointing back at center.
            let spawn_angle = dy.atan2(dx);
            let inward = spawn_angle + std::f32::consts::PI;
            let diff = (agent.angle - inward).rem_euclid(TAU);
            assert!(diff < 1.0e-3 || diff > TAU - 1.0e-3, "heading not inward");
        }
    }

    #[test]
    fn alongside_wall_spawns_in_left_band() {
        let agents = spawn_agents(SpawnMode::AlongsideWall, 640, 480, 64, &mut rng());
        for agent in &agents {
            assert!(agent.position[0] >= 0.0 && agent.position[0] < WALL_BAND);
            assert!(agent.position[1] >= 0.0 && agent.position[1] < 480.0);
            assert!(agent.angle >= 0.0 && agent.angle < 0.1);
        }
    }

    #[test]
    fn same_seed_spawns_identically() {
        let a = spawn_agents(SpawnMode::RandomDistribution, 128, 128, 100, &mut rng());
        let b = spawn_agents(SpawnMode::RandomDistribution, 128, 128, 100, &mut rng());
        assert_eq!(a, b);
    }
}
