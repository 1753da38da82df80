//! Configuration parsing and validation.
//!
//! A run is described by one JSON document, immutable once loaded. Bad
//! values are rejected at load time -- never clamped -- so no frame work
//! starts on a half-valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;

use kernel::{PendulumParams, SlimeParams};

use crate::spawn::SpawnMode;

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable run name.
    pub name: String,
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Inner simulation steps per outer tick (>= 1).
    #[serde(default = "default_steps_per_frame")]
    pub steps_per_frame: u32,
    /// Fixed timestep per inner step, seconds.
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    /// Spawn RNG seed. When absent a seed is drawn from entropy and logged.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Deposit element positions into the field.
    #[serde(default = "default_true")]
    pub draw_agents: bool,
    /// Accumulate trails between steps.
    #[serde(default = "default_true")]
    pub draw_trails: bool,
    /// Which simulation to run, with its specific settings.
    pub simulation: SimulationKind,
}

/// The two supported simulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationKind {
    /// Double-pendulum fan.
    Pendulum(PendulumConfig),
    /// Slime-agent swarm.
    Slime(SlimeConfig),
}

/// Pendulum-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendulumConfig {
    /// Number of pendulums.
    pub quantity: u32,
    /// Drawn bob footprint in pixels.
    #[serde(default = "default_pendulum_size")]
    pub size: u32,
    /// Gravitational acceleration.
    #[serde(default = "default_gravity")]
    pub g: f32,
    /// Velocity damping; scaled by 1/1000 before reaching the kernel.
    #[serde(default = "default_damp")]
    pub damp: f32,
    /// Segment lengths in pixels (upper, lower).
    #[serde(default = "default_lengths")]
    pub lengths: [f32; 2],
    /// Segment masses (upper, lower).
    #[serde(default = "default_masses")]
    pub masses: [f32; 2],
    /// Initial joint angles in degrees (upper, lower).
    #[serde(default = "default_initial_angles")]
    pub initial_angles: [f32; 2],
    /// Per-index angular offset in radians (upper, lower).
    #[serde(default = "default_angle_offsets")]
    pub angle_offsets: [f32; 2],
    /// Trail decay rate per second.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    /// Gradient color at index 0, RGBA.
    #[serde(default = "default_gradient_start")]
    pub gradient_start: [f32; 4],
    /// Gradient color at the last index, RGBA.
    #[serde(default = "default_gradient_end")]
    pub gradient_end: [f32; 4],
}

/// Slime-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlimeConfig {
    /// Number of agents.
    pub num_agents: u32,
    /// Agent speed in pixels per second.
    pub move_speed: f32,
    /// How the swarm is seeded.
    #[serde(default)]
    pub spawn_mode: SpawnMode,
    /// Angle between forward and side sensors, degrees.
    #[serde(default = "default_sensor_angle")]
    pub sensor_angle_degrees: f32,
    /// Half-width of the sensor sampling window, pixels.
    #[serde(default = "default_sensor_size")]
    pub sensor_size: u32,
    /// Distance from agent to sensor center, pixels.
    #[serde(default = "default_sensor_offset")]
    pub sensor_offset_distance: f32,
    /// Steering rate, radians per second.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,
    /// Trail blur rate per second.
    #[serde(default = "default_diffuse_speed")]
    pub diffuse_speed: f32,
    /// Trail decay rate per second.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
}

// Default values

fn default_steps_per_frame() -> u32 {
    1
}

fn default_time_step() -> f32 {
    0.02
}

fn default_true() -> bool {
    true
}

fn default_pendulum_size() -> u32 {
    2
}

fn default_gravity() -> f32 {
    9.81
}

fn default_damp() -> f32 {
    0.0001
}

fn default_lengths() -> [f32; 2] {
    [100.0, 100.0]
}

fn default_masses() -> [f32; 2] {
    [10.0, 10.0]
}

fn default_initial_angles() -> [f32; 2] {
    [-90.0, -90.0]
}

fn default_angle_offsets() -> [f32; 2] {
    [0.001, 0.001]
}

fn default_decay_rate() -> f32 {
    0.01
}

fn default_gradient_start() -> [f32; 4] {
    [0.1, 0.3, 1.0, 1.0]
}

fn default_gradient_end() -> [f32; 4] {
    [1.0, 0.3, 0.1, 1.0]
}

fn default_sensor_angle() -> f32 {
    45.0
}

fn default_sensor_size() -> u32 {
    2
}

fn default_sensor_offset() -> f32 {
    10.0
}

fn default_turn_speed() -> f32 {
    1.0
}

fn default_diffuse_speed() -> f32 {
    1.0
}

impl SimulationConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {}", path, e))?;

        let config: SimulationConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("failed to parse config JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject invalid values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 {
            return Err("width must be positive".to_string());
        }
        if self.height == 0 {
            return Err("height must be positive".to_string());
        }
        if self.steps_per_frame < 1 {
            return Err("steps_per_frame must be at least 1".to_string());
        }
        if self.time_step <= 0.0 {
            return Err("time_step must be positive".to_string());
        }

        match &self.simulation {
            SimulationKind::Pendulum(p) => p.validate(),
            SimulationKind::Slime(s) => s.validate(),
        }
    }

    /// Number of elements in the configured simulation.
    pub fn element_count(&self) -> u32 {
        match &self.simulation {
            SimulationKind::Pendulum(p) => p.quantity,
            SimulationKind::Slime(s) => s.num_agents,
        }
    }
}

impl PendulumConfig {
    fn validate(&self) -> Result<(), String> {
        if self.quantity == 0 {
            return Err("quantity must be positive".to_string());
        }
        if self.size == 0 {
            return Err("size must be positive".to_string());
        }
        if self.lengths[0] <= 0.0 || self.lengths[1] <= 0.0 {
            return Err("segment lengths must be positive".to_string());
        }
        if self.masses[0] <= 0.0 || self.masses[1] <= 0.0 {
            return Err("segment masses must be positive".to_string());
        }
        if self.decay_rate < 0.0 {
            return Err("decay_rate must be non-negative".to_string());
        }
        Ok(())
    }

    /// Kernel-side parameters for this configuration.
    ///
    /// This is the single place the `damp / 1000` scaling is applied.
    pub fn kernel_params(&self, common: &SimulationConfig) -> PendulumParams {
        PendulumParams {
            width: common.width,
            height: common.height,
            quantity: self.quantity,
            steps_per_frame: common.steps_per_frame,
            time_step: common.time_step,
            size: self.size,
            g: self.g,
            damp: self.damp / 1000.0,
            decay_rate: self.decay_rate,
            draw_agents: common.draw_agents,
            draw_trails: common.draw_trails,
        }
    }
}

impl SlimeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.num_agents == 0 {
            return Err("num_agents must be positive".to_string());
        }
        if self.move_speed < 0.0 {
            return Err("move_speed must be non-negative".to_string());
        }
        if self.sensor_offset_distance < 0.0 {
            return Err("sensor_offset_distance must be non-negative".to_string());
        }
        if self.diffuse_speed < 0.0 || self.decay_rate < 0.0 {
            return Err("diffuse_speed and decay_rate must be non-negative".to_string());
        }
        Ok(())
    }

    /// Kernel-side parameters for this configuration.
    pub fn kernel_params(&self, common: &SimulationConfig) -> SlimeParams {
        SlimeParams {
            width: common.width,
            height: common.height,
            num_agents: self.num_agents,
            steps_per_frame: common.steps_per_frame,
            time_step: common.time_step,
            sensor_size: self.sensor_size,
            sensor_angle_degrees: self.sensor_angle_degrees,
            sensor_offset_distance: self.sensor_offset_distance,
            move_speed: self.move_speed,
            turn_speed: self.turn_speed,
            diffuse_speed: self.diffuse_speed,
            decay_rate: self.decay_rate,
            draw_agents: common.draw_agents,
            draw_trails: common.draw_trails,
        }
    }
}
