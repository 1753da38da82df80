//! Per-simulation parameters and the uniform blocks derived from them.
//!
//! The `*Uniforms` structs must match the `Params` structs in the WGSL
//! shaders exactly -- field order, widths, and total size are the wire
//! protocol between controller and kernel. Booleans cross the boundary as
//! `u32`. Every block is padded to a 16-byte multiple.

/// Parameters for the slime-agent simulation, CPU-side units.
///
/// Assembled by the configuration layer; immutable for the run.
#[derive(Debug, Clone, Copy)]
pub struct SlimeParams {
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Number of agents.
    pub num_agents: u32,
    /// Inner simulation steps per outer tick.
    pub steps_per_frame: u32,
    /// Fixed timestep per inner step, seconds.
    pub time_step: f32,
    /// Half-width of the square sensor sampling window, pixels.
    pub sensor_size: u32,
    /// Angle between the forward sensor and each side sensor, degrees.
    pub sensor_angle_degrees: f32,
    /// Distance from agent to sensor center, pixels.
    pub sensor_offset_distance: f32,
    /// Agent speed, pixels per second.
    pub move_speed: f32,
    /// Steering rate, radians per second.
    pub turn_speed: f32,
    /// Trail blur rate per second.
    pub diffuse_speed: f32,
    /// Trail decay rate per second.
    pub decay_rate: f32,
    /// Deposit agent positions into the field.
    pub draw_agents: bool,
    /// Keep the diffused trail (false clears the field each step).
    pub draw_trails: bool,
}

/// Parameters for the pendulum-fan simulation, CPU-side units.
///
/// `damp` arrives already scaled by 1/1000; the configuration layer applies
/// that scaling exactly once.
#[derive(Debug, Clone, Copy)]
pub struct PendulumParams {
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Number of pendulums.
    pub quantity: u32,
    /// Inner simulation steps per outer tick.
    pub steps_per_frame: u32,
    /// Fixed timestep per inner step, seconds.
    pub time_step: f32,
    /// Drawn bob footprint, pixels.
    pub size: u32,
    /// Gravitational acceleration.
    pub g: f32,
    /// Angular velocity damping per step (pre-scaled).
    pub damp: f32,
    /// Trail decay rate per second.
    pub decay_rate: f32,
    /// Draw the pendulum bobs.
    pub draw_agents: bool,
    /// Keep the fading trail.
    pub draw_trails: bool,
}

/// Uniform block for `slime.wgsl`. Matches `struct Params` there.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SlimeUniforms {
    pub width: u32,
    pub height: u32,
    pub quantity: u32,
    pub sensor_size: u32,
    pub pi: f32,
    pub delta_time: f32,
    pub time: f32,
    pub move_speed: f32,
    pub turn_speed: f32,
    pub sensor_angle_degrees: f32,
    pub sensor_offset_distance: f32,
    pub diffuse_speed: f32,
    pub decay_rate: f32,
    pub draw_agents: u32,
    pub draw_trails: u32,
    pub _pad: u32,
}

impl SlimeUniforms {
    /// Build the initial block; `delta_time` and `time` are pushed per step.
    pub fn new(p: &SlimeParams) -> Self {
        Self {
            width: p.width,
            height: p.height,
            quantity: p.num_agents,
            sensor_size: p.sensor_size,
            pi: std::f32::consts::PI,
            delta_time: 0.0,
            time: 0.0,
            move_speed: p.move_speed,
            turn_speed: p.turn_speed,
            sensor_angle_degrees: p.sensor_angle_degrees,
            sensor_offset_distance: p.sensor_offset_distance,
            diffuse_speed: p.diffuse_speed,
            decay_rate: p.decay_rate,
            draw_agents: p.draw_agents as u32,
            draw_trails: p.draw_trails as u32,
            _pad: 0,
        }
    }
}

/// Uniform block for `pendulum.wgsl`. Matches `struct Params` there.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PendulumUniforms {
    pub width: u32,
    pub height: u32,
    pub quantity: u32,
    pub pendulum_size: u32,
    pub pi: f32,
    pub g: f32,
    pub damp: f32,
    pub delta_time: f32,
    pub time: f32,
    pub decay_rate: f32,
    pub draw_agents: u32,
    pub draw_trails: u32,
}

impl PendulumUniforms {
    /// Build the initial block; `delta_time` and `time` are pushed per step.
    pub fn new(p: &PendulumParams) -> Self {
        Self {
            width: p.width,
            height: p.height,
            quantity: p.quantity,
            pendulum_size: p.size,
            pi: std::f32::consts::PI,
            g: p.g,
            damp: p.damp,
            delta_time: 0.0,
            time: 0.0,
            decay_rate: p.decay_rate,
            draw_agents: p.draw_agents as u32,
            draw_trails: p.draw_trails as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn uniform_blocks_are_16_byte_aligned() {
        assert_eq!(mem::size_of::<SlimeUniforms>() % 16, 0);
        assert_eq!(mem::size_of::<PendulumUniforms>() % 16, 0);
        assert_eq!(mem::size_of::<SlimeUniforms>(), 64);
        assert_eq!(mem::size_of::<PendulumUniforms>(), 48);
    }

    #[test]
    fn damp_passes_through_unchanged() {
        // The 1/1000 scaling belongs to the configuration layer; the
        // uniform block must not scale again.
        let params = PendulumParams {
            width: 100,
            height: 100,
            quantity: 4,
            steps_per_frame: 1,
            time_step: 0.02,
            size: 2,
            g: 9.81,
            damp: 1.0e-7,
            decay_rate: 0.01,
            draw_agents: true,
            draw_trails: true,
        };
        let uniforms = PendulumUniforms::new(&params);
        assert_eq!(uniforms.damp, 1.0e-7);
    }

    #[test]
    fn booleans_cross_as_u32() {
        let params = SlimeParams {
            width: 64,
            height: 64,
            num_agents: 8,
            steps_per_frame: 1,
            time_step: 0.02,
            sensor_size: 2,
            sensor_angle_degrees: 45.0,
            sensor_offset_distance: 10.0,
            move_speed: 20.0,
            turn_speed: 1.0,
            diffuse_speed: 1.0,
            decay_rate: 0.01,
            draw_agents: true,
            draw_trails: false,
        };
        let uniforms = SlimeUniforms::new(&params);
        assert_eq!(uniforms.draw_agents, 1);
        assert_eq!(uniforms.draw_trails, 0);
        assert_eq!(uniforms.quantity, 8);
    }
}
