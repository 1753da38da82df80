//! End-to-end engine steps on a real device.
//!
//! Verifies the per-step pipeline actually moves elements and produces a
//! presentable field. Skips gracefully on machines without a GPU adapter.

use kernel::{
    AgentState, GpuContext, PendulumParams, PendulumSim, PendulumState, Simulation, SlimeParams,
    SlimeSim,
};

const TAU: f32 = std::f32::consts::TAU;

fn small_slime_params() -> SlimeParams {
    SlimeParams {
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
        draw_trails: true,
    }
}

fn central_fan(count: u32, width: u32, height: u32) -> Vec<AgentState> {
    (0..count)
        .map(|i| AgentState {
            position: [width as f32 / 2.0, height as f32 / 2.0],
            angle: TAU * i as f32 / count as f32,
        })
        .collect()
}

#[test]
fn agents_advance_by_move_speed_on_empty_field() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping agents_advance_by_move_speed_on_empty_field: {e}");
            return;
        }
    };

    let params = small_slime_params();
    let spawned = central_fan(params.num_agents, params.width, params.height);
    let mut sim = SlimeSim::new(ctx, params, spawned.clone()).unwrap();

    sim.tick();
    assert_eq!(sim.steps(), 1);

    // On an all-zero field every sensor weight ties, so headings hold and
    // each agent travels exactly move_speed * dt along its spawn heading.
    let expected_dist = params.move_speed * params.time_step;
    let agents = sim.agents();
    assert_eq!(agents.len(), spawned.len());
    for (after, before) in agents.iter().zip(&spawned) {
        let dx = after.position[0] - before.position[0];
        let dy = after.position[1] - before.position[1];
        let dist = (dx * dx + dy * dy).sqrt();
        // GPU sin/cos carry a few thousandths of absolute error.
        assert!(
            (dist - expected_dist).abs() < 1.0e-2,
            "agent moved {dist}, expected {expected_dist}"
        );
        assert!(
            (after.angle - before.angle).abs() < 1.0e-6,
            "heading changed on an empty field"
        );
    }
}

#[test]
fn agents_deposit_into_presented_field() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping agents_deposit_into_presented_field: {e}");
            return;
        }
    };

    let params = small_slime_params();
    let spawned = central_fan(params.num_agents, params.width, params.height);
    let mut sim = SlimeSim::new(ctx, params, spawned).unwrap();

    sim.tick();
    let image = sim.present();
    assert_eq!(image.width, 64);
    assert_eq!(image.height, 64);

    let lit = image.pixels.iter().filter(|&&v| v > 0.0).count();
    assert!(lit > 0, "no trail deposited after a step");
}

#[test]
fn pendulum_fan_diverges_under_integration() {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping pendulum_fan_diverges_under_integration: {e}");
            return;
        }
    };

    let params = PendulumParams {
        width: 100,
        height: 100,
        quantity: 4,
        steps_per_frame: 2,
        time_step: 0.01,
        size: 2,
        g: 9.81,
        damp: 1.0e-7,
        decay_rate: 0.01,
        draw_agents: true,
        draw_trails: true,
    };

    let base = -90.0_f32.to_radians();
    let spawned: Vec<PendulumState> = (0..4)
        .map(|i| PendulumState {
            angles: [base + 0.001 * i as f32, base + 0.001 * i as f32],
            lengths: [30.0, 30.0],
            masses: [10.0, 10.0],
            velocity: [0.0, 0.0],
            acceleration: [0.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
        })
        .collect();

    let mut sim = PendulumSim::new(ctx, params, spawned.clone()).unwrap();
    sim.tick();
    assert_eq!(sim.steps(), 2);

    let after = sim.pendulums();
    for (p, initial) in after.iter().zip(&spawned) {
        // At -90 degrees gravity torques the upper joint, so angles and
        // accelerations must have moved off their spawn values.
        assert!(p.angles[0] != initial.angles[0], "angle did not integrate");
        assert!(p.acceleration[0] != 0.0, "acceleration not written back");
        // Colors never change on the device.
        assert_eq!(p.color, initial.color);
        assert_eq!(p.lengths, initial.lengths);
    }
}
