//! GPU trail-field simulation kernel.
//!
//! This crate owns everything that crosses the CPU/GPU boundary for the two
//! simulations (double-pendulum fan, slime-agent swarm):
//!
//! - [`element`] -- plain-data records shared with the shaders, and the
//!   layout contract that keeps both sides bit-identical.
//! - [`dispatch`] -- thread-group sizing that covers an arbitrary domain
//!   with a fixed group shape.
//! - [`gpu`] -- device bring-up, state buffers, the ping-pong feedback
//!   surface, and the per-step simulation engines.
//!
//! The numerical kernels themselves (WGSL, under `gpu/shaders/`) are opaque
//! data-parallel functions; the crate defines and enforces the contract they
//! run under, not their math.

#![warn(missing_docs)]

pub mod dispatch;
pub mod element;

#[allow(missing_docs)]
pub mod gpu;

pub use dispatch::{DegenerateGroupShape, GroupCount, GroupShape};
pub use element::{AgentState, DeviceRecord, PendulumState};
pub use gpu::buffers::{LayoutMismatch, StateBuffer};
pub use gpu::engine::{EngineError, PendulumSim, SlimeSim};
pub use gpu::params::{PendulumParams, SlimeParams};
pub use gpu::surface::{FeedbackSurface, FieldImage};
pub use gpu::{gpu_available, GpuContext, GpuInitError};

/// Trait implemented by both GPU simulation engines.
///
/// A `Simulation` owns its device resources and advances in fixed-order
/// steps: upload state, push per-step scalars, dispatch the field kernel
/// over the 2D domain, dispatch the element kernel over the element range,
/// swap the feedback surface, and mark element state for lazy download.
pub trait Simulation {
    /// Execute one inner simulation step.
    fn step(&mut self);

    /// Execute one outer tick: `steps_per_frame` inner steps, sequentially.
    fn tick(&mut self);

    /// Read back the current field as a presentable CPU image.
    fn present(&mut self) -> FieldImage;

    /// Total inner steps executed so far.
    fn steps(&self) -> u64;

    /// Accumulated simulation time in seconds.
    fn time(&self) -> f32;

    /// Field dimensions in pixels.
    fn dimensions(&self) -> (u32, u32);
}
