//! GPU (wgpu) backend: device bring-up, buffers, surfaces, and the
//! simulation engines.
//!
//! Everything that talks to the device lives under this module. The
//! submodules split along the resource boundaries:
//!
//! - [`buffers`] -- element state buffers and CPU<->GPU marshaling.
//! - [`surface`] -- the ping-pong feedback field and image readback.
//! - [`params`] -- uniform blocks mirroring the shader `Params` structs.
//! - [`engine`] -- the per-step pipeline for both simulations.

pub mod buffers;
pub mod engine;
pub mod params;
pub mod surface;

use std::error::Error;
use std::fmt;

/// Error returned when no usable GPU device can be acquired.
#[derive(Debug)]
pub struct GpuInitError(pub String);

impl fmt::Display for GpuInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU initialization failed: {}", self.0)
    }
}

impl Error for GpuInitError {}

/// Check whether a GPU adapter is available without creating a device.
pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }));
    adapter.is_some()
}

/// Owned device handle shared by every GPU resource of one simulation.
pub struct GpuContext {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The submission queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Acquire a high-performance adapter and create a device on it.
    ///
    /// Fails with [`GpuInitError`] when no adapter is present or device
    /// creation is refused, so callers can abort before any frame work.
    pub fn new() -> Result<Self, GpuInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GpuInitError("no suitable GPU adapter found".into()))?;

        tracing::info!("GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sim_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| GpuInitError(format!("failed to create device: {e}")))?;

        Ok(Self { device, queue })
    }
}
