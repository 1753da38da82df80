//! Simulation engines: the fixed per-step pipeline for both simulations.
//!
//! Each step runs in a load-bearing order: the field pass (diffusion/trail
//! fade) reads the previous step's field before the element pass mutates
//! state and deposits into the new field, so elements always sense a fully
//! formed previous frame. The surface swap afterwards makes the new field
//! presentable.

use std::error::Error;
use std::fmt;

use wgpu::util::DeviceExt;

use crate::dispatch::{self, DegenerateGroupShape, GroupCount, GroupShape};
use crate::element::{AgentState, PendulumState};
use crate::gpu::buffers::{LayoutMismatch, StateBuffer};
use crate::gpu::params::{PendulumParams, PendulumUniforms, SlimeParams, SlimeUniforms};
use crate::gpu::surface::{FeedbackSurface, FieldImage, FIELD_FORMAT};
use crate::gpu::GpuContext;
use crate::Simulation;

/// Group shape of the 2D field kernels (`@workgroup_size(8, 8, 1)`).
pub const FIELD_GROUP: GroupShape = GroupShape::planar(8, 8);
/// Group shape of the 1D element kernels (`@workgroup_size(64, 1, 1)`).
pub const ELEMENT_GROUP: GroupShape = GroupShape::linear(64);

/// Fatal error while building a simulation engine.
#[derive(Debug)]
pub enum EngineError {
    /// CPU/shader record layout mismatch.
    Layout(LayoutMismatch),
    /// A kernel group shape with zero lanes on some axis.
    Dispatch(DegenerateGroupShape),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Layout(e) => write!(f, "{e}"),
            EngineError::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EngineError {}

impl From<LayoutMismatch> for EngineError {
    fn from(e: LayoutMismatch) -> Self {
        EngineError::Layout(e)
    }
}

impl From<DegenerateGroupShape> for EngineError {
    fn from(e: DegenerateGroupShape) -> Self {
        EngineError::Dispatch(e)
    }
}

/// Pipelines, layouts, and dispatch plans shared by both engines.
struct SimPipeline {
    uniform_buffer: wgpu::Buffer,
    field_pipeline: wgpu::ComputePipeline,
    element_pipeline: wgpu::ComputePipeline,
    bgl_field: wgpu::BindGroupLayout,
    bgl_element: wgpu::BindGroupLayout,
    field_groups: GroupCount,
    element_groups: GroupCount,
    // Slime agents sense the previous field; pendulum integration does not.
    element_reads_field: bool,
}

impl SimPipeline {
    #[allow(clippy::too_many_arguments)]
    fn new(
        device: &wgpu::Device,
        label: &str,
        shader_source: &str,
        field_entry: &str,
        element_entry: &str,
        initial_uniforms: &[u8],
        element_reads_field: bool,
        field_domain: (u32, u32),
        element_count: u32,
    ) -> Result<Self, DegenerateGroupShape> {
        let field_groups = dispatch::plan((field_domain.0, field_domain.1, 1), FIELD_GROUP)?;
        let element_groups = dispatch::plan((element_count, 1, 1), ELEMENT_GROUP)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bgl_field = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field_bgl"),
            entries: &[
                bgl_uniform(0),
                bgl_texture(1),
                bgl_storage_texture(2),
            ],
        });

        let mut element_entries = vec![bgl_uniform(0)];
        if element_reads_field {
            element_entries.push(bgl_texture(1));
        }
        element_entries.push(bgl_storage_texture(2));
        element_entries.push(bgl_storage_rw(3));
        let bgl_element = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("element_bgl"),
            entries: &element_entries,
        });

        let field_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("field_pl"),
            bind_group_layouts: &[&bgl_field],
            push_constant_ranges: &[],
        });
        let element_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("element_pl"),
            bind_group_layouts: &[&bgl_element],
            push_constant_ranges: &[],
        });

        let field_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(field_entry),
            layout: Some(&field_layout),
            module: &shader,
            entry_point: Some(field_entry),
            compilation_options: Default::default(),
            cache: None,
        });
        let element_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(element_entry),
            layout: Some(&element_layout),
            module: &shader,
            entry_point: Some(element_entry),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sim_uniforms"),
            contents: initial_uniforms,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            uniform_buffer,
            field_pipeline,
            element_pipeline,
            bgl_field,
            bgl_element,
            field_groups,
            element_groups,
            element_reads_field,
        })
    }

    /// Encode and submit the two dispatches of one step.
    ///
    /// The field pass reads the surface's current texture and writes the
    /// standby one; the element pass mutates the state buffer and deposits
    /// into the same standby texture. Never reads and writes one texture in
    /// the same dispatch.
    fn submit_step(
        &self,
        ctx: &GpuContext,
        surface: &FeedbackSurface,
        state: &wgpu::Buffer,
    ) {
        let device = &ctx.device;

        let field_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field_bg"),
            layout: &self.bgl_field,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(surface.read_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(surface.write_view()),
                },
            ],
        });

        let mut element_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        }];
        if self.element_reads_field {
            element_entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(surface.read_view()),
            });
        }
        element_entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::TextureView(surface.write_view()),
        });
        element_entries.push(wgpu::BindGroupEntry {
            binding: 3,
            resource: state.as_entire_binding(),
        });
        let element_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("element_bg"),
            layout: &self.bgl_element,
            entries: &element_entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sim_step"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("field_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.field_pipeline);
            pass.set_bind_group(0, &field_bg, &[]);
            pass.dispatch_workgroups(
                self.field_groups.x,
                self.field_groups.y,
                self.field_groups.z,
            );
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("element_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.element_pipeline);
            pass.set_bind_group(0, &element_bg, &[]);
            pass.dispatch_workgroups(
                self.element_groups.x,
                self.element_groups.y,
                self.element_groups.z,
            );
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Trail-following agent swarm on the GPU.
pub struct SlimeSim {
    ctx: GpuContext,
    pipe: SimPipeline,
    state: StateBuffer<AgentState>,
    surface: FeedbackSurface,
    uniforms: SlimeUniforms,
    steps_per_frame: u32,
    dt: f32,
    time: f32,
    steps: u64,
}

impl SlimeSim {
    /// Build pipelines and resources for a run with the given parameters
    /// and initial agents.
    pub fn new(
        ctx: GpuContext,
        params: SlimeParams,
        agents: Vec<AgentState>,
    ) -> Result<Self, EngineError> {
        let uniforms = SlimeUniforms::new(&params);
        let state = StateBuffer::new(&ctx.device, agents)?;
        let surface = FeedbackSurface::new(&ctx.device, params.width, params.height);
        let pipe = SimPipeline::new(
            &ctx.device,
            "slime",
            include_str!("shaders/slime.wgsl"),
            "diffuse",
            "update",
            bytemuck::bytes_of(&uniforms),
            true,
            (params.width, params.height),
            params.num_agents,
        )?;

        tracing::info!(
            "slime simulation ready: {}x{} field, {} agents",
            params.width,
            params.height,
            state.len(),
        );

        Ok(Self {
            ctx,
            pipe,
            state,
            surface,
            uniforms,
            steps_per_frame: params.steps_per_frame,
            dt: params.time_step,
            time: 0.0,
            steps: 0,
        })
    }

    /// Current agent records, downloading from the device if stale.
    pub fn agents(&mut self) -> &[AgentState] {
        self.state.synced(&self.ctx.device, &self.ctx.queue)
    }
}

impl Simulation for SlimeSim {
    fn step(&mut self) {
        self.state.upload(&self.ctx.queue);
        self.uniforms.delta_time = self.dt;
        self.uniforms.time = self.time;
        self.ctx
            .queue
            .write_buffer(&self.pipe.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        self.pipe.submit_step(&self.ctx, &self.surface, self.state.storage());
        self.surface.swap();
        self.state.mark_device_dirty();
        self.time += self.dt;
        self.steps += 1;
    }

    fn tick(&mut self) {
        for _ in 0..self.steps_per_frame {
            self.step();
        }
    }

    fn present(&mut self) -> FieldImage {
        self.surface.present(&self.ctx.device, &self.ctx.queue)
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }
}

/// Double-pendulum fan on the GPU.
pub struct PendulumSim {
    ctx: GpuContext,
    pipe: SimPipeline,
    state: StateBuffer<PendulumState>,
    surface: FeedbackSurface,
    uniforms: PendulumUniforms,
    steps_per_frame: u32,
    dt: f32,
    time: f32,
    steps: u64,
}

impl PendulumSim {
    /// Build pipelines and resources for a run with the given parameters
    /// and initial pendulums.
    pub fn new(
        ctx: GpuContext,
        params: PendulumParams,
        pendulums: Vec<PendulumState>,
    ) -> Result<Self, EngineError> {
        let uniforms = PendulumUniforms::new(&params);
        let state = StateBuffer::new(&ctx.device, pendulums)?;
        let surface = FeedbackSurface::new(&ctx.device, params.width, params.height);
        let pipe = SimPipeline::new(
            &ctx.device,
            "pendulum",
            include_str!("shaders/pendulum.wgsl"),
            "trail",
            "integrate",
            bytemuck::bytes_of(&uniforms),
            false,
            (params.width, params.height),
            params.quantity,
        )?;

        tracing::info!(
            "pendulum simulation ready: {}x{} field, {} pendulums",
            params.width,
            params.height,
            state.len(),
        );

        Ok(Self {
            ctx,
            pipe,
            state,
            surface,
            uniforms,
            steps_per_frame: params.steps_per_frame,
            dt: params.time_step,
            time: 0.0,
            steps: 0,
        })
    }

    /// Current pendulum records, downloading from the device if stale.
    pub fn pendulums(&mut self) -> &[PendulumState] {
        self.state.synced(&self.ctx.device, &self.ctx.queue)
    }
}

impl Simulation for PendulumSim {
    fn step(&mut self) {
        self.state.upload(&self.ctx.queue);
        self.uniforms.delta_time = self.dt;
        self.uniforms.time = self.time;
        self.ctx
            .queue
            .write_buffer(&self.pipe.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        self.pipe.submit_step(&self.ctx, &self.surface, self.state.storage());
        self.surface.swap();
        self.state.mark_device_dirty();
        self.time += self.dt;
        self.steps += 1;
    }

    fn tick(&mut self) {
        for _ in 0..self.steps_per_frame {
            self.step();
        }
    }

    fn present(&mut self) -> FieldImage {
        self.surface.present(&self.ctx.device, &self.ctx.queue)
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }
}

// ---- Bind group layout entry helpers ----

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_rw(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_texture(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn bgl_storage_texture(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: FIELD_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}
