use bevy::prelude::*;
use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer,
    BufferBindingType, BufferInitDescriptor, BufferUsages, ShaderStages,
};
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy::render::Extract;

use crate::cpu::pipeline::SphPipeline;
use crate::error::{SphError, SphResult};
use crate::gpu::ffi::{GPUParticle, GPURaymarchParams, GPUSimParams, GPU_PARTICLE_SIZE};

// ==================== resources ======================================

// read-only view of the particle store for the renderers:
// binding(0): particles (storage), binding(1): GPUSimParams, binding(2): GPURaymarchParams
#[derive(Resource, Clone)]
pub struct ParticleBindGroupLayout(pub BindGroupLayout);

#[derive(Resource, Clone)]
pub struct ParticleBindGroup(pub BindGroup);

#[derive(Resource)]
pub struct ParticleBuffers {
    pub particle_buffer: Buffer,
    pub args_buffer: Buffer,
    pub params_buffer: Buffer,
    pub raymarch_buffer: Buffer,
    pub num_particles: u32,
    staging: Vec<GPUParticle>, // reused every frame
}

// Rendering world Copy
#[derive(Resource, Clone)]
pub struct ExtractedParticleBuffer {
    pub buffer: Buffer,
    pub args_buffer: Buffer,
    pub params_buffer: Buffer,
    pub raymarch_buffer: Buffer,
    pub num_particles: u32,
}

// =====================================================================

/// Bytes needed for `num_particles`, or a capacity error if a single storage
/// binding can't hold them.
pub fn particle_buffer_size(num_particles: usize, max_binding_size: u64) -> SphResult<u64> {
    let capacity_error = || SphError::Capacity {
        requested: num_particles as u64,
        limit: max_binding_size / GPU_PARTICLE_SIZE as u64,
    };
    let bytes = (num_particles as u64)
        .checked_mul(GPU_PARTICLE_SIZE as u64)
        .ok_or_else(capacity_error)?;
    if bytes > max_binding_size {
        return Err(capacity_error());
    }
    Ok(bytes)
}

// packs the store; keeps at least one element so the binding is never empty
fn fill_staging(staging: &mut Vec<GPUParticle>, sph: &SphPipeline) {
    let particles = sph.particles();
    if staging.len() != particles.len().max(1) {
        staging.resize(particles.len().max(1), GPUParticle::default());
    }
    for (dst, src) in staging.iter_mut().zip(particles) {
        *dst = GPUParticle::from(src);
    }
}

impl ParticleBuffers {
    pub fn new(render_device: &RenderDevice, sph: &SphPipeline) -> SphResult<Self> {
        let max_binding = render_device.limits().max_storage_buffer_binding_size as u64;
        particle_buffer_size(sph.particles().len(), max_binding)?;

        let mut staging = Vec::new();
        fill_staging(&mut staging, sph);
        let num_particles = sph.particles().len() as u32;

        // storage buffer with the init data
        let particle_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("sph_particle_buffer"),
            contents: bytemuck::cast_slice(&staging),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
        });

        let args_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("sph_draw_args"),
            contents: bytemuck::bytes_of(&sph.draw_args()),
            usage: BufferUsages::INDIRECT | BufferUsages::STORAGE | BufferUsages::COPY_DST,
        });

        let params = GPUSimParams::new(sph.params(), num_particles);
        let params_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("sph_params_uniform"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let raymarch = sph.volumetric_view().gpu_params();
        let raymarch_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("sph_raymarch_uniform"),
            contents: bytemuck::bytes_of(&raymarch),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        Ok(Self {
            particle_buffer,
            args_buffer,
            params_buffer,
            raymarch_buffer,
            num_particles,
            staging,
        })
    }
}

// ========================== systems ==================================

// Startup, after the simulation exists
pub fn init_gpu_buffers(
    mut commands: Commands,
    render_device: Option<Res<RenderDevice>>, // so headless runs still work
    sph: Option<Res<SphPipeline>>,
) {
    let (Some(render_device), Some(sph)) = (render_device, sph) else {
        return;
    };
    match ParticleBuffers::new(&render_device, &sph) {
        Ok(buffers) => {
            info!("particle buffers READY ({} particles)", buffers.num_particles);
            commands.insert_resource(buffers);
        }
        Err(err) => error!("particle buffers not created: {err}"),
    }
}

impl ParticleBindGroupLayout {
    pub fn new(render_device: &RenderDevice) -> Self {
        let visibility = ShaderStages::VERTEX | ShaderStages::FRAGMENT | ShaderStages::COMPUTE;
        let uniform = |binding| BindGroupLayoutEntry {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = render_device.create_bind_group_layout(
            Some("sph_particle_bind_group_layout"),
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                uniform(1),
                uniform(2),
            ],
        );
        Self(layout)
    }
}

// Update, after the fixed ticks of this frame
pub fn queue_particle_buffer(
    sph: Option<Res<SphPipeline>>,
    particle_buffers: Option<ResMut<ParticleBuffers>>,
    render_queue: Option<Res<RenderQueue>>,
) {
    let (Some(sph), Some(mut buffers), Some(render_queue)) = (sph, particle_buffers, render_queue)
    else {
        return;
    };
    let buffers = &mut *buffers;

    fill_staging(&mut buffers.staging, &sph);
    render_queue.write_buffer(&buffers.particle_buffer, 0, bytemuck::cast_slice(&buffers.staging));

    // bounds / dt / render settings may have been reconfigured
    let params = GPUSimParams::new(sph.params(), buffers.num_particles);
    render_queue.write_buffer(&buffers.params_buffer, 0, bytemuck::bytes_of(&params));
    let raymarch: GPURaymarchParams = sph.volumetric_view().gpu_params();
    render_queue.write_buffer(&buffers.raymarch_buffer, 0, bytemuck::bytes_of(&raymarch));
    render_queue.write_buffer(&buffers.args_buffer, 0, bytemuck::bytes_of(&sph.draw_args()));
}

// Extract systems that send from App to Render

pub fn extract_particle_buffer(
    mut commands: Commands,
    particle_buffers: Extract<Option<Res<ParticleBuffers>>>,
) {
    let Some(buffers) = particle_buffers.as_ref() else {
        return;
    };
    commands.insert_resource(ExtractedParticleBuffer {
        buffer: buffers.particle_buffer.clone(),
        args_buffer: buffers.args_buffer.clone(),
        params_buffer: buffers.params_buffer.clone(),
        raymarch_buffer: buffers.raymarch_buffer.clone(),
        num_particles: buffers.num_particles,
    });
}

// Render world

// the extracted buffers are created once at startup, so the bind group is too
pub fn prepare_particle_bind_group(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    layout: Option<Res<ParticleBindGroupLayout>>,
    extracted: Option<Res<ExtractedParticleBuffer>>,
    existing: Option<Res<ParticleBindGroup>>,
) {
    if existing.is_some() {
        return;
    }
    let (Some(layout), Some(extracted)) = (layout, extracted) else {
        return;
    };
    let bind_group = render_device.create_bind_group(
        Some("sph_particle_bind_group"),
        &layout.0,
        &[
            BindGroupEntry {
                binding: 0,
                resource: extracted.buffer.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: extracted.params_buffer.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: extracted.raymarch_buffer.as_entire_binding(),
            },
        ],
    );
    commands.insert_resource(ParticleBindGroup(bind_group));
}
