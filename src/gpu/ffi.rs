use bytemuck::{Pod, Zeroable};

use crate::cpu::params::SimParams;
use crate::cpu::particle::Particle;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GPUParticle {
    // not using glam to make sure WGSL compatibility
    pub pressure: f32,
    pub density: f32,
    pub force: [f32; 3],
    pub vel: [f32; 3],
    pub pos: [f32; 3],
}

// the shaders index the buffer with a 44 byte stride
pub const GPU_PARTICLE_SIZE: usize = 44;
const _: () = assert!(std::mem::size_of::<GPUParticle>() == GPU_PARTICLE_SIZE);

impl From<&Particle> for GPUParticle {
    fn from(p: &Particle) -> Self {
        Self {
            pressure: p.pressure,
            density: p.density,
            force: p.force.to_array(),
            vel: p.velocity.to_array(),
            pos: p.position.to_array(),
        }
    }
}

impl From<&GPUParticle> for Particle {
    fn from(p: &GPUParticle) -> Self {
        Self {
            pressure: p.pressure,
            density: p.density,
            force: p.force.into(),
            velocity: p.vel.into(),
            position: p.pos.into(),
        }
    }
}

// same layout as wgpu's indexed indirect draw arguments
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32, // = number of particles
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    pub fn for_mesh(index_count: u32, first_index: u32, base_vertex: i32, num_particles: u32) -> Self {
        Self {
            index_count,
            instance_count: num_particles,
            first_index,
            base_vertex,
            first_instance: 0,
        }
    }
}

// uniform block, rows of 16 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GPUSimParams {
    pub h: f32,
    pub h2: f32,
    pub h3: f32,
    pub h4: f32,

    pub h5: f32,
    pub mass: f32,
    pub viscosity: f32,
    pub gas_constant: f32,

    pub resting_density: f32,
    pub boundary_damping: f32,
    pub dt: f32,
    pub density_floor: f32,

    pub half_extents: [f32; 3],
    pub num_particles: u32,

    pub gravity: [f32; 3],
    pub _pad0: f32,

    pub poly6_coeff: f32,
    pub spiky_grad_coeff: f32,
    pub visc_lap_coeff: f32,
    pub _pad1: f32,
}

impl GPUSimParams {
    pub fn new(params: &SimParams, num_particles: u32) -> Self {
        Self {
            h: params.h,
            h2: params.h2,
            h3: params.h3,
            h4: params.h4,
            h5: params.h5,
            mass: params.mass,
            viscosity: params.viscosity,
            gas_constant: params.gas_constant,
            resting_density: params.resting_density,
            boundary_damping: params.boundary_damping,
            dt: params.dt,
            density_floor: params.density_floor,
            half_extents: params.half_extents.to_array(),
            num_particles,
            gravity: params.gravity.to_array(),
            _pad0: 0.0,
            poly6_coeff: params.poly6_coeff,
            spiky_grad_coeff: params.spiky_grad_coeff,
            visc_lap_coeff: params.visc_lap_coeff,
            _pad1: 0.0,
        }
    }
}

// inputs of the volumetric compositing pass
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GPURaymarchParams {
    pub water_color: [f32; 4],
    pub num_particles: u32,
    pub sphere_radius: f32,
    pub blend_strength: f32,
    pub _pad: f32,
}
