// in-memory simulation configuration, validated once into `SimParams`
use bevy::prelude::Resource;
use glam::{UVec3, Vec3};

use crate::cpu::params::SimParams;
use crate::error::SphResult;

pub const DEFAULT_MAX_PARTICLES: u32 = 1 << 21;

#[derive(Resource, Clone, Debug)]
pub struct SimConfig {
    // spawn lattice
    pub spawn_counts: UVec3,
    pub spawn_point: Vec3,
    pub particle_radius: f32,
    pub spawn_jitter: f32, // fraction of particle_radius
    pub seed: Option<u64>, // None = random every run

    // bounding volume, full size; the box is centered on the origin
    pub box_size: Vec3,

    // physics
    pub smoothing_radius: f32, // h
    pub particle_mass: f32,
    pub viscosity: f32,
    pub gas_constant: f32,
    pub resting_density: f32,
    pub boundary_damping: f32, // must be <= 0
    pub gravity: Vec3,
    pub timestep: f32,
    pub density_floor: f32,

    pub max_particles: u32,

    // read by the renderers only
    pub particle_render_size: f32,
    pub view_radius: f32,
    pub blend_strength: f32,
    pub water_color: [f32; 4],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            spawn_counts: UVec3::new(10, 10, 10),
            spawn_point: Vec3::ZERO,
            particle_radius: 0.1,
            spawn_jitter: 0.2,
            seed: None,
            box_size: Vec3::new(4.0, 10.0, 3.0),
            smoothing_radius: 1.0,
            particle_mass: 1.0,
            viscosity: 0.003,
            gas_constant: 2.0,
            resting_density: 1.0,
            boundary_damping: -0.3,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            timestep: 0.007,
            density_floor: 1e-6,
            max_particles: DEFAULT_MAX_PARTICLES,
            particle_render_size: 8.0,
            view_radius: 0.1,
            blend_strength: 0.5,
            water_color: [0.1, 0.4, 0.9, 1.0],
        }
    }
}

impl SimConfig {
    pub fn half_extents(&self) -> Vec3 {
        self.box_size * 0.5
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn total_particles(&self) -> u64 {
        self.spawn_counts.x as u64 * self.spawn_counts.y as u64 * self.spawn_counts.z as u64
    }

    pub fn params(&self) -> SphResult<SimParams> {
        SimParams::from_config(self)
    }
}
