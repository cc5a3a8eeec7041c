// drives the simulation: spawn once, then density -> forces -> integration per tick
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::log::{debug, info, warn};
use bevy::prelude::Resource;

use crate::config::SimConfig;
use crate::cpu::params::SimParams;
use crate::cpu::particle::{Particle, ParticleStore};
use crate::cpu::spawn::{rng_from_seed, Lattice};
use crate::cpu::stages::{density_pressure, forces, integrate};
use crate::error::SphResult;
use crate::gpu::ffi::{DrawIndirectArgs, GPURaymarchParams};

/// Index range of the mesh the renderer instances once per particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstanceMesh {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct RenderSettings {
    particle_radius: f32,
    render_size: f32,
    view_radius: f32,
    blend_strength: f32,
    water_color: [f32; 4],
}

impl RenderSettings {
    fn from_config(config: &SimConfig) -> Self {
        Self {
            particle_radius: config.particle_radius,
            render_size: config.particle_render_size,
            view_radius: config.view_radius,
            blend_strength: config.blend_strength,
            water_color: config.water_color,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimStats {
    pub tick: u64,
    pub min_density: f32,
    pub max_density: f32,
    pub mean_density: f32,
    pub max_speed: f32,
    pub recovered: usize,
}

impl SimStats {
    pub fn measure(particles: &[Particle], tick: u64, recovered: usize) -> Self {
        if particles.is_empty() {
            return Self { tick, recovered, ..Default::default() };
        }
        let mut min_density = f32::INFINITY;
        let mut max_density = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut max_speed2 = 0.0f32;
        for p in particles {
            min_density = min_density.min(p.density);
            max_density = max_density.max(p.density);
            sum += p.density as f64;
            max_speed2 = max_speed2.max(p.velocity.length_squared());
        }
        Self {
            tick,
            min_density,
            max_density,
            mean_density: (sum / particles.len() as f64) as f32,
            max_speed: max_speed2.sqrt(),
            recovered,
        }
    }
}

/// What the instanced particle renderer needs.
#[derive(Clone, Copy, Debug)]
pub struct RenderView<'a> {
    pub particles: &'a [Particle],
    pub draw_args: DrawIndirectArgs,
    pub render_size: f32,
}

/// What the volumetric compositing pass needs. Camera and depth buffer come
/// from the host.
#[derive(Clone, Copy, Debug)]
pub struct VolumetricView<'a> {
    pub particles: &'a [Particle],
    pub sphere_radius: f32,
    pub blend_strength: f32,
    pub water_color: [f32; 4],
}

impl VolumetricView<'_> {
    pub fn gpu_params(&self) -> GPURaymarchParams {
        GPURaymarchParams {
            water_color: self.water_color,
            num_particles: self.particles.len() as u32,
            sphere_radius: self.sphere_radius,
            blend_strength: self.blend_strength,
            _pad: 0.0,
        }
    }
}

#[derive(Resource, Debug)]
pub struct SphPipeline {
    store: ParticleStore,
    params: SimParams,
    draw_args: DrawIndirectArgs,
    render: RenderSettings,
    tick: u64,
    last_stats: SimStats,
}

impl SphPipeline {
    pub fn initialize(config: &SimConfig) -> SphResult<Self> {
        Self::initialize_with_mesh(config, InstanceMesh::default())
    }

    /// Validates the config, spawns the lattice and builds the draw arguments.
    /// Fails before anything is allocated for the store if the config is invalid.
    pub fn initialize_with_mesh(config: &SimConfig, mesh: InstanceMesh) -> SphResult<Self> {
        let params = SimParams::from_config(config)?;

        let lattice = Lattice::from_config(config);
        let mut rng = rng_from_seed(config.seed);
        let particles = lattice.spawn(&mut rng, config.max_particles)?;
        let store = ParticleStore::from_particles(particles, config.max_particles)?;

        let draw_args = DrawIndirectArgs::for_mesh(
            mesh.index_count,
            mesh.first_index,
            mesh.base_vertex,
            store.len() as u32,
        );

        info!(
            "sph initialized: {} particles ({} x {} x {}), h = {}, dt = {}",
            store.len(),
            config.spawn_counts.x,
            config.spawn_counts.y,
            config.spawn_counts.z,
            params.h,
            params.dt
        );
        debug!("sph params: {params:?}");

        Ok(Self {
            store,
            params,
            draw_args,
            render: RenderSettings::from_config(config),
            tick: 0,
            last_stats: SimStats::default(),
        })
    }

    /// Applies the values that may change while running (bounding box,
    /// timestep, render settings). Nothing is applied if validation fails.
    pub fn reconfigure(&mut self, config: &SimConfig) -> SphResult<()> {
        let mut next = self.params;
        next.set_box_size(config.box_size)?;
        next.set_timestep(config.timestep)?;
        self.params = next;
        self.render = RenderSettings::from_config(config);
        Ok(())
    }

    pub fn set_instance_mesh(&mut self, mesh: InstanceMesh) {
        self.draw_args = DrawIndirectArgs::for_mesh(
            mesh.index_count,
            mesh.first_index,
            mesh.base_vertex,
            self.store.len() as u32,
        );
    }

    /// One tick with the configured timestep. Each stage returns only once
    /// every particle is done, so the next stage sees a settled store.
    pub fn step(&mut self) -> SimStats {
        let mut recovered = 0;
        if !self.store.is_empty() {
            density_pressure(&mut self.store, &self.params);
            forces(&mut self.store, &self.params);
            recovered = integrate(&mut self.store, &self.params);
        }
        self.tick += 1;

        if recovered > 0 {
            warn!("tick {}: reset {recovered} particles with non-finite state", self.tick);
        }
        self.last_stats = SimStats::measure(self.store.particles(), self.tick, recovered);
        self.last_stats
    }

    /// Sets the timestep, then runs one tick.
    pub fn tick(&mut self, dt: f32) -> SphResult<SimStats> {
        self.params.set_timestep(dt)?;
        Ok(self.step())
    }

    /// Runs up to `ticks` ticks, checking `cancel` only between ticks.
    /// Returns the number of ticks that ran.
    pub fn run_ticks(&mut self, ticks: u64, cancel: &AtomicBool) -> u64 {
        let mut ran = 0;
        while ran < ticks {
            if cancel.load(Ordering::Relaxed) {
                debug!("sph run cancelled after {ran} ticks");
                break;
            }
            self.step();
            ran += 1;
        }
        ran
    }

    pub fn render_view(&self) -> RenderView<'_> {
        RenderView {
            particles: self.store.particles(),
            draw_args: self.draw_args,
            render_size: self.render.render_size,
        }
    }

    pub fn volumetric_view(&self) -> VolumetricView<'_> {
        VolumetricView {
            particles: self.store.particles(),
            sphere_radius: self.render.view_radius,
            blend_strength: self.render.blend_strength,
            water_color: self.render.water_color,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.particles()
    }

    pub fn store_mut(&mut self) -> &mut ParticleStore {
        &mut self.store
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn particle_radius(&self) -> f32 {
        self.render.particle_radius
    }

    pub fn draw_args(&self) -> DrawIndirectArgs {
        self.draw_args
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn last_stats(&self) -> SimStats {
        self.last_stats
    }
}
