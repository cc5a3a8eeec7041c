use bevy::prelude::*;
use bevy::render::renderer::RenderDevice;
use bevy::render::{ExtractSchedule, Render, RenderApp, RenderSet};

use crate::config::SimConfig;
use crate::cpu::params::SimParams;
use crate::cpu::pipeline::SphPipeline;
use crate::gpu::buffers::{
    extract_particle_buffer, init_gpu_buffers, prepare_particle_bind_group, queue_particle_buffer,
    ParticleBindGroupLayout,
};

/// Runs the simulation on bevy's fixed timestep and keeps the GPU particle
/// buffer in sync for the renderers. Works headless (no `RenderPlugin`),
/// in which case only the simulation runs.
#[derive(Default)]
pub struct SphFluidPlugin {
    pub config: SimConfig,
}

impl SphFluidPlugin {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SphFluidPlugin {
    fn build(&self, app: &mut App) {
        // App
        // an invalid config is reported once by initialize_simulation; the fixed
        // clock keeps its default so bevy never sees a bad timestep
        match SimParams::from_config(&self.config) {
            Ok(params) => {
                app.insert_resource(Time::<Fixed>::from_seconds(params.dt as f64));
            }
            Err(err) => warn!("sph fixed timestep left at default: {err}"),
        }
        app.insert_resource(self.config.clone())
            .add_systems(Startup, (initialize_simulation, init_gpu_buffers).chain())
            .add_systems(
                FixedUpdate,
                (apply_config_changes, tick_simulation)
                    .chain()
                    .run_if(resource_exists::<SphPipeline>),
            )
            .add_systems(Update, queue_particle_buffer);

        // Render
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        render_app
            .add_systems(ExtractSchedule, extract_particle_buffer)
            .add_systems(
                Render,
                prepare_particle_bind_group.in_set(RenderSet::PrepareBindGroups),
            );
    }

    fn finish(&self, app: &mut App) {
        // the render device only exists once the render plugin has finished
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        let Some(render_device) = render_app.world().get_resource::<RenderDevice>() else {
            return;
        };
        let layout = ParticleBindGroupLayout::new(render_device);
        render_app.insert_resource(layout);
    }
}

// ========================== systems ==================================

fn initialize_simulation(mut commands: Commands, config: Res<SimConfig>) {
    // on failure nothing is inserted, so no tick ever runs
    match SphPipeline::initialize(&config) {
        Ok(sph) => commands.insert_resource(sph),
        Err(err) => error!("sph initialization failed: {err}"),
    }
}

// bounds, timestep and render settings can be changed live through the SimConfig resource
fn apply_config_changes(
    config: Res<SimConfig>,
    mut sph: ResMut<SphPipeline>,
    time: Option<ResMut<Time<Fixed>>>,
) {
    if !config.is_changed() {
        return;
    }
    match sph.reconfigure(&config) {
        Ok(()) => {
            if let Some(mut time) = time {
                time.set_timestep_seconds(config.timestep as f64);
            }
        }
        Err(err) => warn!("sph config change rejected: {err}"),
    }
}

fn tick_simulation(mut sph: ResMut<SphPipeline>) {
    let stats = sph.step();
    if stats.tick % 600 == 0 {
        debug!(
            "tick {}: density [{:.3}, {:.3}] mean {:.3}, max speed {:.3}",
            stats.tick, stats.min_density, stats.max_density, stats.mean_density, stats.max_speed
        );
    }
}
