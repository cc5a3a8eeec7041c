use std::f32::consts::PI;

use glam::Vec3;

use crate::config::SimConfig;
use crate::error::{SphError, SphResult};

/// Constants shared by all three stages for one tick.
///
/// Built once from [`SimConfig`]; only the bounding volume and timestep can
/// change afterwards, and only between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    // smoothing radius and the powers used by the kernel normalizations
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
    pub half_extents: Vec3,
    pub gravity: Vec3,
    pub dt: f32,
    pub density_floor: f32,

    // kernel normalization terms
    pub poly6_coeff: f32,      // 315 / (64 pi h^9)
    pub spiky_grad_coeff: f32, // -45 / (pi h^6)
    pub visc_lap_coeff: f32,   // 45 / (pi h^6)
}

fn positive(field: &'static str, value: f32) -> SphResult<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SphError::InvalidConfig { field, value, reason: "must be finite and > 0" })
    }
}

fn non_negative(field: &'static str, value: f32) -> SphResult<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SphError::InvalidConfig { field, value, reason: "must be finite and >= 0" })
    }
}

fn finite(field: &'static str, value: f32) -> SphResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SphError::InvalidConfig { field, value, reason: "must be finite" })
    }
}

fn half_extents(box_size: Vec3) -> SphResult<Vec3> {
    Ok(Vec3::new(
        positive("box_size.x", box_size.x)?,
        positive("box_size.y", box_size.y)?,
        positive("box_size.z", box_size.z)?,
    ) * 0.5)
}

impl SimParams {
    pub fn from_config(config: &SimConfig) -> SphResult<Self> {
        let h = positive("smoothing_radius", config.smoothing_radius)?;
        let mass = positive("particle_mass", config.particle_mass)?;
        let dt = positive("timestep", config.timestep)?;
        let density_floor = positive("density_floor", config.density_floor)?;

        let boundary_damping = finite("boundary_damping", config.boundary_damping)?;
        if boundary_damping > 0.0 {
            return Err(SphError::InvalidConfig {
                field: "boundary_damping",
                value: boundary_damping,
                reason: "must be <= 0 so bounces reflect",
            });
        }

        non_negative("particle_radius", config.particle_radius)?;
        non_negative("spawn_jitter", config.spawn_jitter)?;
        finite("gravity.x", config.gravity.x)?;
        finite("gravity.y", config.gravity.y)?;
        finite("gravity.z", config.gravity.z)?;
        finite("spawn_point.x", config.spawn_point.x)?;
        finite("spawn_point.y", config.spawn_point.y)?;
        finite("spawn_point.z", config.spawn_point.z)?;

        let h2 = h * h;
        let h3 = h2 * h;
        let h4 = h3 * h;
        let h5 = h4 * h;
        let h6 = h3 * h3;
        let h9 = h4 * h5;

        let poly6_coeff = 315.0 / (64.0 * PI * h9);
        let spiky_grad_coeff = -45.0 / (PI * h6);
        let visc_lap_coeff = 45.0 / (PI * h6);

        // h far from 1 under- or overflows the powers, and every density turns inf or 0
        let usable = |v: f32| v.is_finite() && v != 0.0;
        if ![h2, h3, h4, h5, poly6_coeff, spiky_grad_coeff, visc_lap_coeff]
            .into_iter()
            .all(usable)
        {
            return Err(SphError::InvalidConfig {
                field: "smoothing_radius",
                value: h,
                reason: "kernel normalization is not representable in f32",
            });
        }

        Ok(Self {
            h,
            h2,
            h3,
            h4,
            h5,
            mass,
            viscosity: non_negative("viscosity", config.viscosity)?,
            gas_constant: non_negative("gas_constant", config.gas_constant)?,
            resting_density: non_negative("resting_density", config.resting_density)?,
            boundary_damping,
            half_extents: half_extents(config.box_size)?,
            gravity: config.gravity,
            dt,
            density_floor,
            poly6_coeff,
            spiky_grad_coeff,
            visc_lap_coeff,
        })
    }

    // bounding volume and timestep are the only values that change between ticks
    pub fn set_box_size(&mut self, box_size: Vec3) -> SphResult<()> {
        self.half_extents = half_extents(box_size)?;
        Ok(())
    }

    pub fn set_timestep(&mut self, dt: f32) -> SphResult<()> {
        self.dt = positive("timestep", dt)?;
        Ok(())
    }
}
