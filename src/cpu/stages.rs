// the three per-tick passes; each one is a parallel loop over the whole store
use glam::Vec3;
use rayon::prelude::*;

use crate::cpu::kernels::{grad_spiky, laplacian_visc, w_poly6};
use crate::cpu::params::SimParams;
use crate::cpu::particle::{Particle, ParticleStore};

// ==================== density / pressure =============================

pub fn density_pressure(store: &mut ParticleStore, params: &SimParams) {
    let (frozen, particles) = store.begin_stage();

    particles.par_iter_mut().for_each(|p| {
        let pos_i = p.position;
        let mut rho = 0.0;

        // all pairs, self included
        for other in frozen {
            let r2 = (pos_i - other.position).length_squared();
            rho += params.mass * w_poly6(r2, params);
        }

        p.density = rho;
        // linear equation of state; negative pressure is allowed
        p.pressure = params.gas_constant * (rho - params.resting_density);
    });
}

// ==================== forces =========================================

#[inline]
fn pair_force(p_i: &Particle, p_j: &Particle, params: &SimParams) -> Vec3 {
    let r = p_i.position - p_j.position;
    let r_len = r.length();
    if !(r_len < params.h) {
        return Vec3::ZERO;
    }
    let rho_j = p_j.density.max(params.density_floor);

    // pressure: symmetric average of both pressures
    let f_p = -params.mass * (p_i.pressure + p_j.pressure) / (2.0 * rho_j) * grad_spiky(r, params);

    // viscosity: pulls towards the neighbour's velocity
    let f_v = params.viscosity * params.mass * (p_j.velocity - p_i.velocity) / rho_j
        * laplacian_visc(r_len, params);

    // a broken neighbour must not poison this particle
    let f = f_p + f_v;
    if f.is_finite() { f } else { Vec3::ZERO }
}

/// Overwrites `force` on every particle. Forces are force densities, so the
/// external term is `density * g` and integration divides by density again.
pub fn forces(store: &mut ParticleStore, params: &SimParams) {
    let (frozen, particles) = store.begin_stage();

    particles.par_iter_mut().enumerate().for_each(|(i, p)| {
        let p_i = &frozen[i];
        let mut force = Vec3::ZERO;

        for (j, p_j) in frozen.iter().enumerate() {
            if i == j {
                continue;
            }
            force += pair_force(p_i, p_j, params);
        }

        force += p_i.density.max(params.density_floor) * params.gravity;
        p.force = force;
    });
}

// ==================== integration ====================================

// clamps each axis independently; a particle can bounce on several axes at once
#[inline]
pub fn resolve_boundary(p: &mut Particle, params: &SimParams) {
    for axis in 0..3 {
        let half = params.half_extents[axis];
        if p.position[axis] > half {
            p.position[axis] = half;
            p.velocity[axis] *= params.boundary_damping;
        } else if p.position[axis] < -half {
            p.position[axis] = -half;
            p.velocity[axis] *= params.boundary_damping;
        }
    }
}

// returns true when the particle went non-finite and had to be reset
#[inline]
fn integrate_one(p: &mut Particle, params: &SimParams) -> bool {
    let rho = p.density.max(params.density_floor);
    let prev = p.position;

    // semi-implicit euler
    p.velocity += p.force / rho * params.dt;
    p.position += p.velocity * params.dt;

    let recovered = !(p.velocity.is_finite() && p.position.is_finite());
    if recovered {
        p.velocity = Vec3::ZERO;
        p.position = if prev.is_finite() { prev } else { Vec3::ZERO };
    }

    resolve_boundary(p, params);
    recovered
}

/// Advances velocity and position, then resolves the bounding box.
/// Returns how many particles had to be recovered from a non-finite state.
pub fn integrate(store: &mut ParticleStore, params: &SimParams) -> usize {
    // reads only its own particle, no snapshot needed
    store
        .particles_mut()
        .par_iter_mut()
        .map(|p| integrate_one(p, params) as usize)
        .sum()
}
