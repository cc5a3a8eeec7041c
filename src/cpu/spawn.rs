// initial particle placement: a jittered 3D lattice
use std::f32::consts::TAU;

use glam::{UVec3, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SimConfig;
use crate::cpu::particle::Particle;
use crate::error::{SphError, SphResult};

#[derive(Clone, Copy, Debug)]
pub struct Lattice {
    pub counts: UVec3,
    pub spawn_point: Vec3,
    pub radius: f32,
    pub jitter: f32,
}

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// uniform on the unit sphere (Archimedes: z is uniform in [-1, 1])
pub fn on_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..TAU);
    let s = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(s * phi.cos(), s * phi.sin(), z)
}

impl Lattice {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            counts: config.spawn_counts,
            spawn_point: config.spawn_point,
            radius: config.particle_radius,
            jitter: config.spawn_jitter,
        }
    }

    pub fn count(&self) -> SphResult<usize> {
        let UVec3 { x, y, z } = self.counts;
        (x as u64)
            .checked_mul(y as u64)
            .and_then(|xy| xy.checked_mul(z as u64))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(SphError::LatticeOverflow { nx: x, ny: y, nz: z })
    }

    /// Grid spacing is `2r`; x is the outer loop and z the inner one, so the
    /// index of cell (x, y, z) is `(x * ny + y) * nz + z`.
    pub fn spawn<R: Rng + ?Sized>(&self, rng: &mut R, limit: u32) -> SphResult<Vec<Particle>> {
        let n = self.count()?;
        if n as u64 > limit as u64 {
            return Err(SphError::Capacity { requested: n as u64, limit: limit as u64 });
        }

        let spacing = self.radius * 2.0;
        let jitter = self.radius * self.jitter;
        let mut particles = Vec::with_capacity(n);

        for x in 0..self.counts.x {
            for y in 0..self.counts.y {
                for z in 0..self.counts.z {
                    let mut pos = self.spawn_point + Vec3::new(x as f32, y as f32, z as f32) * spacing;
                    if jitter > 0.0 {
                        pos += on_unit_sphere(rng) * jitter;
                    }
                    particles.push(Particle::new(pos));
                }
            }
        }
        Ok(particles)
    }
}
