use glam::Vec3;

use crate::error::{SphError, SphResult};

// field order matches gpu::ffi::GPUParticle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub pressure: f32,
    pub density: f32,
    pub force: Vec3,
    pub velocity: Vec3,
    pub position: Vec3,
}

impl Particle {
    pub fn new(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }
}

/// Fixed-length particle array. Particles are never added or removed after
/// spawn, only their fields change.
///
/// Stages read neighbours from `snapshot`, a copy of the store taken when
/// the stage starts, and write only their own particle. Both vectors are
/// allocated once.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    snapshot: Vec<Particle>,
}

impl ParticleStore {
    pub fn from_particles(particles: Vec<Particle>, limit: u32) -> SphResult<Self> {
        if particles.len() as u64 > limit as u64 {
            return Err(SphError::Capacity {
                requested: particles.len() as u64,
                limit: limit as u64,
            });
        }
        let snapshot = particles.clone();
        Ok(Self { particles, snapshot })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    // a slice, so the length can't change through it
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Freezes the current state and hands out (frozen, writable) views.
    pub(crate) fn begin_stage(&mut self) -> (&[Particle], &mut [Particle]) {
        self.snapshot.copy_from_slice(&self.particles);
        (self.snapshot.as_slice(), self.particles.as_mut_slice())
    }
}
