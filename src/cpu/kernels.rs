// 3D smoothing kernels (Mueller et al. 2003), normalized from the precomputed h powers
use glam::Vec3;

use crate::cpu::params::SimParams;

// density kernel, peak at r = 0 and zero from r = h on
#[inline]
pub fn w_poly6(r2: f32, params: &SimParams) -> f32 {
    // written so NaN distances fall outside the support too
    if !(r2 >= 0.0 && r2 < params.h2) {
        return 0.0;
    }
    let d = params.h2 - r2;
    params.poly6_coeff * d * d * d
}

// r points from j to i; zero at contact distance 0 and from h on
#[inline]
pub fn grad_spiky(r: Vec3, params: &SimParams) -> Vec3 {
    let r_len = r.length();
    if !(r_len > 0.0 && r_len < params.h) {
        return Vec3::ZERO;
    }
    let d = params.h - r_len;
    params.spiky_grad_coeff * d * d * (r / r_len)
}

#[inline]
pub fn laplacian_visc(r_len: f32, params: &SimParams) -> f32 {
    if !(r_len < params.h) {
        return 0.0;
    }
    params.visc_lap_coeff * (params.h - r_len)
}
