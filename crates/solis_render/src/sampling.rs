//! Random number helpers and hemisphere sampling.

use rand::{Rng, RngCore};
use solis_math::{Onb, Vec3};
use std::f32::consts::PI;

/// Uniform `f32` in `[0, 1)`.
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Cosine-weighted direction in the hemisphere around `onb.w`.
///
/// `r1` picks the azimuth, `r2` the elevation (`cos θ = sqrt(1 - r2)`), so
/// the pdf is `cos θ / π`.
pub(crate) fn cosine_hemisphere(onb: &Onb, r1: f32, r2: f32) -> Vec3 {
    let phi = 2.0 * PI * r1;
    let r2s = r2.sqrt();
    onb.local(phi.cos() * r2s, phi.sin() * r2s, (1.0 - r2).max(0.0).sqrt())
}

/// Direction distributed as `cos^n α` around `onb.w`.
///
/// Returns the direction and `cos α`.
pub(crate) fn cosine_power_lobe(onb: &Onb, exponent: f32, r1: f32, r2: f32) -> (Vec3, f32) {
    let phi = 2.0 * PI * r1;
    let cos_alpha = r2.powf(1.0 / (exponent + 1.0));
    let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
    let dir = onb.local(phi.cos() * sin_alpha, phi.sin() * sin_alpha, cos_alpha);
    (dir, cos_alpha)
}

/// Concentric map of the unit square onto the unit disk.
pub(crate) fn concentric_disk(r1: f32, r2: f32) -> (f32, f32) {
    let a = 2.0 * r1 - 1.0;
    let b = 2.0 * r2 - 1.0;
    if a == 0.0 && b == 0.0 {
        return (0.0, 0.0);
    }
    let (r, theta) = if a.abs() > b.abs() {
        (a, PI / 4.0 * (b / a))
    } else {
        (b, PI / 2.0 - PI / 4.0 * (a / b))
    };
    (r * theta.cos(), r * theta.sin())
}
