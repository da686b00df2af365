//! Surface materials and BRDF sampling.
//!
//! A material is one flat record: a closed [`MaterialKind`], a base color and
//! an emitted radiance. Sampling returns the path weight `BRDF·cos/pdf`
//! already divided by the Russian roulette continuation probability.

use crate::sampling::{cosine_hemisphere, cosine_power_lobe, gen_f32};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use solis_math::{max_component, reflect, safe_normalize, Onb, Vec2, Vec3};

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Scattering behaviour of a material.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Ideal diffuse (Lambertian) surface.
    #[default]
    Matte,
    /// Perfect specular reflector.
    Mirror,
    /// Smooth refractive interface with the given index of refraction.
    Dielectric { ior: f32 },
    /// Phong-style glossy reflector; roughness in `(0, 1]`.
    Glossy { roughness: f32 },
}

/// A surface material, shared by primitives through a material handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub emissive: Color,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Matte,
            color: Color::splat(0.75),
            emissive: Color::ZERO,
        }
    }
}

/// Per-bounce shading state.
///
/// `input` is the incoming ray direction, `normal` the geometric (outward)
/// normal. [`Material::compute_color`] writes the sampled direction to
/// `output`.
pub struct ShadingArg<'a> {
    pub input: Vec3,
    pub normal: Vec3,
    pub texcoord: Vec2,
    pub rng: &'a mut dyn RngCore,
    pub output: Vec3,
    /// Russian roulette continuation probability of this bounce
    pub probability: f32,
}

impl<'a> ShadingArg<'a> {
    pub fn new(input: Vec3, normal: Vec3, texcoord: Vec2, rng: &'a mut dyn RngCore) -> Self {
        Self {
            input,
            normal,
            texcoord,
            rng,
            output: Vec3::ZERO,
            probability: 1.0,
        }
    }
}

impl Material {
    pub fn matte(color: Color) -> Self {
        Self {
            kind: MaterialKind::Matte,
            color,
            emissive: Color::ZERO,
        }
    }

    pub fn mirror(color: Color) -> Self {
        Self {
            kind: MaterialKind::Mirror,
            ..Self::matte(color)
        }
    }

    pub fn dielectric(color: Color, ior: f32) -> Self {
        Self {
            kind: MaterialKind::Dielectric { ior },
            ..Self::matte(color)
        }
    }

    /// Dielectric with the index of refraction of window glass.
    pub fn glass(color: Color) -> Self {
        Self::dielectric(color, 1.5)
    }

    pub fn crystal(color: Color) -> Self {
        Self::dielectric(color, 2.0)
    }

    pub fn diamond(color: Color) -> Self {
        Self::dielectric(color, 2.42)
    }

    pub fn glossy(color: Color, roughness: f32) -> Self {
        Self {
            kind: MaterialKind::Glossy { roughness },
            ..Self::matte(color)
        }
    }

    /// Black matte surface that only emits.
    pub fn light(emissive: Color) -> Self {
        Self::matte(Color::ZERO).with_emissive(emissive)
    }

    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    /// Radiance emitted by the surface.
    #[inline]
    pub fn emissive(&self) -> Color {
        self.emissive
    }

    /// Russian roulette continuation probability for paths hitting this
    /// material: the largest color channel, kept inside `[1e-3, 0.99]`.
    #[inline]
    pub fn threshold(&self) -> f32 {
        let p = max_component(self.color);
        if p.is_nan() {
            return 1e-3;
        }
        p.clamp(1e-3, 0.99)
    }

    /// Sample an outgoing direction into `arg.output` and return its weight.
    pub fn compute_color(&self, arg: &mut ShadingArg) -> Color {
        let normal = safe_normalize(arg.normal, -arg.input);
        let weight = match self.kind {
            MaterialKind::Matte => self.sample_matte(arg, normal),
            MaterialKind::Mirror => {
                arg.output = reflect(arg.input, normal);
                self.color
            }
            MaterialKind::Dielectric { ior } => self.sample_dielectric(arg, normal, ior),
            MaterialKind::Glossy { roughness } => self.sample_glossy(arg, normal, roughness),
        };
        weight / arg.probability
    }

    fn sample_matte(&self, arg: &mut ShadingArg, normal: Vec3) -> Color {
        let nl = facing(normal, arg.input);
        let onb = Onb::from_w(nl);
        let r1 = gen_f32(&mut *arg.rng);
        let r2 = gen_f32(&mut *arg.rng);
        arg.output = safe_normalize(cosine_hemisphere(&onb, r1, r2), nl);
        self.color
    }

    fn sample_dielectric(&self, arg: &mut ShadingArg, normal: Vec3, ior: f32) -> Color {
        let reflected = reflect(arg.input, normal);
        let nl = facing(normal, arg.input);
        let into = normal.dot(nl) > 0.0;

        let (nc, nt) = (1.0, ior);
        let nnt = if into { nc / nt } else { nt / nc };
        let ddn = arg.input.dot(nl);
        let cos2t = 1.0 - nnt * nnt * (1.0 - ddn * ddn);

        // Total internal reflection
        if cos2t < 0.0 {
            arg.output = reflected;
            return self.color;
        }

        let sign = if into { 1.0 } else { -1.0 };
        let refracted = safe_normalize(
            arg.input * nnt - normal * (sign * (ddn * nnt + cos2t.sqrt())),
            reflected,
        );

        let a = nt - nc;
        let b = nt + nc;
        let r0 = a * a / (b * b);
        let c = 1.0 - if into { -ddn } else { refracted.dot(normal) };
        let re = r0 + (1.0 - r0) * c.powi(5);
        let tr = 1.0 - re;
        let p = 0.25 + 0.5 * re;

        if gen_f32(&mut *arg.rng) < p {
            arg.output = reflected;
            self.color * (re / p)
        } else {
            arg.output = refracted;
            self.color * (tr / (1.0 - p))
        }
    }

    fn sample_glossy(&self, arg: &mut ShadingArg, normal: Vec3, roughness: f32) -> Color {
        let exponent = phong_exponent(roughness);
        let nl = facing(normal, arg.input);
        let mirror = safe_normalize(reflect(arg.input, nl), nl);

        let onb = Onb::from_w(mirror);
        let r1 = gen_f32(&mut *arg.rng);
        let r2 = gen_f32(&mut *arg.rng);
        let (direction, _) = cosine_power_lobe(&onb, exponent, r1, r2);
        arg.output = direction;

        let cos_theta = direction.dot(nl);
        if cos_theta <= 0.0 {
            return Color::ZERO;
        }
        self.color * ((exponent + 2.0) / (exponent + 1.0) * cos_theta)
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// `normal` flipped to face against `input`.
#[inline]
fn facing(normal: Vec3, input: Vec3) -> Vec3 {
    if normal.dot(input) < 0.0 {
        normal
    } else {
        -normal
    }
}

/// Phong exponent for a roughness value; at least 1.
fn phong_exponent(roughness: f32) -> f32 {
    let r = roughness.clamp(1e-3, 1.0);
    (2.0 / (r * r) - 2.0).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLES: usize = 100_000;

    /// Mean path weight over `SAMPLES` bounces, with roulette applied the way
    /// the integrator does.
    fn mean_weight(material: &Material, input: Vec3, normal: Vec3, seed: u64) -> Color {
        let mut rng = StdRng::seed_from_u64(seed);
        let probability = material.threshold();
        let mut sum = Color::ZERO;
        for _ in 0..SAMPLES {
            if gen_f32(&mut rng) >= probability {
                continue;
            }
            let mut arg = ShadingArg::new(input, normal, Vec2::ZERO, &mut rng);
            arg.probability = probability;
            sum += material.compute_color(&mut arg);
        }
        sum / SAMPLES as f32
    }

    fn assert_close(actual: Color, expected: Color, tolerance: f32) {
        for axis in 0..3 {
            let (a, e) = (actual[axis], expected[axis]);
            assert!(
                (a - e).abs() <= tolerance * e.max(1e-3),
                "channel {axis}: {a} vs {e}"
            );
        }
    }

    #[test]
    fn test_threshold_clamped() {
        assert_eq!(Material::matte(Color::new(0.2, 0.7, 0.1)).threshold(), 0.7);
        assert_eq!(Material::matte(Color::ONE).threshold(), 0.99);
        assert_eq!(Material::light(Color::splat(4.0)).threshold(), 1e-3);
    }

    #[test]
    fn test_matte_mean_weight_is_albedo_under_roulette() {
        let albedo = Color::new(0.8, 0.5, 0.2);
        let material = Material::matte(albedo);
        let input = Vec3::new(0.3, -1.0, 0.2).normalize();

        let mean = mean_weight(&material, input, Vec3::Y, 17);
        assert_close(mean, albedo, 0.05);
    }

    #[test]
    fn test_matte_samples_leave_the_lit_side() {
        let mut rng = StdRng::seed_from_u64(5);
        let material = Material::matte(Color::ONE);
        // Hit from below: samples must go below too
        for _ in 0..1000 {
            let mut arg = ShadingArg::new(Vec3::Y, Vec3::Y, Vec2::ZERO, &mut rng);
            material.compute_color(&mut arg);
            assert!(arg.output.y <= 0.0);
        }
    }

    #[test]
    fn test_mirror_reflects() {
        let mut rng = StdRng::seed_from_u64(1);
        let material = Material::mirror(Color::splat(0.9));
        let input = Vec3::new(1.0, -1.0, 0.0).normalize();
        let mut arg = ShadingArg::new(input, Vec3::Y, Vec2::ZERO, &mut rng);
        arg.probability = 0.5;

        let weight = material.compute_color(&mut arg);
        assert!((arg.output - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-5);
        assert!((weight - Color::splat(1.8)).length() < 1e-5);
    }

    #[test]
    fn test_dielectric_total_internal_reflection_always_reflects() {
        let mut rng = StdRng::seed_from_u64(9);
        let material = Material::glass(Color::ONE);
        // Leaving glass at a grazing angle, beyond the critical angle
        let input = Vec3::new(1.0, 0.2, 0.0).normalize();
        let expected = reflect(input, Vec3::Y);

        for _ in 0..1000 {
            let mut arg = ShadingArg::new(input, Vec3::Y, Vec2::ZERO, &mut rng);
            let weight = material.compute_color(&mut arg);
            assert!((arg.output - expected).length() < 1e-5);
            assert_eq!(weight, Color::ONE);
        }
    }

    #[test]
    fn test_dielectric_branch_choice_is_unbiased() {
        let material = Material::glass(Color::ONE);
        let input = Vec3::new(0.5, -1.0, 0.0).normalize();
        let mut rng = StdRng::seed_from_u64(23);

        let mut sum = Color::ZERO;
        for _ in 0..SAMPLES {
            let mut arg = ShadingArg::new(input, Vec3::Y, Vec2::ZERO, &mut rng);
            sum += material.compute_color(&mut arg);
        }
        // Re + Tr = 1
        assert_close(sum / SAMPLES as f32, Color::ONE, 0.02);
    }

    #[test]
    fn test_dielectric_refracts_into_surface() {
        let material = Material::diamond(Color::ONE);
        let input = -Vec3::Y;
        let mut rng = StdRng::seed_from_u64(2);
        let mut refracted = 0;
        for _ in 0..1000 {
            let mut arg = ShadingArg::new(input, Vec3::Y, Vec2::ZERO, &mut rng);
            material.compute_color(&mut arg);
            if arg.output.y < 0.0 {
                refracted += 1;
                assert!((arg.output + Vec3::Y).length() < 1e-4);
            }
        }
        assert!(refracted > 0);
    }

    #[test]
    fn test_glossy_weight_is_finite_and_non_negative() {
        let mut rng = StdRng::seed_from_u64(31);
        let material = Material::glossy(Color::splat(0.7), 0.3);
        let input = Vec3::new(0.8, -0.2, 0.0).normalize();
        for _ in 0..10_000 {
            let mut arg = ShadingArg::new(input, Vec3::Y, Vec2::ZERO, &mut rng);
            let weight = material.compute_color(&mut arg);
            assert!(weight.is_finite());
            assert!(weight.min_element() >= 0.0);
            if weight.max_element() > 0.0 {
                assert!(arg.output.y > 0.0);
            }
        }
    }

    #[test]
    fn test_glossy_mean_weight_conserves_energy() {
        let color = Color::new(0.7, 0.5, 0.3);
        let material = Material::glossy(color, 0.5);

        // Head-on the lobe never dips under the surface and E[cos α] is
        // (n + 1) / (n + 2), which cancels the normalization exactly
        let head_on = mean_weight(&material, Vec3::NEG_Y, Vec3::Y, 41);
        assert_close(head_on, color, 0.05);

        // At grazing angles part of the lobe is lost below the surface
        let exponent = phong_exponent(0.5);
        let bound = color * (exponent + 2.0) / (exponent + 1.0);
        let grazing = mean_weight(&material, Vec3::new(1.0, -0.2, 0.0).normalize(), Vec3::Y, 43);
        for axis in 0..3 {
            assert!(grazing[axis] > 0.0);
            assert!(grazing[axis] <= bound[axis] * 1.05, "channel {axis}: {grazing}");
        }
    }

    #[test]
    fn test_phong_exponent_floor() {
        assert_eq!(phong_exponent(1.0), 1.0);
        assert!((phong_exponent(0.5) - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_normal_does_not_produce_nan() {
        let mut rng = StdRng::seed_from_u64(4);
        for material in [
            Material::matte(Color::ONE),
            Material::mirror(Color::ONE),
            Material::glass(Color::ONE),
            Material::glossy(Color::ONE, 0.2),
        ] {
            let mut arg = ShadingArg::new(Vec3::Z, Vec3::ZERO, Vec2::ZERO, &mut rng);
            let weight = material.compute_color(&mut arg);
            assert!(weight.is_finite());
            assert!(arg.output.is_finite());
        }
    }

    #[test]
    fn test_material_serde_defaults() {
        let m: Material =
            serde_json::from_str(r#"{"kind":{"dielectric":{"ior":2.0}},"color":[1,1,1]}"#).unwrap();
        assert_eq!(m, Material::crystal(Color::ONE));

        let light: Material =
            serde_json::from_str(r#"{"emissive":[4,4,4],"color":[0,0,0]}"#).unwrap();
        assert_eq!(light, Material::light(Color::splat(4.0)));
    }
}
