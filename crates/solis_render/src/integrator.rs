//! Iterative path tracing with Russian roulette.
//!
//! Radiance is gathered along a single path: emission is added at every hit,
//! the BRDF weight multiplies the throughput, and roulette ends the path.
//! Past `max_bounce_depth` the continuation probability halves per bounce.

use crate::accumulator::CancelToken;
use crate::camera::Camera;
use crate::material::{Color, ShadingArg};
use crate::renderer::RenderConfig;
use crate::sampling::gen_f32;
use crate::scene::Scene;
use rand::RngCore;
use solis_math::{max_component, Ray};

/// Smallest throughput a path may keep.
const MIN_THROUGHPUT: f32 = 1e-8;

/// Why a path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEnd {
    /// The ray left the scene.
    Miss,
    /// Russian roulette terminated the path.
    RouletteKilled,
    /// The BRDF weight drove the throughput to zero.
    ThroughputVanished,
}

/// Result of tracing one path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub radiance: Color,
    /// Scattering events before the path ended
    pub bounces: u32,
    pub end: PathEnd,
}

/// Trace one path starting with `ray`.
pub fn radiance(
    scene: &Scene,
    ray: &Ray,
    max_bounce_depth: u32,
    rng: &mut dyn RngCore,
) -> PathSample {
    let mut ray = *ray;
    let mut throughput = Color::ONE;
    let mut result = Color::ZERO;
    let mut bounce = 0u32;

    loop {
        let hit = scene
            .intersect(&ray)
            .and_then(|rec| rec.material.map(|id| (rec, scene.material(id))));
        let Some((rec, material)) = hit else {
            result += throughput * scene.environment().radiance(ray.direction);
            return PathSample {
                radiance: result,
                bounces: bounce,
                end: PathEnd::Miss,
            };
        };

        result += throughput * material.emissive();

        let mut probability = material.threshold();
        if bounce > max_bounce_depth {
            probability *= 0.5f32.powi((bounce - max_bounce_depth) as i32);
        }
        if gen_f32(rng) >= probability {
            return PathSample {
                radiance: result,
                bounces: bounce,
                end: PathEnd::RouletteKilled,
            };
        }

        let mut arg = ShadingArg::new(ray.direction, rec.normal, rec.texcoord, &mut *rng);
        arg.probability = probability;
        let weight = material.compute_color(&mut arg);
        let output = arg.output;

        throughput *= weight;
        bounce += 1;
        if !(max_component(throughput) > MIN_THROUGHPUT) {
            return PathSample {
                radiance: result,
                bounces: bounce,
                end: PathEnd::ThroughputVanished,
            };
        }

        ray = Ray::new(rec.position, output);
    }
}

/// Estimate the radiance through pixel `(x, y)`.
///
/// Draws `samples_per_pixel` jittered samples in each of the
/// `sub_samples × sub_samples` strata of the pixel, each weighted by the
/// reciprocal of the total sample count. `cancel` is polled before every
/// sample; returns the accumulated color and the number of samples taken.
pub fn render_pixel(
    scene: &Scene,
    camera: &Camera,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
    cancel: &CancelToken,
) -> (Color, u32) {
    let strata = config.sub_samples.max(1);
    let scale = 1.0 / config.samples_per_pixel_total().max(1) as f32;
    let inv_strata = 1.0 / strata as f32;

    let mut color = Color::ZERO;
    let mut samples = 0u32;
    for sy in 0..strata {
        for sx in 0..strata {
            for _ in 0..config.samples_per_pixel {
                if cancel.is_cancelled() {
                    return (color, samples);
                }

                let jx = (sx as f32 + gen_f32(rng)) * inv_strata;
                let jy = (sy as f32 + gen_f32(rng)) * inv_strata;
                let ray = camera.get_ray(x as f32 + jx, y as f32 + jy, rng);

                color += radiance(scene, &ray, config.max_bounce_depth, rng).radiance * scale;
                samples += 1;
            }
        }
    }

    (color, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BvhConfig, Environment, Material, Primitive, Quad, Sphere, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene(
        materials: Vec<Material>,
        primitives: Vec<Primitive>,
        environment: Environment,
    ) -> Scene {
        Scene::new(primitives, materials, environment, BvhConfig::default()).unwrap()
    }

    #[test]
    fn test_miss_returns_environment() {
        let scene = scene(Vec::new(), Vec::new(), Environment::Constant(Color::splat(0.25)));
        let mut rng = StdRng::seed_from_u64(1);

        let sample = radiance(&scene, &Ray::new(Vec3::ZERO, Vec3::X), 5, &mut rng);
        assert_eq!(sample.radiance, Color::splat(0.25));
        assert_eq!(sample.end, PathEnd::Miss);
        assert_eq!(sample.bounces, 0);
    }

    #[test]
    fn test_light_adds_emission_then_roulette_ends() {
        let scene = scene(
            vec![Material::light(Color::splat(3.0))],
            vec![Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, 0).into()],
            Environment::Black,
        );
        let mut rng = StdRng::seed_from_u64(2);

        let mut killed = 0;
        for _ in 0..100 {
            let sample = radiance(&scene, &Ray::new(Vec3::ZERO, -Vec3::Z), 5, &mut rng);
            assert!(sample.radiance.min_element() >= 3.0);
            if sample.end == PathEnd::RouletteKilled {
                killed += 1;
            }
        }
        // Black lights continue with probability 1e-3
        assert!(killed > 90);
    }

    #[test]
    fn test_closed_furnace_converges() {
        // Inside an emitting sphere of albedo a with emission e, L = e / (1 - a)
        let albedo = 0.5;
        let scene = scene(
            vec![Material::matte(Color::splat(albedo)).with_emissive(Color::splat(1.0))],
            vec![Sphere::new(Vec3::ZERO, 5.0, 0).into()],
            Environment::Black,
        );
        let mut rng = StdRng::seed_from_u64(3);

        let n = 50_000;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            sum += radiance(&scene, &Ray::new(Vec3::ZERO, Vec3::Y), 8, &mut rng).radiance;
        }
        let mean = sum / n as f32;
        assert!((mean.x - 2.0).abs() < 0.1, "furnace mean {mean}");
    }

    #[test]
    fn test_black_matte_surface_vanishes_or_dies() {
        let scene = scene(
            vec![Material::matte(Color::ZERO)],
            vec![Quad::new(Vec3::new(-1.0, -1.0, -2.0), Vec3::X * 2.0, Vec3::Y * 2.0, 0).into()],
            Environment::Constant(Color::ONE),
        );
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..100 {
            let sample = radiance(&scene, &Ray::new(Vec3::ZERO, -Vec3::Z), 5, &mut rng);
            assert_eq!(sample.radiance, Color::ZERO);
            assert_ne!(sample.end, PathEnd::Miss);
        }
    }

    #[test]
    fn test_render_pixel_stops_when_cancelled() {
        let scene = scene(Vec::new(), Vec::new(), Environment::Constant(Color::ONE));
        let mut camera = Camera::new().with_resolution(4, 4);
        camera.initialize();
        let config = RenderConfig {
            width: 4,
            height: 4,
            samples_per_pixel: 3,
            sub_samples: 2,
            ..RenderConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);

        let cancel = CancelToken::new();
        let (color, samples) = render_pixel(&scene, &camera, 1, 1, &config, &mut rng, &cancel);
        assert_eq!(samples, 12);
        assert!((color - Color::ONE).length() < 1e-5);

        cancel.cancel();
        let (color, samples) = render_pixel(&scene, &camera, 1, 1, &config, &mut rng, &cancel);
        assert_eq!(samples, 0);
        assert_eq!(color, Color::ZERO);
    }
}
