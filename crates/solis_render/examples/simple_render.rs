//! Simple path tracer example.
//!
//! Renders a field of random spheres under a daylight sky and saves a PNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solis_render::{
    tone_map, BvhConfig, CancelToken, Camera, Color, Environment, Material, Primitive, RenderConfig,
    Renderer, Scene, Sphere, Vec3,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Solis Path Tracer - Simple Example");
    println!("==================================");

    let scene = build_scene();

    // Set up camera
    let camera = Camera::new()
        .with_position(
            Vec3::new(13.0, 2.0, 3.0), // look_from
            Vec3::new(0.0, 0.0, 0.0),  // look_at
            Vec3::new(0.0, 1.0, 0.0),  // vup
        )
        .with_lens(20.0, 0.6, 10.0);

    let config = RenderConfig {
        width: 800,
        height: 450,
        samples_per_pixel: 16,
        sub_samples: 2,
        max_bounce_depth: 8,
        ..RenderConfig::default()
    };

    println!(
        "Rendering {}x{} @ {} spp...",
        config.width,
        config.height,
        config.samples_per_pixel_total()
    );

    let output = match Renderer::new(config.clone()).render(&scene, &camera, &CancelToken::new()) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Render failed: {e}");
            return;
        }
    };
    println!("Rendered in {:?}", output.elapsed);

    let image = &output.image;
    let display = tone_map(config.tone_map, image.width, image.height, &image.pixels);
    let filename = "output.png";
    match display.to_image().map(|img| img.save(filename)) {
        Some(Ok(())) => println!("Saved to {}", filename),
        Some(Err(e)) => eprintln!("Failed to save image: {e}"),
        None => eprintln!("Image buffer has the wrong size"),
    }
}

fn build_scene() -> Scene {
    let mut materials = vec![
        Material::matte(Color::new(0.5, 0.5, 0.5)),
        Material::glass(Color::ONE),
        Material::matte(Color::new(0.4, 0.2, 0.1)),
        Material::mirror(Color::new(0.7, 0.6, 0.5)),
    ];

    let mut primitives: Vec<Primitive> = vec![
        // Ground
        Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, 0).into(),
        // Three main spheres
        Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, 1).into(),
        Sphere::new(Vec3::new(-4.0, 1.0, 0.0), 1.0, 2).into(),
        Sphere::new(Vec3::new(4.0, 1.0, 0.0), 1.0, 3).into(),
    ];

    // Small random spheres
    let mut rng = StdRng::seed_from_u64(2024);
    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose_mat: f32 = rng.gen();
            let material = if choose_mat < 0.7 {
                // Diffuse
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                Material::matte(albedo)
            } else if choose_mat < 0.85 {
                // Glossy
                let albedo = Color::splat(0.5) + 0.5 * Color::new(rng.gen(), rng.gen(), rng.gen());
                Material::glossy(albedo, 0.5 * rng.gen::<f32>() + 0.05)
            } else if choose_mat < 0.95 {
                Material::glass(Color::ONE)
            } else {
                // Small lamps
                Material::light(Color::splat(6.0))
            };

            materials.push(material);
            primitives.push(Sphere::new(center, 0.2, (materials.len() - 1) as u32).into());
        }
    }

    println!("Created {} objects", primitives.len());
    match Scene::new(primitives, materials, Environment::daylight(), BvhConfig::default()) {
        Ok(scene) => scene,
        Err(e) => panic!("Invalid example scene: {e}"),
    }
}
