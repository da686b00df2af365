//! Built-in Cornell box, rendered when no scene file is given.

use crate::scene_file::SceneFile;
use solis_render::{Camera, Color, Environment, Material, Primitive, Quad, Sphere, Triangle, Vec3};

pub fn cornell_box() -> SceneFile {
    let materials = vec![
        Material::matte(Color::new(0.65, 0.05, 0.05)), // 0 red
        Material::matte(Color::new(0.73, 0.73, 0.73)), // 1 white
        Material::matte(Color::new(0.12, 0.45, 0.15)), // 2 green
        Material::light(Color::splat(15.0)),           // 3 light
        Material::glass(Color::splat(0.999)),          // 4
        Material::mirror(Color::splat(0.9)),           // 5
        Material::glossy(Color::new(0.8, 0.6, 0.2), 0.25), // 6
    ];

    const L: f32 = 555.0;
    let quad = |q: Vec3, u: Vec3, v: Vec3, material| -> Primitive {
        Quad::new(q, u, v, material).into()
    };

    let mut primitives: Vec<Primitive> = vec![
        // Walls
        quad(Vec3::new(L, 0.0, 0.0), Vec3::Y * L, Vec3::Z * L, 2),
        quad(Vec3::ZERO, Vec3::Y * L, Vec3::Z * L, 0),
        quad(Vec3::ZERO, Vec3::X * L, Vec3::Z * L, 1),
        quad(Vec3::splat(L), Vec3::X * -L, Vec3::Z * -L, 1),
        quad(Vec3::new(0.0, 0.0, L), Vec3::X * L, Vec3::Y * L, 1),
        // Ceiling lamp
        quad(Vec3::new(343.0, 554.0, 332.0), Vec3::X * -130.0, Vec3::Z * -105.0, 3),
        // Objects
        Sphere::new(Vec3::new(190.0, 90.0, 190.0), 90.0, 4).into(),
        Sphere::new(Vec3::new(400.0, 100.0, 380.0), 100.0, 5).into(),
    ];

    // Small glossy pyramid
    let apex = Vec3::new(420.0, 160.0, 120.0);
    let base = [
        Vec3::new(360.0, 0.0, 60.0),
        Vec3::new(480.0, 0.0, 60.0),
        Vec3::new(480.0, 0.0, 180.0),
        Vec3::new(360.0, 0.0, 180.0),
    ];
    for i in 0..base.len() {
        primitives.push(Triangle::new(base[i], base[(i + 1) % base.len()], apex, 6).into());
    }

    let camera = Camera::new()
        .with_position(Vec3::new(278.0, 278.0, -800.0), Vec3::new(278.0, 278.0, 0.0), Vec3::Y)
        .with_lens(40.0, 0.0, 10.0);

    SceneFile {
        camera,
        environment: Environment::Black,
        materials,
        primitives,
        ..SceneFile::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solis_render::Ray;

    #[test]
    fn test_cornell_box_builds() {
        let (scene, _, _) = cornell_box().into_scene().unwrap();
        assert_eq!(scene.primitives().len(), 12);

        // Looking straight up from the floor center hits the lamp
        let rec = scene
            .intersect(&Ray::new(Vec3::new(278.0, 1.0, 279.0), Vec3::Y))
            .unwrap();
        assert_eq!(scene.material(rec.material.unwrap()).emissive(), Color::splat(15.0));
    }

    #[test]
    fn test_cornell_box_round_trips_through_json() {
        let json = serde_json::to_string(&cornell_box()).unwrap();
        let back: SceneFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.primitives, cornell_box().primitives);
        assert_eq!(back.materials, cornell_box().materials);
    }
}
