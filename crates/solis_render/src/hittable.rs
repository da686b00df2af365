//! Hittable trait, HitRecord and the closed set of scene primitives.

use crate::{Quad, Sphere, Triangle};
use serde::{Deserialize, Serialize};
use solis_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// Handle of a primitive in the scene arena.
pub type PrimitiveId = u32;

/// Handle of a material in the scene's material array.
pub type MaterialId = u32;

/// Record of the nearest ray-object intersection found so far.
///
/// `distance` starts at the ray's `t_max` and only ever decreases during a
/// traversal: a primitive accepts a hit only when `t_min < t < distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Parameter t of the nearest hit so far
    pub distance: f32,
    /// Point of intersection
    pub position: Vec3,
    /// Geometric outward normal (unit length)
    pub normal: Vec3,
    /// Texture coordinate
    pub texcoord: Vec2,
    /// Hit primitive, set by the acceleration structure
    pub primitive: Option<PrimitiveId>,
    /// Material of the hit primitive
    pub material: Option<MaterialId>,
}

impl HitRecord {
    /// Empty record for a traversal of `ray`.
    pub fn new(ray: &Ray) -> Self {
        Self {
            distance: ray.t_max(),
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            texcoord: Vec2::ZERO,
            primitive: None,
            material: None,
        }
    }

    /// Interval a primitive may still accept hits in.
    #[inline]
    pub fn search_interval(&self, ray: &Ray) -> Interval {
        Interval::new(ray.t_min(), self.distance)
    }

    /// True once any primitive accepted a hit.
    pub fn is_hit(&self) -> bool {
        self.material.is_some()
    }

    /// Store an accepted hit.
    pub(crate) fn record(
        &mut self,
        ray: &Ray,
        t: f32,
        normal: Vec3,
        texcoord: Vec2,
        material: MaterialId,
    ) {
        self.distance = t;
        self.position = ray.at(t);
        self.normal = normal;
        self.texcoord = texcoord;
        self.material = Some(material);
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object nearer than `rec.distance`.
    ///
    /// Returns true if hit, and updates the record.
    fn hit(&self, ray: &Ray, rec: &mut HitRecord) -> bool;

    /// Axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Representative center used to sort primitives during BVH builds.
    fn centroid(&self) -> Vec3 {
        self.bounding_box().center()
    }
}

/// A scene primitive. One representation for every acceleration layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
    Quad(Quad),
}

impl Primitive {
    pub fn material(&self) -> MaterialId {
        match self {
            Primitive::Sphere(s) => s.material,
            Primitive::Triangle(t) => t.material,
            Primitive::Quad(q) => q.material,
        }
    }
}

impl Hittable for Primitive {
    #[inline]
    fn hit(&self, ray: &Ray, rec: &mut HitRecord) -> bool {
        match self {
            Primitive::Sphere(s) => s.hit(ray, rec),
            Primitive::Triangle(t) => t.hit(ray, rec),
            Primitive::Quad(q) => q.hit(ray, rec),
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            Primitive::Sphere(s) => s.bounding_box(),
            Primitive::Triangle(t) => t.bounding_box(),
            Primitive::Quad(q) => q.bounding_box(),
        }
    }

    fn centroid(&self) -> Vec3 {
        match self {
            Primitive::Sphere(s) => s.centroid(),
            Primitive::Triangle(t) => t.centroid(),
            Primitive::Quad(q) => q.centroid(),
        }
    }
}

impl From<Sphere> for Primitive {
    fn from(s: Sphere) -> Self {
        Primitive::Sphere(s)
    }
}

impl From<Triangle> for Primitive {
    fn from(t: Triangle) -> Self {
        Primitive::Triangle(t)
    }
}

impl From<Quad> for Primitive {
    fn from(q: Quad) -> Self {
        Primitive::Quad(q)
    }
}

/// Nearest hit by testing every primitive. Reference for BVH tests.
pub fn brute_force_hit<P: Hittable>(primitives: &[P], ray: &Ray, rec: &mut HitRecord) -> bool {
    let mut hit_anything = false;
    for (i, p) in primitives.iter().enumerate() {
        if p.hit(ray, rec) {
            rec.primitive = Some(i as PrimitiveId);
            hit_anything = true;
        }
    }
    hit_anything
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_starts_at_ray_t_max() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).with_interval(Interval::new(0.1, 50.0));
        let rec = HitRecord::new(&ray);
        assert_eq!(rec.distance, 50.0);
        assert!(!rec.is_hit());
        assert_eq!(rec.search_interval(&ray), Interval::new(0.1, 50.0));
    }

    #[test]
    fn test_brute_force_keeps_nearest() {
        let spheres = vec![
            Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0, 0),
            Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, 1),
            Sphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0, 2),
        ];
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let mut rec = HitRecord::new(&ray);
        assert!(brute_force_hit(&spheres, &ray, &mut rec));
        assert_eq!(rec.primitive, Some(1));
        assert!((rec.distance - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_primitive_serde_tagged() {
        let p = Primitive::from(Sphere::new(Vec3::ZERO, 2.0, 3));
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"type\":\"sphere\""));
        let back: Primitive = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
