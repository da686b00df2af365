//! Parallelogram primitive, spanned by a corner and two edge vectors.

use crate::hittable::{HitRecord, Hittable, MaterialId};
use serde::{Deserialize, Serialize};
use solis_math::{Aabb, Ray, Vec2, Vec3};

/// A quad (parallelogram) with corner `q` and edges `u`, `v`.
///
/// Points on the quad are `q + alpha * u + beta * v` with `alpha, beta`
/// in `[0, 1]`; `(alpha, beta)` doubles as the texture coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub q: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub material: MaterialId,
}

impl Quad {
    pub fn new(q: Vec3, u: Vec3, v: Vec3, material: MaterialId) -> Self {
        Self { q, u, v, material }
    }
}

impl Hittable for Quad {
    fn hit(&self, ray: &Ray, rec: &mut HitRecord) -> bool {
        let n = self.u.cross(self.v);
        let nn = n.length_squared();
        if nn == 0.0 {
            return false;
        }
        let normal = n / nn.sqrt();

        let denom = normal.dot(ray.direction);
        if denom.abs() < 1e-8 {
            return false;
        }

        let d = normal.dot(self.q);
        let t = (d - normal.dot(ray.origin)) / denom;
        if !rec.search_interval(ray).surrounds(t) {
            return false;
        }

        // Planar coordinates of the hit point in the (u, v) frame
        let w = n / nn;
        let planar = ray.at(t) - self.q;
        let alpha = w.dot(planar.cross(self.v));
        let beta = w.dot(self.u.cross(planar));
        if !(0.0..=1.0).contains(&alpha) || !(0.0..=1.0).contains(&beta) {
            return false;
        }

        rec.record(ray, t, normal, Vec2::new(alpha, beta), self.material);
        true
    }

    fn bounding_box(&self) -> Aabb {
        let corners = [self.q, self.q + self.u, self.q + self.v, self.q + self.u + self.v];
        let min = corners.iter().fold(Vec3::INFINITY, |acc, c| acc.min(*c));
        let max = corners.iter().fold(Vec3::NEG_INFINITY, |acc, c| acc.max(*c));
        Aabb::from_points(min, max)
    }

    fn centroid(&self) -> Vec3 {
        self.q + 0.5 * (self.u + self.v)
    }
}
