use crate::{Interval, Vec3};

/// A ray in 3D space with origin, direction and a valid parameter range.
///
/// The direction is normalized on construction so `t` is a distance. A zero
/// (or non-finite) direction stays zero; such a ray never hits anything.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Accepted hit distances, `[t_min, t_max]`.
    pub t: Interval,
}

impl Ray {
    /// Offset applied to secondary rays so they do not re-hit their origin surface.
    pub const EPSILON: f32 = 1e-4;

    /// Create a ray with the default interval `[EPSILON, +inf]`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            t: Interval::new(Self::EPSILON, f32::INFINITY),
        }
    }

    /// Replace the valid parameter interval.
    pub fn with_interval(mut self, t: Interval) -> Self {
        self.t = t;
        self
    }

    #[inline]
    pub fn t_min(&self) -> f32 {
        self.t.min
    }

    #[inline]
    pub fn t_max(&self) -> f32 {
        self.t.max
    }

    /// Point along the ray at parameter t: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
