use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box for spatial acceleration structures (BVH).
///
/// An AABB is three intervals, one per axis. [`Aabb::EMPTY`] is the identity
/// of [`Aabb::merge`], which is commutative and associative.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Contains nothing.
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    /// Contains everything.
    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };

    /// Minimum slab width kept by [`Aabb::new`] and [`Aabb::from_points`].
    const MIN_WIDTH: f32 = 0.0001;

    /// Create a new AABB from three intervals, padding zero-width axes.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create a padded AABB from two opposite corners.
    ///
    /// Flat primitives (axis-aligned triangles and quads) get a thin but
    /// non-zero slab so the slab test never divides a zero extent.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self::new(
            Interval::new(a.x.min(b.x), a.x.max(b.x)),
            Interval::new(a.y.min(b.y), a.y.max(b.y)),
            Interval::new(a.z.min(b.z), a.z.max(b.z)),
        )
    }

    /// Smallest box containing both operands.
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Self {
            x: self.x.union(&other.x),
            y: self.y.union(&other.y),
            z: self.z.union(&other.z),
        }
    }

    /// Grow to contain a point, without padding.
    ///
    /// Used for centroid bounds, where a zero extent must stay zero.
    pub fn include_point(&self, p: Vec3) -> Aabb {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Interval for an axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Edge lengths. Zero for an empty box.
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max() - self.min()
        }
    }

    /// Surface area, the SAH cost measure. Zero for an empty box.
    pub fn area(&self) -> f32 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Position of `p` relative to the box corners: 0 at `min`, 1 at `max`.
    ///
    /// Axes with zero extent map to 0.
    pub fn offset(&self, p: Vec3) -> Vec3 {
        let d = self.extent();
        let o = p - self.min();
        Vec3::new(
            if d.x > 0.0 { o.x / d.x } else { 0.0 },
            if d.y > 0.0 { o.y / d.y } else { 0.0 },
            if d.z > 0.0 { o.z / d.z } else { 0.0 },
        )
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        if other.is_empty() {
            return true;
        }
        self.x.min <= other.x.min
            && other.x.max <= self.x.max
            && self.y.min <= other.y.min
            && other.y.max <= self.y.max
            && self.z.min <= other.z.min
            && other.z.max <= self.z.max
    }

    /// Test if a ray intersects this AABB within the given interval.
    ///
    /// Slab method: clip `ray_t` against the three axis slabs in turn.
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        let origin = r.origin.to_array();
        let direction = r.direction.to_array();

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let adinv = 1.0 / direction[axis];
            let mut t0 = (slab.min - origin[axis]) * adinv;
            let mut t1 = (slab.max - origin[axis]) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max < ray_t.min {
                return false;
            }
        }

        true
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        if self.x.size() < Self::MIN_WIDTH {
            self.x = self.x.expand(Self::MIN_WIDTH);
        }
        if self.y.size() < Self::MIN_WIDTH {
            self.y = self.y.expand(Self::MIN_WIDTH);
        }
        if self.z.size() < Self::MIN_WIDTH {
            self.z = self.z.expand(Self::MIN_WIDTH);
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> Vec<Aabb> {
        vec![
            Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0)),
            Aabb::from_points(Vec3::new(3.0, -2.0, 3.0), Vec3::new(10.0, 1.0, 10.0)),
            Aabb::from_points(Vec3::new(-7.0, 4.0, 0.5), Vec3::new(-6.0, 9.0, 0.75)),
            Aabb::EMPTY,
        ]
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_flat_box_is_padded() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert!(aabb.z.size() > 0.0);
    }

    #[test]
    fn test_merge_contains_both() {
        for a in boxes() {
            for b in boxes() {
                let m = a.merge(&b);
                assert!(m.contains(&a), "{m:?} should contain {a:?}");
                assert!(m.contains(&b), "{m:?} should contain {b:?}");
            }
        }
    }

    #[test]
    fn test_merge_commutative() {
        for a in boxes() {
            for b in boxes() {
                assert_eq!(a.merge(&b), b.merge(&a));
            }
        }
    }

    #[test]
    fn test_merge_associative() {
        for a in boxes() {
            for b in boxes() {
                for c in boxes() {
                    assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
                }
            }
        }
    }

    #[test]
    fn test_include_point_keeps_zero_extent() {
        let b = Aabb::EMPTY
            .include_point(Vec3::new(1.0, 2.0, 3.0))
            .include_point(Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(b.extent(), Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(b.longest_axis(), 1);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let t = Interval::new(0.0, 100.0);

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.hit(&ray, t));

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(!aabb.hit(&ray, t));

        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(!aabb.hit(&ray, t));

        // Interval ends before the box starts
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(!aabb.hit(&ray, Interval::new(0.0, 3.0)));
    }

    #[test]
    fn test_aabb_area_and_center() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.area(), 2.0 * (2.0 + 6.0 + 3.0));
        assert_eq!(aabb.center(), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(Aabb::EMPTY.area(), 0.0);
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_aabb_offset() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(aabb.offset(Vec3::new(5.0, 0.0, 10.0)), Vec3::new(0.5, 0.0, 1.0));
    }
}
