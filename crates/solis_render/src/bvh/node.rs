//! BVH node layout.
//!
//! Branch nodes keep the boxes of all their children in a structure-of-arrays
//! block so a ray is tested against every child in one pass.

use solis_math::{Aabb, Interval, Vec3};

/// Widest supported branching factor.
pub const MAX_WIDTH: usize = 8;

/// Child boxes of a branch, one lane per child.
///
/// Unused lanes hold [`Aabb::EMPTY`]; callers mask them out with the
/// branch's valid-lane mask.
#[derive(Debug, Clone, PartialEq)]
#[repr(C, align(32))]
pub struct ChildBounds {
    pub min_x: [f32; MAX_WIDTH],
    pub max_x: [f32; MAX_WIDTH],
    pub min_y: [f32; MAX_WIDTH],
    pub max_y: [f32; MAX_WIDTH],
    pub min_z: [f32; MAX_WIDTH],
    pub max_z: [f32; MAX_WIDTH],
}

impl Default for ChildBounds {
    fn default() -> Self {
        Self {
            min_x: [f32::INFINITY; MAX_WIDTH],
            max_x: [f32::NEG_INFINITY; MAX_WIDTH],
            min_y: [f32::INFINITY; MAX_WIDTH],
            max_y: [f32::NEG_INFINITY; MAX_WIDTH],
            min_z: [f32::INFINITY; MAX_WIDTH],
            max_z: [f32::NEG_INFINITY; MAX_WIDTH],
        }
    }
}

impl ChildBounds {
    #[inline]
    pub fn set(&mut self, lane: usize, aabb: &Aabb) {
        self.min_x[lane] = aabb.x.min;
        self.max_x[lane] = aabb.x.max;
        self.min_y[lane] = aabb.y.min;
        self.max_y[lane] = aabb.y.max;
        self.min_z[lane] = aabb.z.min;
        self.max_z[lane] = aabb.z.max;
    }

    /// Box stored in `lane`.
    pub fn lane(&self, lane: usize) -> Aabb {
        Aabb {
            x: Interval::new(self.min_x[lane], self.max_x[lane]),
            y: Interval::new(self.min_y[lane], self.max_y[lane]),
            z: Interval::new(self.min_z[lane], self.max_z[lane]),
        }
    }

    /// Slab test against every lane. Bit `i` is set when lane `i` overlaps
    /// the ray inside `t`.
    #[inline]
    pub fn hit_mask(&self, origin: Vec3, inv_dir: Vec3, t: Interval) -> u8 {
        let mut mask = 0u8;
        for lane in 0..MAX_WIDTH {
            let slabs = [
                (self.min_x[lane], self.max_x[lane], origin.x, inv_dir.x),
                (self.min_y[lane], self.max_y[lane], origin.y, inv_dir.y),
                (self.min_z[lane], self.max_z[lane], origin.z, inv_dir.z),
            ];

            let mut t_enter = t.min;
            let mut t_exit = t.max;
            for (min, max, o, inv) in slabs {
                let (near, far) = if inv < 0.0 { (max, min) } else { (min, max) };
                // A NaN bound (origin on a slab plane of a parallel ray)
                // leaves the interval unclipped, matching `Aabb::hit`.
                t_enter = t_enter.max((near - o) * inv);
                t_exit = t_exit.min((far - o) * inv);
            }

            if t_enter <= t_exit {
                mask |= 1 << lane;
            }
        }
        mask
    }
}

/// A node in the flat BVH arena.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// Primitives `indices[first..first + count]` of the owning BVH.
    Leaf { bbox: Aabb, first: u32, count: u32 },
    /// Up to [`MAX_WIDTH`] children, addressed by node index.
    Branch {
        bbox: Aabb,
        bounds: ChildBounds,
        children: [u32; MAX_WIDTH],
        len: u8,
    },
}

impl BvhNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Child node indices of a branch; empty for a leaf.
    pub fn children(&self) -> &[u32] {
        match self {
            BvhNode::Leaf { .. } => &[],
            BvhNode::Branch { children, len, .. } => &children[..*len as usize],
        }
    }

    /// Mask with one bit per occupied child lane.
    #[inline]
    pub fn valid_mask(len: u8) -> u8 {
        if len as usize >= MAX_WIDTH {
            u8::MAX
        } else {
            (1u8 << len) - 1
        }
    }
}
