//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A flat node arena over primitive indices. Nodes have 2, 4 or 8 children;
//! wider trees are built with nested binary splits, using either a median
//! split or a binned surface area heuristic (SAH).

mod build;
mod node;

pub use node::{BvhNode, ChildBounds, MAX_WIDTH};

use crate::hittable::{HitRecord, Hittable, PrimitiveId};
use build::Builder;
use serde::{Deserialize, Serialize};
use solis_math::{Aabb, Ray, Vec3};
use std::collections::TryReserveError;
use std::time::Instant;
use thiserror::Error;

/// Children per branch node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchingFactor {
    Two,
    #[default]
    Four,
    Eight,
}

impl BranchingFactor {
    /// Maximum number of children of a branch.
    pub fn width(self) -> usize {
        match self {
            BranchingFactor::Two => 2,
            BranchingFactor::Four => 4,
            BranchingFactor::Eight => 8,
        }
    }

    /// Binary split levels performed inside one node.
    pub fn levels(self) -> u32 {
        self.width().trailing_zeros()
    }
}

/// How a set of primitives is divided in two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Halve at the median centroid along the widest axis.
    Median,
    /// Binned surface area heuristic along the widest axis.
    #[default]
    Sah,
}

/// BVH build settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    pub branching: BranchingFactor,
    pub split: SplitMethod,
    /// Number of SAH buckets along the split axis
    pub sah_buckets: usize,
    /// Largest primitive count stored in a leaf without trying to split.
    /// Defaults to the branching factor.
    pub max_leaf_size: Option<usize>,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            branching: BranchingFactor::default(),
            split: SplitMethod::default(),
            sah_buckets: 12,
            max_leaf_size: None,
        }
    }
}

impl BvhConfig {
    pub fn new(branching: BranchingFactor, split: SplitMethod) -> Self {
        Self {
            branching,
            split,
            ..Self::default()
        }
    }

    pub(crate) fn leaf_size(&self) -> usize {
        self.max_leaf_size.unwrap_or_else(|| self.branching.width()).max(1)
    }

    pub(crate) fn buckets(&self) -> usize {
        self.sah_buckets.max(2)
    }
}

/// Errors raised while building a BVH.
#[derive(Debug, Error)]
pub enum BvhError {
    #[error("Out of memory building BVH: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("Too many primitives for a BVH: {0}")]
    TooManyPrimitives(usize),
}

/// Shape of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
}

/// Bounding volume hierarchy over a primitive slice.
///
/// The tree stores indices only; the same primitive slice must be passed to
/// [`Bvh::hit`] that was passed to [`Bvh::build`].
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<PrimitiveId>,
    config: BvhConfig,
}

impl Bvh {
    /// Build a BVH over `primitives`.
    pub fn build<P: Hittable>(primitives: &[P], config: BvhConfig) -> Result<Self, BvhError> {
        let start = Instant::now();

        if primitives.is_empty() {
            log::info!("BVH build skipped: scene has no primitives");
            return Ok(Self::empty(config));
        }

        let mut builder = Builder::new(primitives, config)?;
        builder.build_node(0, primitives.len())?;

        let bvh = Self {
            nodes: builder.nodes,
            indices: builder.indices,
            config,
        };

        let stats = bvh.stats();
        log::info!(
            "BVH built in {:.2?}: {} primitives, {} nodes, {} leaves, depth {}, {:?}/{:?}",
            start.elapsed(),
            stats.primitives,
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            config.branching,
            config.split,
        );

        Ok(bvh)
    }

    /// A tree over no primitives. Every query misses.
    pub fn empty(config: BvhConfig) -> Self {
        Self {
            nodes: Vec::new(),
            indices: Vec::new(),
            config,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    /// Node arena; the root is at index 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.root().map_or(Aabb::EMPTY, |n| *n.bbox())
    }

    /// Primitive indices stored in a leaf.
    pub fn leaf_primitives(&self, node: &BvhNode) -> &[PrimitiveId] {
        match *node {
            BvhNode::Leaf { first, count, .. } => {
                &self.indices[first as usize..(first + count) as usize]
            }
            BvhNode::Branch { .. } => &[],
        }
    }

    /// All primitive indices below `node`, in tree order.
    pub fn subtree_primitives(&self, node: u32) -> Vec<PrimitiveId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i as usize];
            out.extend_from_slice(self.leaf_primitives(node));
            stack.extend(node.children().iter().rev());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of node levels; zero for an empty tree.
    pub fn depth(&self) -> usize {
        self.stats().max_depth
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            primitives: self.indices.len(),
            nodes: self.nodes.len(),
            ..BvhStats::default()
        };
        if self.is_empty() {
            return stats;
        }

        let mut stack = vec![(0u32, 1usize)];
        while let Some((i, depth)) = stack.pop() {
            let node = &self.nodes[i as usize];
            stats.max_depth = stats.max_depth.max(depth);
            if let BvhNode::Leaf { count, .. } = node {
                stats.leaves += 1;
                stats.max_leaf_size = stats.max_leaf_size.max(*count as usize);
            }
            stack.extend(node.children().iter().map(|&c| (c, depth + 1)));
        }
        stats
    }

    /// Find the nearest hit of `ray` among `primitives`.
    ///
    /// Updates `rec` (including `rec.primitive`) and returns true when a hit
    /// nearer than `rec.distance` is found.
    pub fn hit<P: Hittable>(&self, primitives: &[P], ray: &Ray, rec: &mut HitRecord) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        if !root.bbox().hit(ray, rec.search_interval(ray)) {
            return false;
        }

        let inv_dir = ray.direction.recip();
        self.hit_node(0, primitives, ray, inv_dir, rec)
    }

    fn hit_node<P: Hittable>(
        &self,
        index: u32,
        primitives: &[P],
        ray: &Ray,
        inv_dir: Vec3,
        rec: &mut HitRecord,
    ) -> bool {
        match &self.nodes[index as usize] {
            BvhNode::Leaf { first, count, .. } => {
                let mut hit_anything = false;
                for &p in &self.indices[*first as usize..(*first + *count) as usize] {
                    if primitives[p as usize].hit(ray, rec) {
                        rec.primitive = Some(p);
                        hit_anything = true;
                    }
                }
                hit_anything
            }
            BvhNode::Branch {
                bounds, children, len, ..
            } => {
                let mut mask = bounds.hit_mask(ray.origin, inv_dir, rec.search_interval(ray))
                    & BvhNode::valid_mask(*len);
                let mut hit_anything = false;
                while mask != 0 {
                    let lane = mask.trailing_zeros() as usize;
                    mask &= mask - 1;
                    if self.hit_node(children[lane], primitives, ray, inv_dir, rec) {
                        hit_anything = true;
                    }
                }
                hit_anything
            }
        }
    }
}
