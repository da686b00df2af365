//! Top-down BVH construction with median or binned SAH splits.
//!
//! Wide nodes (k = 4, 8) are produced by nested binary splits inside one
//! node: `log2(k)` levels, k - 1 splits in total.

use super::node::{BvhNode, ChildBounds, MAX_WIDTH};
use super::{BvhConfig, BvhError, SplitMethod};
use crate::hittable::{Hittable, PrimitiveId};
use solis_math::{Aabb, Vec3};

/// Constant traversal cost term of the SAH cost model.
const TRAVERSAL_COST: f32 = 1.0;

/// Primitive ranges after the nested splits of one node.
type Groups = Vec<(usize, usize)>;

pub(super) struct Builder {
    config: BvhConfig,
    bounds: Vec<Aabb>,
    centroids: Vec<Vec3>,
    pub(super) indices: Vec<PrimitiveId>,
    pub(super) nodes: Vec<BvhNode>,
}

impl Builder {
    pub(super) fn new<P: Hittable>(primitives: &[P], config: BvhConfig) -> Result<Self, BvhError> {
        let n = primitives.len();
        if PrimitiveId::try_from(n).is_err() {
            return Err(BvhError::TooManyPrimitives(n));
        }

        let mut bounds = Vec::new();
        bounds.try_reserve_exact(n)?;
        bounds.extend(primitives.iter().map(|p| p.bounding_box()));

        let mut centroids = Vec::new();
        centroids.try_reserve_exact(n)?;
        centroids.extend(primitives.iter().map(|p| p.centroid()));

        let mut indices = Vec::new();
        indices.try_reserve_exact(n)?;
        indices.extend(0..n as PrimitiveId);

        // A tree over n primitives never has more than 2n - 1 nodes
        let mut nodes = Vec::new();
        nodes.try_reserve(2 * n)?;

        Ok(Self {
            config,
            bounds,
            centroids,
            indices,
            nodes,
        })
    }

    /// Build the subtree over `indices[start..end]`, returning its node index.
    pub(super) fn build_node(&mut self, start: usize, end: usize) -> Result<u32, BvhError> {
        let bbox = self.range_bounds(start, end);

        if end - start <= self.config.leaf_size() {
            return self.push_leaf(bbox, start, end);
        }

        let groups = match self.nested_split(start, end) {
            Some(groups) => groups,
            None => return self.push_leaf(bbox, start, end),
        };

        // Reserve the slot so the parent precedes its children
        let index = self.push(BvhNode::Leaf {
            bbox,
            first: start as u32,
            count: 0,
        })?;

        let mut bounds = ChildBounds::default();
        let mut children = [0u32; MAX_WIDTH];
        for (lane, &(s, e)) in groups.iter().enumerate() {
            let child = self.build_node(s, e)?;
            bounds.set(lane, self.nodes[child as usize].bbox());
            children[lane] = child;
        }

        self.nodes[index as usize] = BvhNode::Branch {
            bbox,
            bounds,
            children,
            len: groups.len() as u8,
        };
        Ok(index)
    }

    /// Split `start..end` into up to k groups, or `None` when any split
    /// fails and the node has to stay a leaf.
    fn nested_split(&mut self, start: usize, end: usize) -> Option<Groups> {
        let mut groups: Groups = vec![(start, end)];

        for _ in 0..self.config.branching.levels() {
            let mut next = Groups::with_capacity(groups.len() * 2);
            for (s, e) in groups {
                if e - s <= 1 {
                    next.push((s, e));
                    continue;
                }
                let mid = self.split(s, e)?;
                next.push((s, mid));
                next.push((mid, e));
            }
            groups = next;
        }

        Some(groups)
    }

    /// One binary split of `start..end`. Returns the partition point.
    fn split(&mut self, start: usize, end: usize) -> Option<usize> {
        let centroid_bounds = self.indices[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.include_point(self.centroids[i as usize]));

        let axis = centroid_bounds.longest_axis();
        let extent = centroid_bounds.extent()[axis];

        // All centroids coincide on the widest axis: splitting cannot converge
        if !(extent > 0.0) {
            return None;
        }

        let mid = match self.config.split {
            SplitMethod::Median => self.median_split(start, end, axis),
            SplitMethod::Sah => self.sah_split(start, end, axis, &centroid_bounds)?,
        };

        (start < mid && mid < end).then_some(mid)
    }

    fn median_split(&mut self, start: usize, end: usize, axis: usize) -> usize {
        let centroids = &self.centroids;
        let half = (end - start) / 2;
        self.indices[start..end].select_nth_unstable_by(half, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });
        start + half
    }

    fn sah_split(
        &mut self,
        start: usize,
        end: usize,
        axis: usize,
        centroid_bounds: &Aabb,
    ) -> Option<usize> {
        let bucket_count = self.config.buckets();
        let cmin = centroid_bounds.min()[axis];
        let extent = centroid_bounds.extent()[axis];
        let bucket_of = |c: Vec3| -> usize {
            let b = ((c[axis] - cmin) / extent * bucket_count as f32) as usize;
            b.min(bucket_count - 1)
        };

        let mut counts = vec![0usize; bucket_count];
        let mut boxes = vec![Aabb::EMPTY; bucket_count];
        for &i in &self.indices[start..end] {
            let b = bucket_of(self.centroids[i as usize]);
            counts[b] += 1;
            boxes[b] = boxes[b].merge(&self.bounds[i as usize]);
        }

        // Suffix sweep: right-hand side of every boundary
        let mut right_count = vec![0usize; bucket_count];
        let mut right_area = vec![0.0f32; bucket_count];
        let mut sweep = Aabb::EMPTY;
        let mut sweep_count = 0;
        for b in (1..bucket_count).rev() {
            sweep = sweep.merge(&boxes[b]);
            sweep_count += counts[b];
            right_count[b] = sweep_count;
            right_area[b] = sweep.area();
        }

        let parent_area = self.range_bounds(start, end).area();
        let mut best: Option<(usize, f32)> = None;
        let mut sweep = Aabb::EMPTY;
        let mut left_count = 0;
        for boundary in 1..bucket_count {
            sweep = sweep.merge(&boxes[boundary - 1]);
            left_count += counts[boundary - 1];
            let count_right = right_count[boundary];
            if left_count == 0 || count_right == 0 {
                continue;
            }

            let cost = TRAVERSAL_COST
                + (left_count as f32 * sweep.area() + count_right as f32 * right_area[boundary])
                    / parent_area;
            if best.map_or(true, |(_, c)| cost < c) {
                best = Some((boundary, cost));
            }
        }

        // Not splitting costs one intersection per primitive
        let leaf_cost = (end - start) as f32;
        let (boundary, cost) = best?;
        if !(cost < leaf_cost) {
            return None;
        }

        let centroids = &self.centroids;
        let left = partition(&mut self.indices[start..end], |&i| {
            bucket_of(centroids[i as usize]) < boundary
        });
        Some(start + left)
    }

    fn range_bounds(&self, start: usize, end: usize) -> Aabb {
        self.indices[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.merge(&self.bounds[i as usize]))
    }

    fn push_leaf(&mut self, bbox: Aabb, start: usize, end: usize) -> Result<u32, BvhError> {
        self.push(BvhNode::Leaf {
            bbox,
            first: start as u32,
            count: (end - start) as u32,
        })
    }

    fn push(&mut self, node: BvhNode) -> Result<u32, BvhError> {
        self.nodes.try_reserve(1)?;
        self.nodes.push(node);
        Ok((self.nodes.len() - 1) as u32)
    }
}

/// Partition slice in-place. Returns count of elements where predicate is true.
fn partition<T, F>(slice: &mut [T], pred: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}
