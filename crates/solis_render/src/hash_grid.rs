//! Spatial hash grid over camera-path hit points.
//!
//! Used for photon gathering: every hit point is stored in each cell its
//! search sphere overlaps, so a single cell lookup returns every hit point
//! whose sphere may contain a query position.

use crate::material::Color;
use solis_math::{Aabb, Vec3};

/// Smallest search radius, kept when all hit points coincide.
const MIN_RADIUS: f32 = 1e-4;

/// A surface position seen from a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPoint {
    pub position: Vec3,
    pub normal: Vec3,
    /// Throughput from the camera to this point
    pub weight: Color,
    /// Row-major index of the pixel the point belongs to
    pub pixel: u32,
}

/// Cell addressing: grid origin, cell size and hash table size.
#[derive(Debug, Clone, Copy)]
struct Cells {
    origin: Vec3,
    inv_cell_size: f32,
    table: u32,
}

impl Cells {
    fn cell_of(&self, p: Vec3) -> [i32; 3] {
        let o = ((p - self.origin) * self.inv_cell_size).floor();
        [o.x as i32, o.y as i32, o.z as i32]
    }

    fn hash(&self, [ix, iy, iz]: [i32; 3]) -> usize {
        let h = (ix as u32).wrapping_mul(73_856_093)
            ^ (iy as u32).wrapping_mul(19_349_663)
            ^ (iz as u32).wrapping_mul(83_492_791);
        (h % self.table) as usize
    }

    /// Call `f` with the hash of every cell overlapped by the box of
    /// half-size `radius` around `p`.
    fn overlapped(&self, p: Vec3, radius: f32, mut f: impl FnMut(usize)) {
        let [x0, y0, z0] = self.cell_of(p - Vec3::splat(radius));
        let [x1, y1, z1] = self.cell_of(p + Vec3::splat(radius));
        for iz in z0..=z1 {
            for iy in y0..=y1 {
                for ix in x0..=x1 {
                    f(self.hash([ix, iy, iz]));
                }
            }
        }
    }
}

/// Read-only spatial hash from grid cells to hit point indices.
#[derive(Debug, Clone)]
pub struct HashGrid {
    bounds: Aabb,
    radius: f32,
    cells: Cells,
    /// `entries[offsets[h]..offsets[h + 1]]` are the points of bucket `h`
    offsets: Vec<u32>,
    entries: Vec<u32>,
}

impl HashGrid {
    /// Build the grid for a `width × height` image.
    ///
    /// The search radius is twice the average box extent divided by the
    /// average image side, about two pixel footprints.
    pub fn build(width: u32, height: u32, points: &[HitPoint]) -> Self {
        let raw_bounds = points
            .iter()
            .fold(Aabb::EMPTY, |acc, p| acc.include_point(p.position));

        let size = raw_bounds.extent();
        let side = (width as f32 + height as f32) / 2.0;
        let mut radius = ((size.x + size.y + size.z) / 3.0) / side.max(1.0) * 2.0;
        if !(radius >= MIN_RADIUS) {
            radius = MIN_RADIUS;
        }

        let bounds = if points.is_empty() {
            Aabb::EMPTY
        } else {
            Aabb::new(
                raw_bounds.x.expand(2.0 * radius),
                raw_bounds.y.expand(2.0 * radius),
                raw_bounds.z.expand(2.0 * radius),
            )
        };
        let cells = Cells {
            origin: if points.is_empty() { Vec3::ZERO } else { bounds.min() },
            inv_cell_size: 1.0 / (2.0 * radius),
            table: points.len().max(1) as u32,
        };

        // Count, prefix-sum, then fill
        let table = cells.table as usize;
        let mut counts = vec![0u32; table];
        for p in points {
            cells.overlapped(p.position, radius, |h| counts[h] += 1);
        }

        let mut offsets = Vec::with_capacity(table + 1);
        let mut total = 0u32;
        for count in &counts {
            offsets.push(total);
            total += count;
        }
        offsets.push(total);

        let mut entries = vec![0u32; total as usize];
        let mut cursor = offsets[..table].to_vec();
        for (i, p) in points.iter().enumerate() {
            cells.overlapped(p.position, radius, |h| {
                entries[cursor[h] as usize] = i as u32;
                cursor[h] += 1;
            });
        }

        log::debug!(
            "Hash grid: {} hit points, radius {:.5}, {} entries",
            points.len(),
            radius,
            entries.len()
        );

        Self {
            bounds,
            radius,
            cells,
            offsets,
            entries,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Hit point box expanded by the radius.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate hit point indices for `point`. May contain points farther
    /// than the radius (hash collisions, cell corners) and repeats.
    pub fn get(&self, point: Vec3) -> &[u32] {
        if self.is_empty() {
            return &[];
        }
        let h = self.cells.hash(self.cells.cell_of(point));
        &self.entries[self.offsets[h] as usize..self.offsets[h + 1] as usize]
    }

    /// Indices of hit points within the radius of `point`, ascending.
    pub fn gather(&self, points: &[HitPoint], point: Vec3) -> Vec<u32> {
        let r2 = self.radius * self.radius;
        let mut found: Vec<u32> = self
            .get(point)
            .iter()
            .copied()
            .filter(|&i| (points[i as usize].position - point).length_squared() <= r2)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}
