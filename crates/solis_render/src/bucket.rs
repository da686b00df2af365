//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that are rendered independently
//! and in parallel. Each bucket owns its pixels and its random stream.

use crate::accumulator::{Accumulator, CancelToken};
use crate::camera::Camera;
use crate::integrator::render_pixel;
use crate::renderer::RenderConfig;
use crate::scene::Scene;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Tile of pixels rendered by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left pixel
    pub x: u32,
    pub y: u32,
    /// Size in pixels; edge tiles can be smaller than the bucket size
    pub width: u32,
    pub height: u32,
    /// Position in the tile grid
    pub grid_x: u32,
    pub grid_y: u32,
    /// Position in render order
    pub index: usize,
}

impl Bucket {
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Seed of this bucket's random stream.
    ///
    /// Depends only on the render seed and the grid position, so a render
    /// with the same bucket size is reproducible whatever the thread count.
    pub fn seed(&self, render_seed: u64) -> u64 {
        let cell = ((self.grid_y as u64) << 32) | self.grid_x as u64;
        splitmix64(render_seed ^ splitmix64(cell))
    }

    /// Render every pixel of the bucket into `accumulator`.
    ///
    /// Returns the number of samples traced.
    pub fn render(
        &self,
        scene: &Scene,
        camera: &Camera,
        config: &RenderConfig,
        accumulator: &Accumulator,
        cancel: &CancelToken,
    ) -> u64 {
        let mut rng = StdRng::seed_from_u64(self.seed(config.seed));
        let mut traced = 0u64;

        for y in self.y..self.y + self.height {
            for x in self.x..self.x + self.width {
                if cancel.is_cancelled() {
                    return traced;
                }
                let (color, samples) = render_pixel(scene, camera, x, y, config, &mut rng, cancel);
                accumulator.add(x, y, color);
                traced += samples as u64;
            }
        }

        traced
    }
}

pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// Tile a `width` x `height` image, centre-out.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width).step_by(size as usize).map(move |x| Bucket {
                x,
                y,
                width: size.min(width - x),
                height: size.min(height - y),
                grid_x: x / size,
                grid_y: y / size,
                index: 0,
            })
        })
        .collect();

    sort_spiral(&mut buckets, width, height);
    buckets.iter_mut().enumerate().for_each(|(i, b)| b.index = i);
    buckets
}

/// Order buckets by the distance of their midpoint to the image midpoint.
/// Ties keep row-major order.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let mid_x = 0.5 * width as f32;
    let mid_y = 0.5 * height as f32;
    let key = |b: &Bucket| {
        let dx = b.x as f32 + 0.5 * b.width as f32 - mid_x;
        let dy = b.y as f32 + 0.5 * b.height as f32 - mid_y;
        dx * dx + dy * dy
    };
    buckets.sort_by(|a, b| key(a).total_cmp(&key(b)));
}

/// SplitMix64 finalizer, used to decorrelate bucket seeds.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
