//! Shared render state: per-pixel HDR accumulation and cancellation.

use crate::material::Color;
use image::Rgba32FImage;
use solis_math::Vec4;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared by the caller, the workers and the
/// watchdog. Workers poll it once per sample.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Running RGB sums per pixel, stored as `f32` bit patterns.
///
/// Every pixel has exactly one writer (the worker owning its bucket), so a
/// relaxed load followed by a store never loses an update. Snapshots taken
/// while rendering see each channel either before or after a write.
pub struct Accumulator {
    width: u32,
    height: u32,
    channels: Vec<AtomicU32>,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self {
            width,
            height,
            channels: (0..len).map(|_| AtomicU32::new(0.0f32.to_bits())).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Add `color` to pixel `(x, y)`. Only the pixel's owner may call this.
    #[inline]
    pub fn add(&self, x: u32, y: u32, color: Color) {
        let base = (y as usize * self.width as usize + x as usize) * 3;
        for (channel, value) in self.channels[base..base + 3].iter().zip(color.to_array()) {
            let sum = f32::from_bits(channel.load(Ordering::Relaxed)) + value;
            channel.store(sum.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        let base = (y as usize * self.width as usize + x as usize) * 3;
        let c = &self.channels[base..base + 3];
        Color::new(
            f32::from_bits(c[0].load(Ordering::Relaxed)),
            f32::from_bits(c[1].load(Ordering::Relaxed)),
            f32::from_bits(c[2].load(Ordering::Relaxed)),
        )
    }

    /// Copy the current sums into an image.
    pub fn snapshot(&self) -> HdrImage {
        let pixels = self
            .channels
            .chunks_exact(3)
            .map(|c| {
                Vec4::new(
                    f32::from_bits(c[0].load(Ordering::Relaxed)),
                    f32::from_bits(c[1].load(Ordering::Relaxed)),
                    f32::from_bits(c[2].load(Ordering::Relaxed)),
                    1.0,
                )
            })
            .collect();
        HdrImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Linear HDR image, row-major from the top-left, alpha fixed at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl HdrImage {
    /// Black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::new(0.0, 0.0, 0.0, 1.0); width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Pixels as a flat `f32` RGBA slice.
    pub fn as_f32_slice(&self) -> &[f32] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Float image for HDR encoders (OpenEXR).
    pub fn to_image(&self) -> Option<Rgba32FImage> {
        Rgba32FImage::from_raw(self.width, self.height, self.as_f32_slice().to_vec())
    }
}
