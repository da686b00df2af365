//! Tone mapping from linear HDR radiance to displayable `[0, 1]` color.

use crate::material::Color;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use solis_math::{Vec3, Vec4};

/// Rec. 709 luminance weights.
const LUMINANCE: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Offset keeping the log-average finite on black pixels.
const LOG_DELTA: f64 = 1e-4;

/// Reinhard key value.
const KEY: f32 = 0.18;

const GAMMA: f32 = 1.0 / 2.2;

/// Operator used to compress HDR radiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapOperator {
    /// Global Reinhard operator with white point, keyed on the log-average
    /// luminance of the image.
    #[default]
    Reinhard,
    /// Uncharted 2 filmic curve.
    Filmic,
}

/// Tone-mapped RGBA image, every channel in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl DisplayImage {
    /// 8-bit RGBA bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            bytes.extend(p.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8));
        }
        bytes
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.to_rgba8())
    }
}

/// Relative luminance of a linear color.
#[inline]
pub fn luminance(color: Color) -> f32 {
    color.dot(LUMINANCE)
}

/// Tone map `pixels` (linear RGBA, row-major) with `operator`.
///
/// Pure and deterministic: the same input always maps to the same output.
pub fn tone_map(
    operator: ToneMapOperator,
    width: u32,
    height: u32,
    pixels: &[Vec4],
) -> DisplayImage {
    let mapped = match operator {
        ToneMapOperator::Reinhard => reinhard(pixels),
        ToneMapOperator::Filmic => pixels.iter().map(|p| filmic(p.truncate())).collect(),
    };

    DisplayImage {
        width,
        height,
        pixels: mapped
            .into_iter()
            .map(|c: Color| gamma(c).extend(1.0))
            .collect(),
    }
}

fn reinhard(pixels: &[Vec4]) -> Vec<Color> {
    if pixels.is_empty() {
        return Vec::new();
    }

    // Sequential f64 reductions keep the result independent of scheduling
    let mut log_sum = 0.0f64;
    let mut y_max = 0.0f32;
    for p in pixels {
        let y = luminance(p.truncate()).max(0.0);
        log_sum += (LOG_DELTA + y as f64).ln();
        y_max = y_max.max(y);
    }
    let log_average = (log_sum / pixels.len() as f64).exp() as f32;

    if !(y_max > 0.0) {
        return vec![Color::ZERO; pixels.len()];
    }

    let scale = KEY / log_average;
    let white = scale * y_max;
    let white_sq = white * white;

    pixels
        .iter()
        .map(|p| {
            let color = p.truncate().max(Color::ZERO);
            let y = luminance(color);
            if !(y > 0.0) {
                return Color::ZERO;
            }
            let l = scale * y;
            let ld = l * (1.0 + l / white_sq) / (1.0 + l);
            color * (ld / y)
        })
        .collect()
}

/// Uncharted 2 curve, normalized by the linear white point 11.2.
fn filmic(color: Color) -> Color {
    fn curve(x: Color) -> Color {
        const A: f32 = 0.15;
        const B: f32 = 0.50;
        const C: f32 = 0.10;
        const D: f32 = 0.20;
        const E: f32 = 0.02;
        const F: f32 = 0.30;
        ((x * (A * x + C * B) + D * E) / (x * (A * x + B) + D * F)) - E / F
    }

    curve(2.0 * color.max(Color::ZERO)) / curve(Color::splat(11.2))
}

fn gamma(color: Color) -> Color {
    let c = color.clamp(Color::ZERO, Color::ONE);
    Color::new(c.x.powf(GAMMA), c.y.powf(GAMMA), c.z.powf(GAMMA))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_hdr(seed: u64, len: usize) -> Vec<Vec4> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| {
                Vec4::new(
                    rng.gen_range(0.0..20.0),
                    rng.gen_range(0.0..5.0),
                    rng.gen_range(0.0..1.0),
                    1.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_tone_map_is_deterministic() {
        let pixels = random_hdr(1, 64 * 64);
        for operator in [ToneMapOperator::Reinhard, ToneMapOperator::Filmic] {
            let a = tone_map(operator, 64, 64, &pixels);
            let b = tone_map(operator, 64, 64, &pixels);
            assert_eq!(a, b);
            assert_eq!(a.to_rgba8(), b.to_rgba8());
        }
    }

    #[test]
    fn test_output_in_unit_range() {
        let pixels = random_hdr(2, 1000);
        for operator in [ToneMapOperator::Reinhard, ToneMapOperator::Filmic] {
            let image = tone_map(operator, 1000, 1, &pixels);
            for p in &image.pixels {
                assert!(p.min_element() >= 0.0 && p.max_element() <= 1.0);
                assert_eq!(p.w, 1.0);
            }
        }
    }

    #[test]
    fn test_black_stays_black() {
        let pixels = vec![Vec4::new(0.0, 0.0, 0.0, 1.0); 16];
        let image = tone_map(ToneMapOperator::Reinhard, 4, 4, &pixels);
        assert!(image.pixels.iter().all(|p| p.truncate() == Vec3::ZERO));

        let image = tone_map(ToneMapOperator::Filmic, 4, 4, &pixels);
        assert!(image.to_rgba8().chunks(4).all(|p| p[..3] == [0, 0, 0]));
    }

    #[test]
    fn test_reinhard_brightest_pixel_maps_to_white() {
        // Ld(L_white) = 1 for a gray pixel
        let pixels = vec![Vec4::new(0.1, 0.1, 0.1, 1.0), Vec4::new(8.0, 8.0, 8.0, 1.0)];
        let image = tone_map(ToneMapOperator::Reinhard, 2, 1, &pixels);
        assert!((image.pixels[1].x - 1.0).abs() < 1e-4);
        assert!(image.pixels[0].x < image.pixels[1].x);
    }

    #[test]
    fn test_filmic_monotonic() {
        let low = filmic(Color::splat(0.2));
        let high = filmic(Color::splat(2.0));
        assert!(low.x < high.x);
        assert!(filmic(Color::ZERO).x.abs() < 1e-6);
    }

    #[test]
    fn test_display_image_to_rgba8() {
        let image = DisplayImage {
            width: 1,
            height: 1,
            pixels: vec![Vec4::new(1.0, 0.0, 0.5, 1.0)],
        };
        assert_eq!(image.to_rgba8(), vec![255, 0, 128, 255]);
        assert_eq!(image.to_image().unwrap().get_pixel(0, 0).0, [255, 0, 128, 255]);
    }

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!((luminance(Color::ONE) - 1.0).abs() < 1e-6);
    }
}
