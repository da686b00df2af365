//! Radiance arriving from outside the scene.

use crate::material::Color;
use serde::{Deserialize, Serialize};
use solis_math::Vec3;

/// What a ray sees when it leaves the scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// No light from outside; only emissive surfaces light the scene.
    #[default]
    Black,
    /// Uniform radiance in every direction.
    Constant(Color),
    /// Vertical gradient from `horizon` (straight down) to `zenith` (straight up).
    Sky { horizon: Color, zenith: Color },
}

impl Environment {
    /// Daylight gradient, white at the horizon and blue overhead.
    pub fn daylight() -> Self {
        Environment::Sky {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }

    /// Radiance arriving along `-direction`.
    pub fn radiance(&self, direction: Vec3) -> Color {
        match *self {
            Environment::Black => Color::ZERO,
            Environment::Constant(color) => color,
            Environment::Sky { horizon, zenith } => {
                let unit_direction = direction.normalize_or_zero();
                let a = 0.5 * (unit_direction.y + 1.0);
                horizon * (1.0 - a) + zenith * a
            }
        }
    }
}
