//! Solis - CPU Monte Carlo path tracing.
//!
//! Data flow: primitive/material arrays → [`Scene`] (builds the [`Bvh`]) →
//! per pixel, per sample camera ray → [`radiance`] → HDR accumulator →
//! [`tone_map`] → external encoder.
//!
//! The scene is immutable once built and shared read-only by every worker.
//! Rendering is data parallel over image buckets (rayon), cancellable through
//! a [`CancelToken`], and watched by a preview/budget thread.

mod accumulator;
mod bucket;
pub mod bvh;
mod camera;
mod environment;
mod hash_grid;
mod hittable;
mod integrator;
mod material;
mod quad;
mod renderer;
mod sampling;
mod scene;
mod sphere;
mod tonemap;
mod triangle;

pub use accumulator::{Accumulator, CancelToken, HdrImage};
pub use bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
pub use bvh::{BranchingFactor, Bvh, BvhConfig, BvhError, BvhStats, SplitMethod};
pub use camera::Camera;
pub use environment::Environment;
pub use hash_grid::{HashGrid, HitPoint};
pub use hittable::{brute_force_hit, HitRecord, Hittable, MaterialId, Primitive, PrimitiveId};
pub use integrator::{radiance, render_pixel, PathEnd, PathSample};
pub use material::{Color, Material, MaterialKind, ShadingArg};
pub use quad::Quad;
pub use renderer::{RenderConfig, RenderError, RenderOutput, Renderer};
pub use scene::{Scene, SceneError};
pub use sphere::Sphere;
pub use tonemap::{luminance, tone_map, DisplayImage, ToneMapOperator};
pub use triangle::Triangle;

/// Re-export Vec3 and common math types from solis_math
pub use solis_math::{Aabb, Interval, Ray, Vec2, Vec3, Vec4};
