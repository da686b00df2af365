//! Parallel bucket renderer.
//!
//! Buckets are rendered in parallel with rayon, each with its own random
//! stream, into a shared [`Accumulator`]. A watchdog thread runs alongside
//! the workers: it hands out preview snapshots at a fixed interval and
//! cancels the render once the wall-clock budget is spent.

use crate::accumulator::{Accumulator, CancelToken, HdrImage};
use crate::bucket::{generate_buckets, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::scene::Scene;
use crate::tonemap::ToneMapOperator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Samples drawn in each stratum of a pixel
    pub samples_per_pixel: u32,
    /// Strata per pixel side; a pixel has `sub_samples²` strata
    pub sub_samples: u32,
    /// Bounces before Russian roulette starts halving the continuation
    /// probability
    pub max_bounce_depth: u32,
    pub tone_map: ToneMapOperator,
    /// Cancel the render after this many minutes
    pub wall_clock_budget_minutes: Option<f64>,
    /// Seconds between preview snapshots
    pub preview_interval_secs: f64,
    /// Bucket side in pixels
    pub bucket_size: u32,
    /// Worker threads; the global rayon pool when unset
    pub threads: Option<usize>,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            samples_per_pixel: 4,
            sub_samples: 2,
            max_bounce_depth: 5,
            tone_map: ToneMapOperator::default(),
            wall_clock_budget_minutes: None,
            preview_interval_secs: 10.0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            threads: None,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Check the settings a render cannot start without.
    pub fn validate(&self) -> Result<(), RenderError> {
        let invalid = |msg: &str| Err(RenderError::InvalidConfig(msg.to_string()));

        if self.width == 0 || self.height == 0 {
            return invalid("image width and height must be non-zero");
        }
        if self.samples_per_pixel == 0 || self.sub_samples == 0 {
            return invalid("samples_per_pixel and sub_samples must be non-zero");
        }
        let total = self
            .sub_samples
            .checked_mul(self.sub_samples)
            .and_then(|strata| strata.checked_mul(self.samples_per_pixel));
        if total.is_none() {
            return invalid("sub_samples² × samples_per_pixel does not fit in a u32");
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size must be non-zero");
        }
        if self.threads == Some(0) {
            return invalid("threads must be non-zero when set");
        }
        if !(self.preview_interval_secs > 0.0 && self.preview_interval_secs.is_finite()) {
            return invalid("preview_interval_secs must be a positive number");
        }
        if let Some(minutes) = self.wall_clock_budget_minutes {
            if !(minutes > 0.0 && minutes.is_finite()) {
                return invalid("wall_clock_budget_minutes must be a positive number");
            }
        }
        Ok(())
    }

    /// Samples traced per pixel by a complete render. Saturates on
    /// configurations that [`RenderConfig::validate`] rejects.
    pub fn samples_per_pixel_total(&self) -> u32 {
        self.sub_samples
            .saturating_mul(self.sub_samples)
            .saturating_mul(self.samples_per_pixel)
    }
}

/// Errors raised before a render starts.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of a render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Linear radiance; pixels not reached before a cancellation stay black
    pub image: HdrImage,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub samples_traced: u64,
}

/// Renders scenes with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `scene` as seen by `camera` at the configured resolution.
    pub fn render(
        &self,
        scene: &Scene,
        camera: &Camera,
        cancel: &CancelToken,
    ) -> Result<RenderOutput, RenderError> {
        self.render_with_preview(scene, camera, cancel, |_| {})
    }

    /// Like [`Renderer::render`], calling `on_preview` from the watchdog
    /// thread with a snapshot every `preview_interval_secs`.
    pub fn render_with_preview<F>(
        &self,
        scene: &Scene,
        camera: &Camera,
        cancel: &CancelToken,
        mut on_preview: F,
    ) -> Result<RenderOutput, RenderError>
    where
        F: FnMut(&HdrImage) + Send,
    {
        let config = &self.config;
        config.validate()?;

        let pool = match config.threads {
            Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };

        let mut camera = camera.clone().with_resolution(config.width, config.height);
        camera.initialize();

        let accumulator = Accumulator::new(config.width, config.height);
        let buckets = generate_buckets(config.width, config.height, config.bucket_size);
        let traced = AtomicU64::new(0);
        let watch = Watch {
            budget: config
                .wall_clock_budget_minutes
                .map(|minutes| Duration::from_secs_f64(minutes * 60.0)),
            interval: Duration::from_secs_f64(config.preview_interval_secs),
            start: Instant::now(),
        };

        log::info!(
            "Rendering {}x{}, {} spp, {} buckets, {} threads",
            config.width,
            config.height,
            config.samples_per_pixel_total(),
            buckets.len(),
            pool.as_ref()
                .map_or_else(rayon::current_num_threads, |p| p.current_num_threads()),
        );

        let (done_tx, done_rx) = mpsc::channel::<()>();
        thread::scope(|s| {
            let accumulator = &accumulator;
            s.spawn(move || watch.run(done_rx, accumulator, cancel, &mut on_preview));

            let work = || {
                buckets.par_iter().for_each(|bucket| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let samples = bucket.render(scene, &camera, config, accumulator, cancel);
                    traced.fetch_add(samples, Ordering::Relaxed);
                    log::trace!("Bucket {} done ({} samples)", bucket.index, samples);
                });
            };
            match &pool {
                Some(pool) => pool.install(work),
                None => work(),
            }

            // Wakes the watchdog
            drop(done_tx);
        });

        let output = RenderOutput {
            image: accumulator.snapshot(),
            cancelled: cancel.is_cancelled(),
            elapsed: watch.start.elapsed(),
            samples_traced: traced.load(Ordering::Relaxed),
        };

        if output.cancelled {
            log::info!(
                "Render cancelled after {:.2?} ({} samples)",
                output.elapsed,
                output.samples_traced
            );
        } else {
            log::info!(
                "Render finished in {:.2?} ({} samples)",
                output.elapsed,
                output.samples_traced
            );
        }

        Ok(output)
    }
}

/// Watchdog timing.
#[derive(Debug, Clone, Copy)]
struct Watch {
    budget: Option<Duration>,
    interval: Duration,
    start: Instant,
}

impl Watch {
    /// Wake every `interval` (or at the budget deadline) until the workers
    /// drop their end of `done`.
    fn run<F>(
        self,
        done: Receiver<()>,
        accumulator: &Accumulator,
        cancel: &CancelToken,
        on_preview: &mut F,
    )
    where
        F: FnMut(&HdrImage),
    {
        loop {
            let mut timeout = self.interval;
            if let Some(budget) = self.budget {
                if !cancel.is_cancelled() {
                    timeout = timeout.min(budget.saturating_sub(self.start.elapsed()));
                }
            }

            match done.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if let Some(budget) = self.budget {
                if self.start.elapsed() >= budget && !cancel.is_cancelled() {
                    log::warn!("Wall-clock budget of {:.2?} spent, cancelling render", budget);
                    cancel.cancel();
                }
            }

            let snapshot = accumulator.snapshot();
            log::debug!("Preview at {:.2?}", self.start.elapsed());
            on_preview(&snapshot);
        }
    }
}
