//! `solis`: render a JSON scene (or the built-in Cornell box) to an image.

mod demo;
mod scene_file;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scene_file::SceneFile;
use solis_render::{tone_map, CancelToken, HdrImage, RenderConfig, Renderer, ToneMapOperator};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Offline Monte Carlo path tracer")]
struct Args {
    /// JSON scene description. Renders a Cornell box when omitted
    scene: Option<PathBuf>,

    /// Tone-mapped output image (PNG)
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Linear HDR output image (OpenEXR)
    #[arg(long)]
    hdr_output: Option<PathBuf>,

    /// Image width, overriding the scene file
    #[arg(long)]
    width: Option<u32>,

    /// Image height, overriding the scene file
    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel stratum
    #[arg(long)]
    spp: Option<u32>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Stop rendering after this many minutes
    #[arg(long)]
    budget_minutes: Option<f64>,

    #[arg(long, value_enum)]
    tone_map: Option<ToneMap>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write a preview of the output image every time the watchdog wakes
    #[arg(long)]
    preview: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToneMap {
    Reinhard,
    Filmic,
}

impl From<ToneMap> for ToneMapOperator {
    fn from(t: ToneMap) -> Self {
        match t {
            ToneMap::Reinhard => ToneMapOperator::Reinhard,
            ToneMap::Filmic => ToneMapOperator::Filmic,
        }
    }
}

impl Args {
    fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(spp) = self.spp {
            config.samples_per_pixel = spp;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.budget_minutes.is_some() {
            config.wall_clock_budget_minutes = self.budget_minutes;
        }
        if let Some(tone_map) = self.tone_map {
            config.tone_map = tone_map.into();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let file = match &args.scene {
        Some(path) => SceneFile::load(path)?,
        None => {
            log::info!("No scene file given, rendering the Cornell box");
            demo::cornell_box()
        }
    };

    let (scene, camera, mut config) = file.into_scene().context("Failed to build scene")?;
    args.apply(&mut config);

    let renderer = Renderer::new(config.clone());
    let cancel = CancelToken::new();
    let output = if args.preview {
        renderer.render_with_preview(&scene, &camera, &cancel, |image| {
            if let Err(e) = save_png(image, config.tone_map, &args.output) {
                log::warn!("Failed to write preview: {e:#}");
            }
        })?
    } else {
        renderer.render(&scene, &camera, &cancel)?
    };

    if output.cancelled {
        log::warn!("Render stopped early; saving the partial image");
    }

    save_png(&output.image, config.tone_map, &args.output)?;
    log::info!("Wrote {}", args.output.display());

    if let Some(path) = &args.hdr_output {
        save_exr(&output.image, path)?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

fn save_png(image: &HdrImage, operator: ToneMapOperator, path: &Path) -> Result<()> {
    let display = tone_map(operator, image.width, image.height, &image.pixels);
    let rgba = display
        .to_image()
        .context("Tone-mapped image has the wrong size")?;
    rgba.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn save_exr(image: &HdrImage, path: &Path) -> Result<()> {
    let rgba = image.to_image().context("HDR image has the wrong size")?;
    image::DynamicImage::ImageRgba32F(rgba)
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_scene_settings() {
        let args = Args::parse_from([
            "solis",
            "scene.json",
            "--width",
            "320",
            "--spp",
            "8",
            "--tone-map",
            "filmic",
            "--budget-minutes",
            "1.5",
        ]);
        let mut config = RenderConfig::default();
        args.apply(&mut config);

        assert_eq!(args.scene, Some(PathBuf::from("scene.json")));
        assert_eq!(config.width, 320);
        assert_eq!(config.height, RenderConfig::default().height);
        assert_eq!(config.samples_per_pixel, 8);
        assert_eq!(config.tone_map, ToneMapOperator::Filmic);
        assert_eq!(config.wall_clock_budget_minutes, Some(1.5));
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["solis"]);
        assert!(args.scene.is_none());
        assert_eq!(args.output, PathBuf::from("render.png"));
        assert!(!args.preview);
    }
}
