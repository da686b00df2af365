//! JSON scene description.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solis_render::{
    BvhConfig, Camera, Environment, Material, Primitive, RenderConfig, Scene, SceneError,
};
use std::fs;
use std::path::Path;

/// Everything needed to render one image. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub render: RenderConfig,
    pub camera: Camera,
    pub bvh: BvhConfig,
    pub environment: Environment,
    pub materials: Vec<Material>,
    pub primitives: Vec<Primitive>,
}

impl SceneFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file {}", path.display()))?;
        let file = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scene file {}", path.display()))?;
        Ok(file)
    }

    /// Build the render scene, returning it with the camera and settings.
    pub fn into_scene(self) -> Result<(Scene, Camera, RenderConfig), SceneError> {
        let scene = Scene::new(self.primitives, self.materials, self.environment, self.bvh)?;
        Ok((scene, self.camera, self.render))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solis_render::{BranchingFactor, MaterialKind};

    const SCENE: &str = r#"{
        "render": { "width": 64, "height": 48, "samples_per_pixel": 2 },
        "camera": { "look_from": [0, 1, 5], "look_at": [0, 0, 0], "vfov": 35 },
        "bvh": { "branching": "eight", "split": "median" },
        "environment": { "sky": { "horizon": [1, 1, 1], "zenith": [0.5, 0.7, 1.0] } },
        "materials": [
            { "kind": "matte", "color": [0.8, 0.8, 0.8] },
            { "kind": { "glossy": { "roughness": 0.2 } }, "color": [0.9, 0.6, 0.3] },
            { "color": [0, 0, 0], "emissive": [10, 10, 10] }
        ],
        "primitives": [
            { "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": 1 },
            { "type": "quad", "q": [-5, -1, -5], "u": [10, 0, 0], "v": [0, 0, 10], "material": 0 },
            {
                "type": "triangle",
                "v0": [-1, 3, 0], "v1": [1, 3, 0], "v2": [0, 3, 1],
                "material": 2
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_scene() {
        let file: SceneFile = serde_json::from_str(SCENE).unwrap();
        assert_eq!(file.render.width, 64);
        assert_eq!(file.render.sub_samples, RenderConfig::default().sub_samples);
        assert_eq!(file.camera.vfov, 35.0);
        assert_eq!(file.bvh.branching, BranchingFactor::Eight);
        assert_eq!(file.materials[1].kind, MaterialKind::Glossy { roughness: 0.2 });
        assert_eq!(file.primitives.len(), 3);

        let (scene, _, config) = file.into_scene().unwrap();
        assert_eq!(scene.primitives().len(), 3);
        assert_eq!(config.samples_per_pixel, 2);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file: SceneFile = serde_json::from_str("{}").unwrap();
        let (scene, _, _) = file.into_scene().unwrap();
        assert!(scene.primitives().is_empty());
    }

    #[test]
    fn test_bad_material_handle() {
        let file: SceneFile = serde_json::from_str(
            r#"{ "primitives": [
                { "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": 3 }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(file.into_scene(), Err(SceneError::UnknownMaterial { .. })));
    }
}
