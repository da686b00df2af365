//! Immutable render scene: primitive and material arenas plus their BVH.

use crate::bvh::{Bvh, BvhConfig, BvhError};
use crate::environment::Environment;
use crate::hittable::{HitRecord, Hittable, MaterialId, Primitive, PrimitiveId};
use crate::material::Material;
use solis_math::{Aabb, Ray};
use thiserror::Error;

/// Errors raised while assembling a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(
        "Primitive {primitive} uses material {material}, but the scene has only {count} materials"
    )]
    UnknownMaterial {
        primitive: PrimitiveId,
        material: MaterialId,
        count: usize,
    },

    #[error("BVH build failed: {0}")]
    Bvh(#[from] BvhError),
}

/// A scene ready for rendering.
///
/// Primitives refer to materials by index. Once built the scene is
/// read-only and shared by every render worker.
#[derive(Debug, Clone)]
pub struct Scene {
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
    environment: Environment,
    bvh: Bvh,
}

impl Scene {
    /// Validate material handles and build the acceleration structure.
    pub fn new(
        primitives: Vec<Primitive>,
        materials: Vec<Material>,
        environment: Environment,
        bvh_config: BvhConfig,
    ) -> Result<Self, SceneError> {
        for (i, primitive) in primitives.iter().enumerate() {
            let material = primitive.material();
            if material as usize >= materials.len() {
                return Err(SceneError::UnknownMaterial {
                    primitive: i as PrimitiveId,
                    material,
                    count: materials.len(),
                });
            }
        }

        let bvh = Bvh::build(&primitives, bvh_config)?;
        log::info!(
            "Scene ready: {} primitives, {} materials, environment {:?}",
            primitives.len(),
            materials.len(),
            environment
        );

        Ok(Self {
            primitives,
            materials,
            environment,
            bvh,
        })
    }

    /// Nearest hit along `ray`, if any.
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        let mut rec = HitRecord::new(ray);
        if self.bvh.hit(&self.primitives, ray, &mut rec) {
            Some(rec)
        } else {
            None
        }
    }

    /// Material by handle. Handles were validated when the scene was built.
    #[inline]
    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id as usize]
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn bounding_box(&self) -> Aabb {
        self.primitives
            .iter()
            .fold(Aabb::EMPTY, |acc, p| acc.merge(&p.bounding_box()))
    }
}
