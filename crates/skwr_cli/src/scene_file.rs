//! JSON scene descriptions.
//!
//! Materials and media are declared by name and referenced by primitives.
//! Media get their ids in name order, so a given file always maps to the
//! same medium ids.

use serde::{Deserialize, Serialize};
use skwr_math::{Aabb, Spectrum, Vec3};
use skwr_renderer::{
    GridMedium, HomogeneousMedium, Material, MediumError, MediumInterface, MediumStack,
    MediumType, Scene, Sphere, Triangle,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::camera::CameraDescription;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read scene {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scene: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("Unknown medium '{0}'")]
    UnknownMedium(String),

    #[error("Too many {0:?} media for a medium id")]
    MediumOverflow(MediumType),

    #[error("Invalid medium '{name}': {source}")]
    InvalidMedium {
        name: String,
        #[source]
        source: MediumError,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialDescription {
    Lambertian { albedo: [f32; 3] },
    Metal {
        albedo: [f32; 3],
        #[serde(default)]
        roughness: f32,
    },
    Dielectric { ior: f32 },
}

impl MaterialDescription {
    fn build(&self) -> Material {
        match *self {
            MaterialDescription::Lambertian { albedo } => Material::lambertian(Spectrum::from(albedo)),
            MaterialDescription::Metal { albedo, roughness } => {
                Material::metal(Spectrum::from(albedo), roughness)
            }
            MaterialDescription::Dielectric { ior } => Material::dielectric(ior),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediumDescription {
    Homogeneous {
        sigma_a: [f32; 3],
        sigma_s: [f32; 3],
        #[serde(default)]
        g: f32,
    },
    Grid {
        min: [f32; 3],
        max: [f32; 3],
        resolution: [usize; 3],
        /// x-fastest voxel densities
        density: Vec<f32>,
        sigma_a: [f32; 3],
        sigma_s: [f32; 3],
        #[serde(default)]
        g: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimitiveDescription {
    Sphere {
        center: [f32; 3],
        radius: f32,
        material: String,
        #[serde(default)]
        inside: Option<String>,
        #[serde(default)]
        outside: Option<String>,
    },
    Triangle {
        vertices: [[f32; 3]; 3],
        material: String,
        #[serde(default)]
        inside: Option<String>,
        #[serde(default)]
        outside: Option<String>,
    },
}

fn default_background() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub camera: CameraDescription,
    /// Radiance of rays that leave the scene
    #[serde(default = "default_background")]
    pub background: [f32; 3],
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDescription>,
    #[serde(default)]
    pub media: BTreeMap<String, MediumDescription>,
    #[serde(default)]
    pub primitives: Vec<PrimitiveDescription>,
}

/// A scene ready to render, plus what the session needs around it.
pub struct LoadedScene {
    pub scene: Scene,
    pub camera: CameraDescription,
    pub background: Spectrum,
}

impl SceneDescription {
    pub fn from_json(text: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Build the in-memory scene.
    pub fn build(&self) -> SceneResult<LoadedScene> {
        let mut scene = Scene::new();

        let mut media: BTreeMap<&str, MediumStack> = BTreeMap::new();
        for (name, description) in &self.media {
            let id = add_medium(&mut scene, name, description)?;
            media.insert(name.as_str(), id);
        }
        let lookup_medium = |name: &Option<String>| -> SceneResult<MediumStack> {
            match name {
                None => Ok(MediumStack::VACUUM),
                Some(name) => media
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| SceneError::UnknownMedium(name.clone())),
            }
        };
        let interface = |inside: &Option<String>,
                         outside: &Option<String>|
         -> SceneResult<Option<MediumInterface>> {
            if inside.is_none() && outside.is_none() {
                return Ok(None);
            }
            Ok(Some(MediumInterface::new(
                lookup_medium(inside)?,
                lookup_medium(outside)?,
            )))
        };
        let material = |name: &str| {
            self.materials
                .get(name)
                .map(MaterialDescription::build)
                .ok_or_else(|| SceneError::UnknownMaterial(name.to_string()))
        };

        for primitive in &self.primitives {
            match primitive {
                PrimitiveDescription::Sphere {
                    center,
                    radius,
                    material: name,
                    inside,
                    outside,
                } => {
                    let mut sphere = Sphere::new(Vec3::from(*center), *radius, material(name)?);
                    if let Some(mi) = interface(inside, outside)? {
                        sphere = sphere.with_medium_interface(mi);
                    }
                    scene.add(sphere);
                }
                PrimitiveDescription::Triangle {
                    vertices,
                    material: name,
                    inside,
                    outside,
                } => {
                    let [a, b, c] = (*vertices).map(Vec3::from);
                    let mut triangle = Triangle::new(a, b, c, material(name)?);
                    if triangle.is_degenerate() {
                        log::warn!("Skipping degenerate triangle {:?}", vertices);
                        continue;
                    }
                    if let Some(mi) = interface(inside, outside)? {
                        triangle = triangle.with_medium_interface(mi);
                    }
                    scene.add(triangle);
                }
            }
        }

        let camera_medium = lookup_medium(&self.camera.medium)?;
        scene.set_camera_medium(camera_medium);

        log::info!(
            "Loaded scene: {} primitives, {} materials, {} media",
            scene.aggregate().len(),
            self.materials.len(),
            scene.media().len()
        );

        Ok(LoadedScene {
            scene,
            camera: self.camera.clone(),
            background: Spectrum::from(self.background),
        })
    }
}

fn add_medium(scene: &mut Scene, name: &str, description: &MediumDescription) -> SceneResult<MediumStack> {
    match description {
        MediumDescription::Homogeneous { sigma_a, sigma_s, g } => {
            if !scene.media().has_room(MediumType::Homogeneous) {
                return Err(SceneError::MediumOverflow(MediumType::Homogeneous));
            }
            let medium = HomogeneousMedium::new(Spectrum::from(*sigma_a), Spectrum::from(*sigma_s), *g);
            Ok(scene.add_homogeneous_medium(medium))
        }
        MediumDescription::Grid {
            min,
            max,
            resolution,
            density,
            sigma_a,
            sigma_s,
            g,
        } => {
            if !scene.media().has_room(MediumType::Grid) {
                return Err(SceneError::MediumOverflow(MediumType::Grid));
            }
            let medium = GridMedium::new(
                Aabb::from_points(Vec3::from(*min), Vec3::from(*max)),
                *resolution,
                density.clone(),
                Spectrum::from(*sigma_a),
                Spectrum::from(*sigma_s),
                *g,
            )
            .map_err(|source| SceneError::InvalidMedium {
                name: name.to_string(),
                source,
            })?;
            Ok(scene.add_grid_medium(medium))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skwr_renderer::Ray;

    const SCENE: &str = r#"{
        "camera": { "look_from": [0, 0, 0], "look_at": [0, 0, -1], "vfov": 45, "medium": "fog" },
        "background": [0.5, 0.6, 0.7],
        "materials": {
            "grey": { "type": "lambertian", "albedo": [0.5, 0.5, 0.5] },
            "glass": { "type": "dielectric", "ior": 1.5 },
            "mirror": { "type": "metal", "albedo": [0.9, 0.9, 0.9] }
        },
        "media": {
            "fog": { "type": "homogeneous", "sigma_a": [0.01, 0.01, 0.01], "sigma_s": [0.05, 0.05, 0.05] },
            "smoke": {
                "type": "grid", "min": [-1, -1, -6], "max": [1, 1, -4], "resolution": [1, 1, 2],
                "density": [0.5, 1.0], "sigma_a": [0, 0, 0], "sigma_s": [2, 2, 2], "g": 0.2
            }
        },
        "primitives": [
            { "type": "sphere", "center": [0, 0, -5], "radius": 1, "material": "glass", "inside": "smoke", "outside": "fog" },
            { "type": "triangle", "vertices": [[-5, -1, 0], [5, -1, 0], [0, -1, -10]], "material": "grey" },
            { "type": "triangle", "vertices": [[0, 0, 0], [1, 0, 0], [2, 0, 0]], "material": "mirror" }
        ]
    }"#;

    #[test]
    fn test_build_full_scene() {
        let loaded = SceneDescription::from_json(SCENE).unwrap().build().unwrap();
        let scene = &loaded.scene;

        // Degenerate triangle dropped
        assert_eq!(scene.aggregate().len(), 2);
        assert_eq!(scene.media().len(), 2);
        assert_eq!(loaded.background, Spectrum::new(0.5, 0.6, 0.7));

        // Media ids follow name order: fog, smoke
        let fog = scene.camera_medium();
        assert_eq!(fog.medium_type(), Some(MediumType::Homogeneous));
        assert_eq!(fog.index(), 0);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let si = scene.intersect(&ray, 0.001, f32::INFINITY).unwrap();
        assert!((si.t - 4.0).abs() < 1e-4);
        let inside = si.medium_for(ray.direction(), fog);
        assert_eq!(inside.medium_type(), Some(MediumType::Grid));
        assert_eq!(inside.index(), 0);
    }

    #[test]
    fn test_unknown_material_is_error() {
        let json = r#"{ "primitives": [ { "type": "sphere", "center": [0,0,0], "radius": 1, "material": "nope" } ] }"#;
        let err = SceneDescription::from_json(json).unwrap().build().err().unwrap();
        assert!(matches!(err, SceneError::UnknownMaterial(name) if name == "nope"));
    }

    #[test]
    fn test_unknown_medium_is_error() {
        let json = r#"{
            "materials": { "m": { "type": "dielectric", "ior": 1.3 } },
            "primitives": [ { "type": "sphere", "center": [0,0,0], "radius": 1, "material": "m", "inside": "water" } ]
        }"#;
        let err = SceneDescription::from_json(json).unwrap().build().err().unwrap();
        assert!(matches!(err, SceneError::UnknownMedium(name) if name == "water"));
    }

    #[test]
    fn test_bad_grid_is_reported_by_name() {
        let json = r#"{ "media": { "puff": {
            "type": "grid", "min": [0,0,0], "max": [1,1,1], "resolution": [2,2,2],
            "density": [1.0], "sigma_a": [0,0,0], "sigma_s": [1,1,1]
        } } }"#;
        let err = SceneDescription::from_json(json).unwrap().build().err().unwrap();
        assert!(err.to_string().contains("puff"));
    }

    #[test]
    fn test_defaults() {
        let description = SceneDescription::from_json("{}").unwrap();
        assert_eq!(description.background, [1.0, 1.0, 1.0]);
        let loaded = description.build().unwrap();
        assert!(loaded.scene.aggregate().is_empty());
        assert!(loaded.scene.camera_medium().is_vacuum());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SceneDescription::from_json("{ \"primitives\": 3 }"),
            Err(SceneError::Parse(_))
        ));
    }
}
