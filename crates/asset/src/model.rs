//! Whole-model loading: OBJ geometry, its MTL textures and decoded images.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
    mesh::Geometry,
    mtl::{MaterialLibrary, distinct_names, textures_in_usage_order},
    normals::compute_flat_normals,
    obj::parse_geometry,
    texture::TextureData,
};

/// Size of the checkerboard used when a texture cannot be decoded.
const PLACEHOLDER_SIZE: u32 = 64;

/// Fetches a named text document (OBJ, MTL).
pub trait TextSource {
    fn read_text(&self, name: &str) -> Result<String>;
}

/// Decodes a named image into pixels.
pub trait ImageSource {
    fn load_image(&self, name: &str) -> Result<TextureData>;
}

/// Resolves names relative to a model directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TextSource for DirSource {
    fn read_text(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

impl ImageSource for DirSource {
    fn load_image(&self, name: &str) -> Result<TextureData> {
        TextureData::load(self.root.join(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    /// Fill in flat normals for geometries that have none.
    pub generate_normals: bool,
    /// Decode every referenced texture.
    pub load_textures: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            generate_normals: true,
            load_textures: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelAsset {
    pub geometries: Vec<Geometry>,
    pub material_libs: Vec<String>,
    /// Diffuse texture per `usemtl`, in usage order with duplicates.
    pub texture_usage: Vec<String>,
    /// Distinct texture names in first-use order.
    pub texture_names: Vec<String>,
    pub textures: HashMap<String, TextureData>,
}

impl ModelAsset {
    pub fn texture(&self, name: &str) -> Option<&TextureData> {
        self.textures.get(name)
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(|g| g.data.triangle_count()).sum()
    }
}

/// Load a model from `obj_name`. When `mtl_name` is `None` the first
/// `mtllib` reference of the OBJ is used, if any.
pub fn load_model<S>(
    source: &S,
    obj_name: &str,
    mtl_name: Option<&str>,
    options: ModelOptions,
) -> Result<ModelAsset>
where
    S: TextSource + ImageSource + ?Sized,
{
    log::info!("Loading model '{}'", obj_name);
    let obj_text = source.read_text(obj_name)?;
    let document =
        parse_geometry(&obj_text).with_context(|| format!("Failed to parse OBJ '{}'", obj_name))?;

    let mut geometries = document.geometries;
    if options.generate_normals {
        for geometry in geometries.iter_mut() {
            fill_flat_normals(geometry)
                .with_context(|| format!("Failed to compute normals in '{}'", obj_name))?;
        }
    }

    let mtl_name = mtl_name.or_else(|| document.material_libs.first().map(String::as_str));
    let texture_usage = match mtl_name {
        Some(name) => {
            let library = MaterialLibrary::parse(&source.read_text(name)?);
            if library.is_empty() {
                log::warn!("Material library '{}' declares no diffuse maps", name);
            } else {
                log::debug!("'{}' declares {} diffuse maps", name, library.len());
            }
            textures_in_usage_order(&document.materials, &library)
        }
        None => {
            log::debug!("'{}' has no material library", obj_name);
            Vec::new()
        }
    };
    let texture_names = distinct_names(&texture_usage);

    let mut textures = HashMap::new();
    if options.load_textures {
        for name in &texture_names {
            let texture = source.load_image(name).unwrap_or_else(|err| {
                log::warn!("Texture '{}' unavailable, using placeholder: {:#}", name, err);
                TextureData::create_test_texture(PLACEHOLDER_SIZE)
            });
            textures.insert(name.clone(), texture);
        }
    }

    let model = ModelAsset {
        geometries,
        material_libs: document.material_libs,
        texture_usage,
        texture_names,
        textures,
    };
    log::info!(
        "Loaded '{}': {} geometries, {} triangles, {} textures",
        obj_name,
        model.geometries.len(),
        model.triangle_count(),
        model.texture_names.len()
    );
    Ok(model)
}

fn fill_flat_normals(geometry: &mut Geometry) -> corelib::ParseResult<()> {
    let data = &mut geometry.data;
    if data.normal.is_none() {
        if let Some(position) = &data.position {
            data.normal = Some(compute_flat_normals(position)?);
        }
    }
    Ok(())
}
