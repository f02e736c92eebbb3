//! Asset loading/parsers (OBJ geometry, MTL materials, textures).
//! Geometry comes out as flat, non-indexed attribute arrays grouped by
//! object/group/material, ready for upload.

pub mod mesh;
pub mod model;
pub mod mtl;
pub mod normals;
pub mod obj;
pub mod texture;

pub use corelib::{ParseError, ParseResult};
pub use mesh::{AttributeBuffer, Geometry, GeometryData, ScalarType, VertexAttribute};
pub use model::{DirSource, ImageSource, ModelAsset, ModelOptions, TextSource, load_model};
pub use mtl::{MaterialLibrary, resolve_material_textures};
pub use normals::compute_flat_normals;
pub use obj::{ObjDocument, parse_geometry};
