//! MTL diffuse-map lookup and per-usage texture resolution.

use std::collections::{HashMap, HashSet};

use crate::obj::{split_keyword, text_lines};

/// Material name to diffuse texture filename, built from MTL text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialLibrary {
    diffuse_maps: HashMap<String, String>,
}

impl MaterialLibrary {
    /// Collect `map_Kd` entries under their enclosing `newmtl`.
    /// A later `map_Kd` for the same material replaces the earlier one;
    /// entries before the first `newmtl` are ignored.
    pub fn parse(text: &str) -> Self {
        let mut diffuse_maps = HashMap::new();
        let mut current: Option<&str> = None;

        for line in text_lines(text) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (keyword, args) = split_keyword(trimmed);
            match keyword {
                "newmtl" => current = (!args.is_empty()).then_some(args),
                // Options like `-s 1 1 1` may precede the filename.
                "map_Kd" => {
                    if let (Some(material), Some(file)) = (current, args.split_whitespace().last()) {
                        diffuse_maps.insert(material.to_owned(), file.to_owned());
                    }
                }
                _ => {}
            }
        }

        Self { diffuse_maps }
    }

    pub fn diffuse_map(&self, material: &str) -> Option<&str> {
        self.diffuse_maps.get(material).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.diffuse_maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffuse_maps.is_empty()
    }
}

/// Material names of every `usemtl` directive, in order, duplicates kept.
/// A name is the whole remainder of its line, as `parse_geometry` records it.
pub fn face_material_sequence(obj_text: &str) -> Vec<String> {
    text_lines(obj_text)
        .filter_map(|line| {
            let (keyword, args) = split_keyword(line.trim());
            (keyword == "usemtl").then(|| args.to_owned())
        })
        .collect()
}

/// Texture filenames in `usemtl` order. Materials without a diffuse map
/// contribute nothing; duplicates are preserved.
pub fn resolve_material_textures(obj_text: &str, mtl_text: &str) -> Vec<String> {
    let library = MaterialLibrary::parse(mtl_text);
    textures_in_usage_order(&face_material_sequence(obj_text), &library)
}

pub fn textures_in_usage_order(materials: &[String], library: &MaterialLibrary) -> Vec<String> {
    materials
        .iter()
        .filter_map(|material| library.diffuse_map(material))
        .map(str::to_owned)
        .collect()
}

/// Drop repeated names, keeping first-use order.
pub fn distinct_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}
