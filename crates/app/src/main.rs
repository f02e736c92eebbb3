//! Entry point: load an OBJ model from a directory and report what it contains.

use anyhow::{Result, anyhow};
use asset::{DirSource, ModelOptions, load_model};

struct Args {
    model_dir: String,
    obj: String,
    mtl: Option<String>,
    options: ModelOptions,
}

fn parse_switch(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_args() -> Result<Args> {
    // Accept: --model-dir=<dir> --obj=<file> [--mtl=<file>] [--normals=on|off] [--textures=on|off]
    let mut model_dir = String::from(".");
    let mut obj: Option<String> = None;
    let mut mtl: Option<String> = None;
    let mut options = ModelOptions::default();

    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--model-dir=") {
            model_dir = val.to_owned();
        } else if let Some(val) = arg.strip_prefix("--obj=") {
            obj = Some(val.to_owned());
        } else if let Some(val) = arg.strip_prefix("--mtl=") {
            mtl = Some(val.to_owned());
        } else if let Some(val) = arg.strip_prefix("--normals=") {
            options.generate_normals = parse_switch(val).unwrap_or_else(|| {
                log::warn!("Unknown value '{}' for --normals, keeping on.", val);
                true
            });
        } else if let Some(val) = arg.strip_prefix("--textures=") {
            options.load_textures = parse_switch(val).unwrap_or_else(|| {
                log::warn!("Unknown value '{}' for --textures, keeping on.", val);
                true
            });
        } else {
            log::warn!("Ignoring unknown argument '{}'", arg);
        }
    }

    let obj = obj.ok_or_else(|| anyhow!("Missing required --obj=<file> argument"))?;
    Ok(Args {
        model_dir,
        obj,
        mtl,
        options,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    log::info!(
        "Inspecting '{}' in {} (normals={}, textures={})",
        args.obj,
        args.model_dir,
        args.options.generate_normals,
        args.options.load_textures
    );

    let source = DirSource::new(&args.model_dir);
    if !source.root().is_dir() {
        anyhow::bail!("Model directory {} does not exist", source.root().display());
    }
    let model = load_model(&source, &args.obj, args.mtl.as_deref(), args.options)?;

    for (i, geometry) in model.geometries.iter().enumerate() {
        let layout: Vec<String> = geometry
            .attribute_buffers()
            .iter()
            .map(|b| format!("{:?}x{} ({} bytes)", b.attribute, b.components, b.as_bytes().len()))
            .collect();
        log::info!(
            "#{} object='{}' groups={:?} material='{}' vertices={} [{}]",
            i,
            geometry.object,
            geometry.groups,
            geometry.material,
            geometry.data.vertex_count(),
            layout.join(", ")
        );
    }

    for name in &model.texture_names {
        if let Some(tex) = model.texture(name) {
            if tex.is_valid() {
                log::info!("texture '{}': {}x{}", name, tex.width, tex.height);
            } else {
                log::warn!("texture '{}' has inconsistent pixel data", name);
            }
        }
    }

    Ok(())
}
