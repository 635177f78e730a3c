//! Palette and prewarm command implementations

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use serde::Serialize;

use crate::codec::DisplayImage;
use crate::color::TargetColor;
use crate::output::{palette_output_path, write_encoded, OutputError};
use crate::palette::{PaletteCoordinator, SpriteKind, SpritePalette, SpriteSet};

use super::{parse_target, runtime, CliContext, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// JSON view of a built palette
#[derive(Debug, Serialize)]
struct PaletteReport {
    set: String,
    family: String,
    color: String,
    native: bool,
    sprites: BTreeMap<String, SpriteReport>,
}

#[derive(Debug, Serialize)]
struct SpriteReport {
    recolored: bool,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_url: Option<String>,
}

/// Write every sprite of `palette` into `dir`. Fallback sprites are copied
/// from their original file so the directory is always complete.
fn write_palette(palette: &SpritePalette, root: &Path, dir: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir)?;
    for (name, image) in palette.iter() {
        let path = palette_output_path(dir, name);
        match image {
            DisplayImage::Recolored(encoded) => write_encoded(encoded, &path)?,
            DisplayImage::Original(source) => {
                std::fs::copy(root.join(source.id()), &path)?;
            }
        }
    }
    Ok(())
}

fn report(set: &SpriteSet, palette: &SpritePalette, output: Option<&Path>) -> PaletteReport {
    let sprites = palette
        .iter()
        .map(|(name, image)| {
            let asset = set.get(name);
            let frames = match asset.map(|a| a.kind) {
                Some(SpriteKind::Animated { frames }) => Some(frames),
                _ => None,
            };
            let source = asset.map(|a| a.source.id().to_string()).unwrap_or_default();
            let encoded = image.as_recolored();
            let sprite = SpriteReport {
                recolored: encoded.is_some(),
                source,
                frames,
                size: encoded.map(|e| [e.width(), e.height()]),
                path: output.map(|dir| palette_output_path(dir, name).to_string_lossy().into_owned()),
                data_url: match output {
                    None => encoded.map(|e| e.to_data_url()),
                    Some(_) => None,
                },
            };
            (name.clone(), sprite)
        })
        .collect();

    PaletteReport {
        set: set.name().to_string(),
        family: set.family().to_string(),
        color: palette.target().to_hex(),
        native: palette.is_native(),
        sprites,
    }
}

/// Execute the palette command
pub fn run_palette(
    context: &CliContext,
    set: &str,
    color: &str,
    output: Option<&Path>,
    json: bool,
) -> ExitCode {
    let target = match parse_target(color) {
        Ok(target) => target,
        Err(code) => return code,
    };
    let sprites = match context.sprite_set(set) {
        Ok(sprites) => sprites,
        Err(code) => return code,
    };
    let family = match context.family(sprites.family()) {
        Ok(family) => family,
        Err(code) => return code,
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    let root = context.asset_root();
    let coordinator =
        PaletteCoordinator::new(context.engine(root.clone()), context.config.family_registry());
    let palette = rt.block_on(coordinator.build_palette(&sprites, &family, target));

    for name in palette.fallbacks() {
        eprintln!("Warning: sprite '{}' kept its original colors", name);
    }

    if let Some(dir) = output {
        if let Err(e) = write_palette(&palette, &root, dir) {
            eprintln!("Error: Cannot write palette to '{}': {}", dir.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    if json {
        match serde_json::to_string_pretty(&report(&sprites, &palette, output)) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    let native = if palette.is_native() { " (native)" } else { "" };
    println!("Palette: {} in {}{}", sprites.name(), target, native);
    for (name, image) in palette.iter() {
        match image {
            DisplayImage::Recolored(encoded) => {
                println!("  {}: recolored {}x{}", name, encoded.width(), encoded.height())
            }
            DisplayImage::Original(source) => println!("  {}: original {}", name, source),
        }
    }
    if let Some(dir) = output {
        println!("Saved: {}", dir.display());
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the prewarm command
pub fn run_prewarm(context: &CliContext, sets: &[String], colors: &[String]) -> ExitCode {
    let mut targets: Vec<TargetColor> = Vec::with_capacity(colors.len());
    for color in colors {
        match parse_target(color) {
            Ok(target) => targets.push(target),
            Err(code) => return code,
        }
    }

    let sprite_sets = if sets.is_empty() {
        context.config.sprite_sets()
    } else {
        let mut found = Vec::with_capacity(sets.len());
        for name in sets {
            match context.sprite_set(name) {
                Ok(set) => found.push(set),
                Err(code) => return code,
            }
        }
        found
    };
    if sprite_sets.is_empty() {
        eprintln!("Error: No sprite sets configured");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let coordinator =
        PaletteCoordinator::new(context.engine(context.asset_root()), context.config.family_registry());
    let report = match rt.block_on(coordinator.prewarm(&sprite_sets, &targets)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let cache = coordinator.engine().cache();
    let stats = cache.stats();
    println!(
        "Prewarmed {} palettes ({} native): {} sprites recolored, {} fallbacks",
        report.palettes, report.native, report.recolored, report.fallbacks
    );
    println!(
        "Cache: {}/{} entries, {} misses, {} coalesced, {} evictions, {} failures",
        cache.len(),
        cache.capacity(),
        stats.misses,
        stats.coalesced,
        stats.evictions,
        stats.failures
    );
    if report.fallbacks > 0 {
        eprintln!("Warning: {} sprites could not be recolored", report.fallbacks);
    }
    ExitCode::from(EXIT_SUCCESS)
}
