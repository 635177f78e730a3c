//! Recolor and classify command implementations

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use image::DynamicImage;

use crate::codec::{EncodedImage, ImageSource};
use crate::output::{recolor_output_path, save_png, scale_image, write_encoded, OutputError};
use crate::recolor::classify_image;

use super::{parse_target, runtime, CliContext, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Expand the input argument: a file is used as-is, a directory yields its
/// PNG files in name order.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>, String> {
    if !input.exists() {
        return Err(format!("Cannot open input file '{}': No such file", input.display()));
    }
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let pattern = input.join("*.png");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| format!("Invalid input pattern: {}", e))?;
    let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    files.sort();
    if files.is_empty() {
        return Err(format!("No .png files in '{}'", input.display()));
    }
    Ok(files)
}

fn write_output(image: &EncodedImage, path: &Path, scale: u8) -> Result<(), OutputError> {
    if scale <= 1 {
        return write_encoded(image, path);
    }
    let rgba = image.to_rgba()?;
    save_png(&scale_image(rgba, scale), path)
}

/// Execute the recolor command
pub fn run_recolor(
    context: &CliContext,
    input: &Path,
    color: &str,
    family: &str,
    output: Option<&Path>,
    scale: u8,
) -> ExitCode {
    let target = match parse_target(color) {
        Ok(target) => target,
        Err(code) => return code,
    };
    let family = match context.family(family) {
        Ok(family) => family,
        Err(code) => return code,
    };
    let inputs = match collect_inputs(input) {
        Ok(inputs) => inputs,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if inputs.len() > 1 && output.is_some_and(|o| o.extension().is_some() && !o.is_dir()) {
        eprintln!("Error: --output must be a directory when recoloring a directory");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    if family.is_native(target) {
        eprintln!("Warning: {} is the native color of family '{}'", target, family.name());
    }

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    // Inputs are paths as given, so the codec root is empty.
    let engine = context.engine("");

    let mut failed = false;
    rt.block_on(async {
        for path in &inputs {
            let source = ImageSource::new(path.to_string_lossy().into_owned());
            let encoded = match engine.recolor(&source, &family, target).await {
                Ok(encoded) => encoded,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    failed = true;
                    continue;
                }
            };

            let output_path = recolor_output_path(path, target, output);
            match write_output(&encoded, &output_path, scale) {
                Ok(()) => println!("Saved: {}", output_path.display()),
                Err(e) => {
                    eprintln!("Error: Cannot write '{}': {}", output_path.display(), e);
                    failed = true;
                }
            }
        }
    });

    if failed {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

/// Execute the classify command
pub fn run_classify(context: &CliContext, input: &Path, family: &str, mask: Option<&Path>) -> ExitCode {
    let family = match context.family(family) {
        Ok(family) => family,
        Err(code) => return code,
    };
    let image = match image::open(input) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            eprintln!("Error: Cannot open input file '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let coverage = classify_image(&image, family.range());
    println!("Family: {} ({})", family.name(), family.range());
    println!("Size: {}x{}", image.width(), image.height());
    println!(
        "Matched: {} of {} opaque pixels ({:.1}%)",
        coverage.matched,
        coverage.opaque,
        coverage.ratio() * 100.0
    );

    if let Some(mask_path) = mask {
        let rgba = DynamicImage::ImageLuma8(coverage.mask).to_rgba8();
        if let Err(e) = save_png(&rgba, mask_path) {
            eprintln!("Error: Cannot write '{}': {}", mask_path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
        println!("Mask: {}", mask_path.display());
    }

    ExitCode::from(EXIT_SUCCESS)
}
