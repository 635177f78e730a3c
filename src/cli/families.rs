//! Families command implementation

use std::process::ExitCode;

use crate::families::list_builtins;

use super::{CliContext, EXIT_SUCCESS};

/// Execute the families command
pub fn run_families(context: &CliContext, name: Option<&str>) -> ExitCode {
    let Some(name) = name else {
        let builtins = list_builtins();
        println!("Sprite families:");
        for family in context.config.family_registry().iter() {
            let builtin = builtins.iter().any(|&b| b == family.name());
            let origin = match (builtin, context.config.families.contains_key(family.name())) {
                (true, true) => "built-in, overridden",
                (false, _) => "tint.toml",
                (true, false) => "built-in",
            };
            println!("  {:<12} native {}  [{}]", family.name(), family.native(), origin);
        }
        return ExitCode::from(EXIT_SUCCESS);
    };

    let family = match context.family(name) {
        Ok(family) => family,
        Err(code) => return code,
    };
    let range = family.range();
    println!("Family: {}", family.name());
    println!();
    println!("  native      {}", family.native());
    println!("  hue         {}-{}", range.hue().0, range.hue().1);
    if let Some((min, max)) = range.second_hue() {
        println!("  hue (wrap)  {}-{}", min, max);
    }
    println!("  saturation  {}-{}%", range.saturation().0, range.saturation().1);
    println!("  lightness   {}-{}%", range.lightness().0, range.lightness().1);
    ExitCode::from(EXIT_SUCCESS)
}
