//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod families;
mod palette;
mod recolor;

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::cache::RecolorCache;
use crate::codec::FsCodec;
use crate::color::TargetColor;
use crate::config::{asset_root, find_config, load_config, merge_cli_overrides, CliOverrides, TintConfig};
use crate::engine::RecolorEngine;
use crate::families::SpriteFamily;
use crate::logging::{init_logging, verbosity_level};
use crate::palette::SpriteSet;
use crate::suggest::did_you_mean;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Spritetint - recolor the team-color region of pixel art sprites
#[derive(Parser)]
#[command(name = "tint")]
#[command(about = "Spritetint - recolor the team-color region of pixel art sprites")]
#[command(version)]
pub struct Cli {
    /// Path to tint.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Maximum number of recolored sprites kept in memory
    #[arg(long, global = true)]
    pub cache_size: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Global flags that take precedence over `tint.toml`.
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            cache_size: self.cache_size,
            log_level: verbosity_level(self.verbose).map(str::to_string),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recolor one sprite image to a target color
    Recolor {
        /// Input PNG sprite
        input: PathBuf,

        /// Target color (hex like #DC143C, or any CSS color)
        #[arg(short, long)]
        color: String,

        /// Family the sprite is authored in
        #[arg(short, long, default_value = "blue")]
        family: String,

        /// Output file or directory.
        /// If omitted: {input}_{RRGGBB}.png
        /// If directory (ends with /): dir/{input}_{RRGGBB}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scale output by integer factor (1-16, default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,
    },
    /// Build the palette of a configured sprite set in one color
    Palette {
        /// Sprite set name from tint.toml
        set: String,

        /// Target color
        #[arg(short, long)]
        color: String,

        /// Directory to write {sprite}.png files into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the palette as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recolor sprite sets in every given color ahead of time
    Prewarm {
        /// Sprite set names (default: every configured set)
        sets: Vec<String>,

        /// Target colors (repeatable)
        #[arg(short, long = "color", required = true)]
        colors: Vec<String>,
    },
    /// Show which pixels of a sprite belong to a family
    Classify {
        /// Input PNG sprite
        input: PathBuf,

        /// Family to classify against
        #[arg(short, long, default_value = "blue")]
        family: String,

        /// Write a black/white coverage mask PNG
        #[arg(long)]
        mask: Option<PathBuf>,
    },
    /// List sprite families, or show one
    Families {
        /// Family name to show in detail
        name: Option<String>,
    },
}

/// Loaded configuration plus where it came from.
pub(crate) struct CliContext {
    pub config: TintConfig,
    pub config_path: Option<PathBuf>,
}

impl CliContext {
    /// Engine whose codec resolves ids against `root`.
    pub fn engine(&self, root: impl Into<PathBuf>) -> RecolorEngine {
        let cache = RecolorCache::new(self.config.cache_capacity());
        RecolorEngine::new(Arc::new(FsCodec::new(root)), cache)
    }

    /// Directory sprite-set ids are relative to.
    pub fn asset_root(&self) -> PathBuf {
        asset_root(self.config_path.as_deref())
    }

    /// Family by name, printing the known families on failure.
    pub fn family(&self, name: &str) -> Result<SpriteFamily, ExitCode> {
        let registry = self.config.family_registry();
        if let Some(family) = registry.get(name) {
            return Ok(family.clone());
        }

        eprintln!("Error: Unknown family '{}'", name);
        let names: Vec<&str> = registry.iter().map(SpriteFamily::name).collect();
        if let Some(hint) = did_you_mean(name, &names) {
            eprintln!("{}", hint);
        }
        eprintln!();
        eprintln!("Available families:");
        for known in names {
            eprintln!("  {}", known);
        }
        Err(ExitCode::from(EXIT_INVALID_ARGS))
    }

    /// Configured sprite set by name.
    pub fn sprite_set(&self, name: &str) -> Result<SpriteSet, ExitCode> {
        if let Some(set) = self.config.sprite_set(name) {
            return Ok(set);
        }

        match &self.config_path {
            Some(path) => eprintln!("Error: No sprite set '{}' in {}", name, path.display()),
            None => eprintln!("Error: No sprite set '{}' (no tint.toml found)", name),
        }
        let names: Vec<&str> = self.config.sprite_sets.keys().map(String::as_str).collect();
        if let Some(hint) = did_you_mean(name, &names) {
            eprintln!("{}", hint);
        }
        Err(ExitCode::from(EXIT_INVALID_ARGS))
    }
}

/// Parse a target color argument, printing an error on failure.
pub(crate) fn parse_target(color: &str) -> Result<TargetColor, ExitCode> {
    color.parse().map_err(|e| {
        eprintln!("Error: Invalid color '{}': {}", color, e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Build the async runtime the engine runs on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|e| {
        eprintln!("Error: Cannot start runtime: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn load_context(config: Option<&Path>, overrides: &CliOverrides) -> Result<CliContext, ExitCode> {
    let config_path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let mut loaded = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    merge_cli_overrides(&mut loaded, overrides);

    if loaded.cache.capacity == 0 {
        eprintln!("Error: --cache-size must be a positive integer");
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    Ok(CliContext { config: loaded, config_path })
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let context = match load_context(cli.config.as_deref(), &cli.overrides()) {
        Ok(context) => context,
        Err(code) => return code,
    };
    init_logging(&context.config.logging.level);

    match cli.command {
        Commands::Recolor { input, color, family, output, scale } => {
            recolor::run_recolor(&context, &input, &color, &family, output.as_deref(), scale)
        }
        Commands::Palette { set, color, output, json } => {
            palette::run_palette(&context, &set, &color, output.as_deref(), json)
        }
        Commands::Prewarm { sets, colors } => palette::run_prewarm(&context, &sets, &colors),
        Commands::Classify { input, family, mask } => {
            recolor::run_classify(&context, &input, &family, mask.as_deref())
        }
        Commands::Families { name } => families::run_families(&context, name.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(args: &[&str]) -> TintConfig {
        let cli = Cli::parse_from(args);
        let mut config: TintConfig = toml::from_str("[logging]\nlevel = \"error\"").unwrap();
        merge_cli_overrides(&mut config, &cli.overrides());
        config
    }

    #[test]
    fn test_verbose_flag_overrides_configured_level() {
        assert_eq!(merged(&["tint", "families"]).logging.level, "error");
        assert_eq!(merged(&["tint", "-v", "families"]).logging.level, "info");
        assert_eq!(merged(&["tint", "families", "-vv"]).logging.level, "debug");
    }

    #[test]
    fn test_cache_size_flag_overrides_configured_capacity() {
        let config = merged(&["tint", "--cache-size", "8", "families"]);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.logging.level, "error");
    }
}
