//! Configuration schema types for `tint.toml`
//!
//! Defines the structure and validation rules for spritetint configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CAPACITY;
use crate::color::TargetColor;
use crate::families::{FamilyRegistry, SpriteFamily};
use crate::palette::{SpriteAsset, SpriteSet};
use crate::range::{ColorRange, RangeError};

/// Recolor cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of recolored sprites kept in memory
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY.get()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// A sprite family declared in config (adds to or overrides the built-ins)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Color the family's sprites are authored in
    pub native: TargetColor,
    /// Primary hue interval in degrees
    pub hue: [f64; 2],
    /// Optional second hue interval for families spanning 0/360
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue2: Option<[f64; 2]>,
    /// Saturation interval in percent
    #[serde(default = "full_percent")]
    pub saturation: [f64; 2],
    /// Lightness interval in percent
    #[serde(default = "full_percent")]
    pub lightness: [f64; 2],
}

fn full_percent() -> [f64; 2] {
    [0.0, 100.0]
}

impl FamilyConfig {
    /// Build the validated family.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if any interval is invalid.
    pub fn to_family(&self, name: &str) -> Result<SpriteFamily, RangeError> {
        let mut range = ColorRange::new(self.hue, self.saturation, self.lightness)?;
        if let Some(hue2) = self.hue2 {
            range = range.with_second_hue(hue2)?;
        }
        Ok(SpriteFamily::new(name, self.native, range))
    }
}

/// One sprite entry of a sprite set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// Image path, relative to the set's root
    pub path: PathBuf,
    /// Frame count for horizontal animation strips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,
}

/// A named set of sprites for one character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteSetConfig {
    /// Family the sprites are authored in
    pub family: String,
    /// Directory the sprite paths are relative to (relative to the config file)
    #[serde(default)]
    pub root: PathBuf,
    /// Sprite name -> image
    #[serde(default)]
    pub sprites: BTreeMap<String, SpriteConfig>,
}

impl SpriteSetConfig {
    /// Build the sprite set. Source ids are paths relative to the project
    /// root, so an `FsCodec` rooted there can resolve them.
    pub fn to_sprite_set(&self, name: &str) -> SpriteSet {
        let mut set = SpriteSet::new(name, self.family.clone());
        for (sprite, entry) in &self.sprites {
            let id = self.root.join(&entry.path).to_string_lossy().into_owned();
            let asset = match entry.frames {
                Some(frames) if frames > 1 => SpriteAsset::animated(id, frames),
                _ => SpriteAsset::still(id),
            };
            set.insert(sprite.clone(), asset);
        }
        set
    }
}

/// Complete `tint.toml` configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TintConfig {
    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Additional or overriding families
    #[serde(default)]
    pub families: BTreeMap<String, FamilyConfig>,
    /// Sprite sets by name
    #[serde(default)]
    pub sprite_sets: BTreeMap<String, SpriteSetConfig>,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "families.green.hue")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tint.toml: '{}' {}", self.field, self.message)
    }
}

impl TintConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.cache.capacity == 0 {
            errors.push(ConfigValidationError {
                field: "cache.capacity".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        for (name, family) in &self.families {
            if let Err(e) = family.to_family(name) {
                errors.push(ConfigValidationError {
                    field: format!("families.{}", name),
                    message: e.to_string(),
                });
            }
        }

        for (name, set) in &self.sprite_sets {
            let known = self.families.contains_key(&set.family)
                || crate::families::get_builtin(&set.family).is_some();
            if !known {
                errors.push(ConfigValidationError {
                    field: format!("sprite_sets.{}.family", name),
                    message: format!("unknown family '{}'", set.family),
                });
            }
            for (sprite, entry) in &set.sprites {
                if entry.frames == Some(0) {
                    errors.push(ConfigValidationError {
                        field: format!("sprite_sets.{}.sprites.{}.frames", name, sprite),
                        message: "must be a positive integer".to_string(),
                    });
                }
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Cache capacity, falling back to the default for an invalid zero.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache.capacity).unwrap_or(DEFAULT_CAPACITY)
    }

    /// Built-in families plus the ones declared here. Invalid declarations
    /// are skipped; `validate` reports them.
    pub fn family_registry(&self) -> FamilyRegistry {
        let mut registry = FamilyRegistry::with_builtins();
        for (name, family) in &self.families {
            if let Ok(family) = family.to_family(name) {
                registry.register(family);
            }
        }
        registry
    }

    /// Sprite set by name.
    pub fn sprite_set(&self, name: &str) -> Option<SpriteSet> {
        self.sprite_sets.get(name).map(|set| set.to_sprite_set(name))
    }

    /// Every configured sprite set, in name order.
    pub fn sprite_sets(&self) -> Vec<SpriteSet> {
        self.sprite_sets.iter().map(|(name, set)| set.to_sprite_set(name)).collect()
    }
}

/// Directory sprite ids are resolved against: the config file's directory.
pub fn asset_root(config_path: Option<&Path>) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::SpriteKind;

    const FULL: &str = r##"
[cache]
capacity = 64

[logging]
level = "debug"

[families.green]
native = "#33CC66"
hue = [90, 160]
saturation = [25, 100]
lightness = [15, 85]

[families.red]
native = "crimson"
hue = [0, 20]
hue2 = [330, 360]

[sprite_sets.ninja]
family = "blue"
root = "assets/ninja"

[sprite_sets.ninja.sprites]
idle = { path = "idle.png", frames = 4 }
portrait = { path = "portrait.png" }
"##;

    #[test]
    fn test_minimal_config_parse() {
        let config: TintConfig = toml::from_str("").unwrap();
        assert_eq!(config.cache.capacity, 256);
        assert_eq!(config.logging.level, "warn");
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let config: TintConfig = toml::from_str(FULL).unwrap();
        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.cache_capacity().get(), 64);

        let registry = config.family_registry();
        assert_eq!(registry.len(), 3);
        let red = registry.get("red").unwrap();
        assert_eq!(red.native(), TargetColor::new(0xDC, 0x14, 0x3C));
        assert_eq!(red.range().second_hue(), Some((330.0, 360.0)));
        assert_eq!(red.range().saturation(), (0.0, 100.0));

        let ninja = config.sprite_set("ninja").unwrap();
        assert_eq!(ninja.family(), "blue");
        let idle = ninja.get("idle").unwrap();
        assert_eq!(idle.kind, SpriteKind::Animated { frames: 4 });
        assert_eq!(
            idle.source.id(),
            Path::new("assets/ninja").join("idle.png").to_string_lossy()
        );
        assert_eq!(ninja.get("portrait").unwrap().kind, SpriteKind::Static);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let config: TintConfig = toml::from_str(
            r##"
[cache]
capacity = 0

[families.bad]
native = "#000000"
hue = [200, 100]

[sprite_sets.robot]
family = "chartreuse"
sprites = { body = { path = "body.png", frames = 0 } }
"##,
        )
        .unwrap();

        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "cache.capacity",
                "families.bad",
                "sprite_sets.robot.family",
                "sprite_sets.robot.sprites.body.frames",
            ]
        );
        assert_eq!(config.cache_capacity(), DEFAULT_CAPACITY);
        assert!(!config.family_registry().contains("bad"));
    }

    #[test]
    fn test_bad_native_color_is_a_parse_error() {
        let result: Result<TintConfig, _> = toml::from_str(
            r#"
[families.x]
native = "not-a-color"
hue = [0, 10]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_asset_root() {
        assert_eq!(asset_root(Some(Path::new("game/tint.toml"))), PathBuf::from("game"));
        assert_eq!(asset_root(None), PathBuf::from("."));
    }
}
