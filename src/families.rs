//! Sprite family definitions.
//!
//! A family pairs the color a sprite set is authored in (its native color)
//! with the HSL region that counts as "team color" on those sprites.
//! Two families ship built in; more can be declared in `tint.toml`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::color::TargetColor;
use crate::range::ColorRange;

/// List of all built-in family names.
const BUILTIN_NAMES: &[&str] = &["blue", "red"];

/// A named hue family with its native color and classification range.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteFamily {
    name: Arc<str>,
    native: TargetColor,
    range: ColorRange,
}

impl SpriteFamily {
    pub fn new(name: impl Into<Arc<str>>, native: TargetColor, range: ColorRange) -> Self {
        Self { name: name.into(), native, range }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the name, used to label cache keys.
    pub fn id(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn native(&self) -> TargetColor {
        self.native
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    /// True when recoloring to `target` would reproduce the authored sprite.
    pub fn is_native(&self, target: TargetColor) -> bool {
        self.native == target
    }
}

/// Returns a list of all available built-in family names.
pub fn list_builtins() -> Vec<&'static str> {
    BUILTIN_NAMES.to_vec()
}

/// Returns a built-in family by name, or None if not found.
pub fn get_builtin(name: &str) -> Option<SpriteFamily> {
    match name {
        "blue" => Some(blue()),
        "red" => Some(red()),
        _ => None,
    }
}

/// Cool family: belts authored around #3366CC (hue 220).
fn blue() -> SpriteFamily {
    SpriteFamily::new(
        "blue",
        TargetColor::new(0x33, 0x66, 0xCC),
        ColorRange::from_bounds((190.0, 250.0), None, (25.0, 100.0), (15.0, 85.0)),
    )
}

/// Warm family: belts authored around #CC3333 (hue 0), spanning the seam.
///
/// The hue arc is lopsided toward magenta and the lightness band is narrow so
/// that orange-leaning skin shading and pale highlights stay untouched.
fn red() -> SpriteFamily {
    SpriteFamily::new(
        "red",
        TargetColor::new(0xCC, 0x33, 0x33),
        ColorRange::from_bounds((0.0, 18.0), Some((340.0, 360.0)), (35.0, 100.0), (22.0, 72.0)),
    )
}

/// Name-keyed lookup of families, seeded with the built-ins.
#[derive(Debug, Clone, Default)]
pub struct FamilyRegistry {
    families: BTreeMap<String, SpriteFamily>,
}

impl FamilyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in family.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for family in BUILTIN_NAMES.iter().filter_map(|name| get_builtin(name)) {
            registry.register(family);
        }
        registry
    }

    /// Register a family, replacing any existing family with the same name.
    ///
    /// Returns the replaced family, if any.
    pub fn register(&mut self, family: SpriteFamily) -> Option<SpriteFamily> {
        self.families.insert(family.name().to_string(), family)
    }

    pub fn get(&self, name: &str) -> Option<&SpriteFamily> {
        self.families.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Families in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteFamily> {
        self.families.values()
    }
}
