//! Per-player sprite palettes
//!
//! A [`SpriteSet`] is every sprite one character slot needs (animation strips
//! and static art), all authored in one [`SpriteFamily`]. The
//! [`PaletteCoordinator`] turns a set plus a target color into a
//! [`SpritePalette`]: one displayable image per sprite name.
//!
//! # Rules
//!
//! - Recoloring to the family's native color does no work at all: the
//!   palette points at the original sprites.
//! - All sprites of a set are recolored concurrently through the shared cache.
//! - A sprite that fails to recolor falls back to its original image; the
//!   rest of the palette is unaffected.
//! - Re-applying the color a slot already has is a no-op.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use futures::future::join_all;
use thiserror::Error;

use crate::codec::{DisplayImage, ImageSource};
use crate::color::TargetColor;
use crate::engine::RecolorEngine;
use crate::families::{FamilyRegistry, SpriteFamily};

/// Error type for palette operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    /// The sprite set names a family the coordinator doesn't know
    #[error("sprite set '{set}' uses unknown family '{family}'")]
    UnknownFamily { set: String, family: String },
}

/// A player position in the match (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerSlot(pub u8);

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

/// How the renderer should treat a sprite image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteKind {
    /// A single still image
    #[default]
    Static,
    /// A horizontal strip of equally sized frames
    Animated { frames: u32 },
}

/// One sprite in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteAsset {
    pub source: ImageSource,
    pub kind: SpriteKind,
}

impl SpriteAsset {
    pub fn still(source: impl Into<ImageSource>) -> Self {
        Self { source: source.into(), kind: SpriteKind::Static }
    }

    pub fn animated(source: impl Into<ImageSource>, frames: u32) -> Self {
        Self { source: source.into(), kind: SpriteKind::Animated { frames } }
    }
}

/// The sprites one character slot draws, all authored in one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSet {
    name: String,
    family: String,
    sprites: BTreeMap<String, SpriteAsset>,
}

impl SpriteSet {
    pub fn new(name: impl Into<String>, family: impl Into<String>) -> Self {
        Self { name: name.into(), family: family.into(), sprites: BTreeMap::new() }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_sprite(mut self, name: impl Into<String>, asset: SpriteAsset) -> Self {
        self.insert(name, asset);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, asset: SpriteAsset) -> Option<SpriteAsset> {
        self.sprites.insert(name.into(), asset)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the family the sprites are authored in.
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn get(&self, sprite: &str) -> Option<&SpriteAsset> {
        self.sprites.get(sprite)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SpriteAsset)> {
        self.sprites.iter()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Displayable images for every sprite of a set, in one target color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpritePalette {
    target: TargetColor,
    images: BTreeMap<String, DisplayImage>,
    fallbacks: Vec<String>,
    native: bool,
}

impl SpritePalette {
    pub fn target(&self) -> TargetColor {
        self.target
    }

    pub fn get(&self, sprite: &str) -> Option<&DisplayImage> {
        self.images.get(sprite)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DisplayImage)> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Sprites that failed to recolor and show their original image.
    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    /// True when the target was the family's native color and nothing was
    /// recolored.
    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn recolored_count(&self) -> usize {
        self.images.values().filter(|image| image.is_recolored()).count()
    }
}

/// Result of [`PaletteCoordinator::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The slot already shows this color; nothing happened
    Unchanged,
    /// The slot's palette was rebuilt
    Rebuilt { recolored: usize, fallbacks: usize },
}

/// Summary of a pre-warm run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmReport {
    /// Palettes built (set x color combinations)
    pub palettes: usize,
    /// Palettes skipped because the color was the family's native one
    pub native: usize,
    /// Sprites now available recolored
    pub recolored: usize,
    /// Sprites that could not be recolored
    pub fallbacks: usize,
}

#[derive(Debug)]
struct SlotState {
    set: SpriteSet,
    palette: SpritePalette,
}

/// Builds and tracks sprite palettes for player slots.
#[derive(Debug)]
pub struct PaletteCoordinator {
    engine: RecolorEngine,
    families: FamilyRegistry,
    slots: HashMap<PlayerSlot, SlotState>,
}

impl PaletteCoordinator {
    pub fn new(engine: RecolorEngine, families: FamilyRegistry) -> Self {
        Self { engine, families, slots: HashMap::new() }
    }

    pub fn engine(&self) -> &RecolorEngine {
        &self.engine
    }

    pub fn families(&self) -> &FamilyRegistry {
        &self.families
    }

    /// Look up the family a sprite set is authored in.
    ///
    /// # Errors
    ///
    /// Returns `PaletteError::UnknownFamily` if the family isn't registered.
    pub fn family_of(&self, sprites: &SpriteSet) -> Result<&SpriteFamily, PaletteError> {
        self.families.get(sprites.family()).ok_or_else(|| PaletteError::UnknownFamily {
            set: sprites.name().to_string(),
            family: sprites.family().to_string(),
        })
    }

    /// Build a palette for `sprites` in `target`.
    ///
    /// Never fails: sprites that cannot be recolored keep their original
    /// image and are listed in [`SpritePalette::fallbacks`].
    pub async fn build_palette(
        &self,
        sprites: &SpriteSet,
        family: &SpriteFamily,
        target: TargetColor,
    ) -> SpritePalette {
        if family.is_native(target) {
            tracing::debug!(set = sprites.name(), target = %target, "native color, using original sprites");
            let images = sprites
                .iter()
                .map(|(name, asset)| (name.clone(), DisplayImage::Original(asset.source.clone())))
                .collect();
            return SpritePalette { target, images, fallbacks: Vec::new(), native: true };
        }

        let requests = sprites.iter().map(|(name, asset)| async move {
            let result = self.engine.recolor(&asset.source, family, target).await;
            (name, asset, result)
        });

        let mut images = BTreeMap::new();
        let mut fallbacks = Vec::new();
        for (name, asset, result) in join_all(requests).await {
            let image = match result {
                Ok(encoded) => DisplayImage::Recolored(encoded),
                Err(e) => {
                    tracing::warn!(
                        set = sprites.name(),
                        sprite = name.as_str(),
                        error = %e,
                        "sprite kept its original colors"
                    );
                    fallbacks.push(name.clone());
                    DisplayImage::Original(asset.source.clone())
                }
            };
            images.insert(name.clone(), image);
        }

        tracing::info!(
            set = sprites.name(),
            target = %target,
            sprites = images.len(),
            fallbacks = fallbacks.len(),
            "palette built"
        );
        SpritePalette { target, images, fallbacks, native: false }
    }

    /// Show `sprites` in `target` for `slot`, rebuilding the slot's palette
    /// unless it already shows exactly that. The whole set is compared, so
    /// editing a set's sprites or family under the same name rebuilds.
    ///
    /// # Errors
    ///
    /// Returns `PaletteError::UnknownFamily` if the set's family isn't
    /// registered.
    pub async fn apply(
        &mut self,
        slot: PlayerSlot,
        sprites: &SpriteSet,
        target: TargetColor,
    ) -> Result<ApplyOutcome, PaletteError> {
        if let Some(current) = self.slots.get(&slot) {
            if current.set == *sprites && current.palette.target() == target {
                tracing::trace!(slot = %slot, target = %target, "color unchanged, skipping rebuild");
                return Ok(ApplyOutcome::Unchanged);
            }
        }

        let family = self.family_of(sprites)?.clone();
        let palette = self.build_palette(sprites, &family, target).await;
        let outcome = ApplyOutcome::Rebuilt {
            recolored: palette.recolored_count(),
            fallbacks: palette.fallbacks().len(),
        };
        self.slots.insert(slot, SlotState { set: sprites.clone(), palette });
        Ok(outcome)
    }

    /// Current palette for `slot`.
    pub fn palette(&self, slot: PlayerSlot) -> Option<&SpritePalette> {
        self.slots.get(&slot).map(|state| &state.palette)
    }

    /// Color last applied to `slot`.
    pub fn applied_color(&self, slot: PlayerSlot) -> Option<TargetColor> {
        self.palette(slot).map(SpritePalette::target)
    }

    /// Forget `slot`'s palette. Its images stay cached until evicted.
    pub fn release(&mut self, slot: PlayerSlot) -> Option<SpritePalette> {
        self.slots.remove(&slot).map(|state| state.palette)
    }

    /// Recolor every set in every target ahead of time so nothing is decoded
    /// mid-match.
    ///
    /// # Errors
    ///
    /// Returns `PaletteError::UnknownFamily` before doing any work if a set's
    /// family isn't registered.
    pub async fn prewarm(
        &self,
        sets: &[SpriteSet],
        targets: &[TargetColor],
    ) -> Result<PrewarmReport, PaletteError> {
        let mut jobs = Vec::with_capacity(sets.len() * targets.len());
        for set in sets {
            let family = self.family_of(set)?;
            for &target in targets {
                jobs.push(self.build_palette(set, family, target));
            }
        }

        let mut report = PrewarmReport::default();
        for palette in join_all(jobs).await {
            report.palettes += 1;
            if palette.is_native() {
                report.native += 1;
            }
            report.recolored += palette.recolored_count();
            report.fallbacks += palette.fallbacks().len();
        }

        tracing::info!(
            palettes = report.palettes,
            recolored = report.recolored,
            fallbacks = report.fallbacks,
            cached = self.engine.cache().len(),
            "prewarm finished"
        );
        Ok(report)
    }

    /// Drop every slot's palette and empty the cache.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.engine.cache().clear();
    }
}
