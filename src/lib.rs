//! Spritetint - selective team-color recoloring for pixel art sprites
//!
//! This library provides functionality to:
//! - Classify pixels into hue families (HSL ranges with wraparound)
//! - Recolor only the team-color region of a sprite, keeping its shading
//! - Cache recolored sprites with LRU eviction and request coalescing
//! - Build per-player sprite palettes with graceful fallback to the original art

pub mod cache;
pub mod cli;
pub mod codec;
pub mod color;
pub mod config;
pub mod engine;
pub mod families;
pub mod hsl;
pub mod logging;
pub mod output;
pub mod palette;
pub mod range;
pub mod recolor;
pub mod suggest;
