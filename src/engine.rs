//! Recolor pipeline
//!
//! `(source, family, target)` goes to the cache; on a miss the source is
//! decoded, recolored on the blocking pool, encoded, and stored.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::cache::{RecolorCache, RecolorKey};
use crate::codec::{DecodeError, DisplayImage, EncodeError, EncodedImage, ImageCodec, ImageSource};
use crate::color::TargetColor;
use crate::families::SpriteFamily;
use crate::range::ColorRange;
use crate::recolor::recolor_image;

/// Error type for a single recolor request.
///
/// Cloneable so one failed computation can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum RecolorError {
    /// Source could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Output could not be encoded
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The background task running the computation failed
    #[error("recolor task failed: {0}")]
    Task(String),
    /// The computation went away without reporting a result
    #[error("recolor computation was abandoned")]
    Abandoned,
}

/// Decodes, recolors and encodes sprites through a shared cache.
#[derive(Clone)]
pub struct RecolorEngine {
    codec: Arc<dyn ImageCodec>,
    cache: RecolorCache,
}

impl fmt::Debug for RecolorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecolorEngine").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl RecolorEngine {
    pub fn new(codec: Arc<dyn ImageCodec>, cache: RecolorCache) -> Self {
        Self { codec, cache }
    }

    pub fn cache(&self) -> &RecolorCache {
        &self.cache
    }

    pub fn codec(&self) -> &Arc<dyn ImageCodec> {
        &self.codec
    }

    /// Recolor `source`'s `family` region to `target`.
    ///
    /// # Errors
    ///
    /// Returns `RecolorError` if the source cannot be decoded or the output
    /// cannot be encoded. Nothing is cached in that case.
    pub async fn recolor(
        &self,
        source: &ImageSource,
        family: &SpriteFamily,
        target: TargetColor,
    ) -> Result<EncodedImage, RecolorError> {
        let key = RecolorKey::for_family(source.clone(), family, target);
        let codec = Arc::clone(&self.codec);
        let source = source.clone();
        let range = family.range().clone();
        self.cache
            .get_or_compute(key, move || recolor_source(codec, source, range, target))
            .await
    }

    /// Like [`recolor`](Self::recolor), but falls back to the original sprite
    /// on failure. A wrong-colored sprite beats a missing one.
    pub async fn recolor_or_original(
        &self,
        source: &ImageSource,
        family: &SpriteFamily,
        target: TargetColor,
    ) -> DisplayImage {
        match self.recolor(source, family, target).await {
            Ok(image) => DisplayImage::Recolored(image),
            Err(e) => {
                tracing::warn!(
                    source = %source,
                    family = family.name(),
                    target = %target,
                    error = %e,
                    "recolor failed, using original sprite"
                );
                DisplayImage::Original(source.clone())
            }
        }
    }
}

async fn recolor_source(
    codec: Arc<dyn ImageCodec>,
    source: ImageSource,
    range: ColorRange,
    target: TargetColor,
) -> Result<EncodedImage, RecolorError> {
    let start = Instant::now();
    let image = codec.decode(&source).await?;
    let (width, height) = image.dimensions();

    let (hue, saturation) = target.hue_saturation();
    let recolored = tokio::task::spawn_blocking(move || recolor_image(&image, &range, hue, saturation))
        .await
        .map_err(|e| RecolorError::Task(e.to_string()))?;

    let encoded = codec.encode(recolored).await?;
    tracing::debug!(
        source = %source,
        target = %target,
        width,
        height,
        elapsed_us = start.elapsed().as_micros() as u64,
        "recolored sprite"
    );
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryCodec;
    use crate::families::get_builtin;
    use image::{Rgba, RgbaImage};

    fn engine_with(codec: MemoryCodec) -> RecolorEngine {
        RecolorEngine::new(Arc::new(codec), RecolorCache::default())
    }

    #[tokio::test]
    async fn test_recolor_changes_only_family_pixels() {
        let codec = MemoryCodec::new();
        let mut sprite = RgbaImage::from_pixel(2, 1, Rgba([0x33, 0x66, 0xCC, 255]));
        sprite.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        codec.insert("belt.png", sprite);

        let engine = engine_with(codec);
        let blue = get_builtin("blue").unwrap();
        let out = engine
            .recolor(&ImageSource::new("belt.png"), &blue, TargetColor::new(0xCC, 0x33, 0x33))
            .await
            .unwrap()
            .to_rgba()
            .unwrap();

        assert_eq!(out.get_pixel(0, 0), &Rgba([0xCC, 0x33, 0x33, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_repeat_request_returns_the_same_buffer() {
        let codec = MemoryCodec::new();
        codec.insert("belt.png", RgbaImage::from_pixel(1, 1, Rgba([0x33, 0x66, 0xCC, 255])));
        let engine = engine_with(codec);
        let blue = get_builtin("blue").unwrap();
        let source = ImageSource::new("belt.png");
        let target = TargetColor::new(0, 200, 0);

        let a = engine.recolor(&source, &blue, target).await.unwrap();
        let b = engine.recolor(&source, &blue, target).await.unwrap();
        assert!(a.same_buffer(&b));
        assert_eq!(engine.cache().stats().misses, 1);
    }

    #[tokio::test]
    async fn test_decode_failure_falls_back_to_original() {
        let engine = engine_with(MemoryCodec::new());
        let blue = get_builtin("blue").unwrap();
        let source = ImageSource::new("missing.png");

        let err = engine.recolor(&source, &blue, TargetColor::new(255, 0, 0)).await.unwrap_err();
        assert!(matches!(err, RecolorError::Decode(_)));

        let display = engine.recolor_or_original(&source, &blue, TargetColor::new(255, 0, 0)).await;
        assert_eq!(display, DisplayImage::Original(source));
        assert!(engine.cache().is_empty());
    }
}
