//! Image decode/encode boundary
//!
//! The engine only ever sees RGBA buffers. Getting pixels out of a source
//! reference and turning recolored pixels into something the renderer can
//! display is the job of an [`ImageCodec`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use parking_lot::RwLock;
use thiserror::Error;

/// Opaque reference to a source sprite, identified by path or URL.
///
/// Two sources are the same asset exactly when their ids are equal; pixel
/// content is never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageSource {
    id: Arc<str>,
}

impl ImageSource {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for ImageSource {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ImageSource {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The source could not be resolved or is not a valid raster image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode '{image}': {reason}")]
pub struct DecodeError {
    /// Id of the source that failed
    pub image: String,
    /// What went wrong
    pub reason: String,
}

impl DecodeError {
    pub fn new(image: &ImageSource, reason: impl fmt::Display) -> Self {
        Self { image: image.id().to_string(), reason: reason.to_string() }
    }
}

/// Encoding a recolored buffer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode {width}x{height} image: {reason}")]
pub struct EncodeError {
    pub width: u32,
    pub height: u32,
    pub reason: String,
}

/// A recolored sprite, PNG-encoded and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    width: u32,
    height: u32,
    png: Arc<[u8]>,
}

impl EncodedImage {
    /// Encode an RGBA image as PNG.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if the PNG encoder rejects the buffer.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self, EncodeError> {
        let (width, height) = image.dimensions();
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(image.as_raw(), width, height, ColorType::Rgba8)
            .map_err(|e| EncodeError { width, height, reason: e.to_string() })?;
        Ok(Self { width, height, png: png.into() })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// `data:` URL for hosts that display images by URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }

    /// Decode the PNG back into pixels.
    ///
    /// # Errors
    ///
    /// Returns the underlying `image` error if the bytes are not a valid PNG.
    pub fn to_rgba(&self) -> Result<RgbaImage, image::ImageError> {
        Ok(image::load_from_memory(&self.png)?.to_rgba8())
    }

    /// True when both handles point at the same encoded buffer.
    pub fn same_buffer(&self, other: &EncodedImage) -> bool {
        Arc::ptr_eq(&self.png, &other.png)
    }
}

/// What a palette hands the rendering layer for one sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayImage {
    /// The untouched source sprite
    Original(ImageSource),
    /// A recolored copy
    Recolored(EncodedImage),
}

impl DisplayImage {
    pub fn is_recolored(&self) -> bool {
        matches!(self, DisplayImage::Recolored(_))
    }

    pub fn as_recolored(&self) -> Option<&EncodedImage> {
        match self {
            DisplayImage::Recolored(image) => Some(image),
            DisplayImage::Original(_) => None,
        }
    }
}

/// Decode/encode boundary between the engine and the host platform.
#[async_trait]
pub trait ImageCodec: Send + Sync {
    /// Resolve a source reference to RGBA pixels.
    async fn decode(&self, source: &ImageSource) -> Result<RgbaImage, DecodeError>;

    /// Turn RGBA pixels into a displayable image.
    async fn encode(&self, image: RgbaImage) -> Result<EncodedImage, EncodeError> {
        EncodedImage::from_rgba(&image)
    }
}

/// Reads sprites from disk, resolving ids relative to an asset root.
#[derive(Debug, Clone)]
pub struct FsCodec {
    root: PathBuf,
}

impl FsCodec {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source: &ImageSource) -> PathBuf {
        self.root.join(source.id())
    }
}

#[async_trait]
impl ImageCodec for FsCodec {
    async fn decode(&self, source: &ImageSource) -> Result<RgbaImage, DecodeError> {
        let path = self.resolve(source);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| DecodeError::new(source, format!("{}: {}", path.display(), e)))?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| DecodeError::new(source, e))?;
        Ok(decoded.to_rgba8())
    }
}

/// Serves pre-registered images from memory.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    images: RwLock<HashMap<ImageSource, Arc<RgbaImage>>>,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the pixels behind `source`.
    pub fn insert(&self, source: impl Into<ImageSource>, image: RgbaImage) {
        self.images.write().insert(source.into(), Arc::new(image));
    }

    pub fn contains(&self, source: &ImageSource) -> bool {
        self.images.read().contains_key(source)
    }
}

#[async_trait]
impl ImageCodec for MemoryCodec {
    async fn decode(&self, source: &ImageSource) -> Result<RgbaImage, DecodeError> {
        self.images
            .read()
            .get(source)
            .map(|image| image.as_ref().clone())
            .ok_or_else(|| DecodeError::new(source, "no image registered under this id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(3, 2, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0x33, 0x66, 0xCC, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_encoded_image_round_trips_pixels() {
        let encoded = EncodedImage::from_rgba(&checker()).unwrap();
        assert_eq!((encoded.width(), encoded.height()), (3, 2));
        assert_eq!(&encoded.png_bytes()[1..4], b"PNG");
        assert_eq!(encoded.to_rgba().unwrap(), checker());
    }

    #[test]
    fn test_data_url_prefix() {
        let encoded = EncodedImage::from_rgba(&checker()).unwrap();
        assert!(encoded.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_same_buffer_tracks_clones_not_content() {
        let a = EncodedImage::from_rgba(&checker()).unwrap();
        let b = a.clone();
        let c = EncodedImage::from_rgba(&checker()).unwrap();
        assert!(a.same_buffer(&b));
        assert!(!a.same_buffer(&c));
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn test_memory_codec_decode() {
        let codec = MemoryCodec::new();
        codec.insert("hero.png", checker());
        let source = ImageSource::new("hero.png");
        assert!(codec.contains(&source));
        assert_eq!(codec.decode(&source).await.unwrap(), checker());

        let err = codec.decode(&ImageSource::new("ghost.png")).await.unwrap_err();
        assert_eq!(err.image, "ghost.png");
    }

    #[tokio::test]
    async fn test_fs_codec_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        checker().save(dir.path().join("belt.png")).unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let codec = FsCodec::new(dir.path());
        let decoded = codec.decode(&ImageSource::new("belt.png")).await.unwrap();
        assert_eq!(decoded, checker());

        assert!(codec.decode(&ImageSource::new("missing.png")).await.is_err());
        assert!(codec.decode(&ImageSource::new("broken.png")).await.is_err());
    }
}
