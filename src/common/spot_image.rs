use image::{DynamicImage, GenericImageView, RgbImage};
use crate::common::{SpotError, SpotResult};

/// Decoded source image, kept as RGB8 for both inference and overlay drawing.
#[derive(Debug, Clone, Default)]
pub struct SpotImage {
    pub image: RgbImage,
    pub img_width: u32,
    pub img_height: u32,
}

impl std::ops::Deref for SpotImage {
    type Target = RgbImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl From<DynamicImage> for SpotImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image.to_rgb8())
    }
}

impl From<RgbImage> for SpotImage {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

impl From<SpotImage> for RgbImage {
    fn from(image: SpotImage) -> Self {
        image.image
    }
}

impl SpotImage {
    pub fn new(image: RgbImage) -> Self {
        let (img_width, img_height) = image.dimensions();
        Self {
            image,
            img_width,
            img_height,
        }
    }

    /// Decodes an uploaded file (any format `image` recognises).
    ///
    /// Non-image bytes, truncated files and images without pixels all fail with
    /// `ImageDecode`.
    pub fn decode(bytes: &[u8]) -> SpotResult<Self> {
        if bytes.is_empty() {
            return Err(SpotError::ImageDecode("empty upload".to_string()));
        }
        let image = image::load_from_memory(bytes)?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SpotError::ImageDecode(format!("invalid image dimensions: {width}x{height}")));
        }
        Ok(Self::from(image))
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> SpotResult<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|err| {
            SpotError::ImageDecode(format!("cannot read {:?}: {err}", path.as_ref()))
        })?;
        Self::decode(&bytes)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.img_width, self.img_height)
    }

    pub fn clone_image(&self) -> RgbImage {
        self.image.clone()
    }
}
