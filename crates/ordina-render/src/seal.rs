use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{RenderError, RenderResult};

/// A decoded, size-limited seal image.
///
/// Holds both the RGBA pixels (for raster compositing) and a PNG encoding
/// (for containers that embed the picture as a part). Cloning is cheap.
#[derive(Clone)]
pub struct Seal {
    image: Arc<RgbaImage>,
    png: Arc<Vec<u8>>,
}

impl Seal {
    /// Decode any supported raster and shrink it so its longest edge is at
    /// most `max_edge`, preserving the aspect ratio.
    pub fn from_bytes(bytes: &[u8], max_edge: u32) -> RenderResult<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| RenderError::SealDecode(e.to_string()))?;
        Self::from_image(decoded.to_rgba8(), max_edge)
    }

    pub fn from_image(image: RgbaImage, max_edge: u32) -> RenderResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::SealDecode("seal image is empty".into()));
        }
        let (width, height) = thumbnail_size(image.width(), image.height(), max_edge);
        let image = if (width, height) == image.dimensions() {
            image
        } else {
            imageops::resize(&image, width, height, FilterType::Triangle)
        };

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image.clone())
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| RenderError::SealEncode(e.to_string()))?;

        Ok(Self {
            image: Arc::new(image),
            png: Arc::new(cursor.into_inner()),
        })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// PNG encoding of [`Seal::image`].
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height for a given display width, keeping the aspect ratio.
    pub fn scaled_height(&self, width: u64) -> u64 {
        (width * u64::from(self.height()) + u64::from(self.width()) / 2) / u64::from(self.width())
    }
}

impl fmt::Debug for Seal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seal")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

impl PartialEq for Seal {
    fn eq(&self, other: &Self) -> bool {
        self.image.as_raw() == other.image.as_raw() && self.image.dimensions() == other.image.dimensions()
    }
}

/// Fit `(width, height)` inside a `max_edge` square without upscaling.
fn thumbnail_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge {
        return (width, height);
    }
    let scale = |edge: u32| {
        let scaled = (u64::from(edge) * u64::from(max_edge) + u64::from(longest) / 2) / u64::from(longest);
        (scaled as u32).max(1)
    };
    (scale(width), scale(height))
}
