use image::RgbaImage;

use crate::renderer::FontSpec;
use crate::seal::Seal;

/// Axis-aligned rectangle in buffer pixels, y pointing down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow by `pad` on every side, clamped at the origin.
    pub fn padded(&self, pad: u32) -> Self {
        let x = self.x.saturating_sub(pad);
        let y = self.y.saturating_sub(pad);
        Self {
            x,
            y,
            width: self.x + self.width + pad - x,
            height: self.y + self.height + pad - y,
        }
    }
}

/// A rendered stamp.
///
/// `image` is the transparent raster. The remaining fields describe the same
/// stamp as vector content: text lines in `font` inside `text_rect`, and the
/// seal (if any) inside `seal_rect`.
#[derive(Clone, Debug)]
pub struct StampBuffer {
    pub image: RgbaImage,
    pub lines: Vec<String>,
    pub font: FontSpec,
    /// Pixels per bitmap-font dot.
    pub dot: u32,
    pub text_rect: Rect,
    pub seal: Option<Seal>,
    pub seal_rect: Option<Rect>,
}

impl StampBuffer {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The stamp text with lines joined by `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}
