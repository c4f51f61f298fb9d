use image::{imageops, Rgba, RgbaImage};
use ordina_types::Rgb;
use tracing::debug;

use crate::buffer::{Rect, StampBuffer};
use crate::error::{RenderError, RenderResult};
use crate::font;
use crate::spec::StampSpec;
use crate::style::StampStyle;

/// Font settings shared by the raster and the vector form of the stamp.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: String,
    /// Point size.
    pub size: f32,
    pub color: Rgb,
}

impl FontSpec {
    /// Pixels per font dot for this point size (96 dpi, one line ≈ 8 dots).
    pub fn dot_size(&self) -> u32 {
        let px = f64::from(self.size) * 96.0 / 72.0;
        ((px / 8.0).round() as u32).max(1)
    }
}

impl From<&StampStyle> for FontSpec {
    fn from(style: &StampStyle) -> Self {
        Self {
            family: style.font_family.clone(),
            size: style.font_size,
            color: style.color,
        }
    }
}

/// Renders [`StampSpec`]s into [`StampBuffer`]s.
///
/// Layout: the text block sits on one side, the seal on the side named by the
/// spec's position, each separated by [`StampRenderer::MARGIN`]. The canvas
/// is exactly large enough for both and fully transparent elsewhere.
#[derive(Clone, Debug)]
pub struct StampRenderer {
    font: FontSpec,
}

impl StampRenderer {
    /// Gap between the canvas edge, the text block, and the seal.
    pub const MARGIN: u32 = 10;

    pub fn new(font: FontSpec) -> RenderResult<Self> {
        if font.family.trim().is_empty() {
            return Err(RenderError::InvalidStyle("font family is empty".into()));
        }
        if !font.size.is_finite() || font.size <= 0.0 {
            return Err(RenderError::InvalidStyle(format!("font size {}", font.size)));
        }
        Ok(Self { font })
    }

    /// Validate the whole style and build a renderer for its font.
    pub fn from_style(style: &StampStyle) -> RenderResult<Self> {
        style.validate()?;
        Self::new(FontSpec::from(style))
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn render(&self, spec: &StampSpec) -> StampBuffer {
        let lines = spec.text_lines();
        let dot = self.font.dot_size();
        let (dots_w, dots_h) = font::measure(&lines);
        let (text_w, text_h) = (dots_w * dot, dots_h * dot);
        let m = Self::MARGIN;

        let (width, height, text_rect, seal_rect) = match &spec.seal {
            Some(seal) => {
                let (seal_w, seal_h) = (seal.width(), seal.height());
                let width = m + text_w + m + seal_w + m;
                let height = m + text_h.max(seal_h) + m;
                let (seal_x, seal_y) = spec.position.place(width, height, seal_w, seal_h, m);
                let text_x = if spec.position.is_left() {
                    m + seal_w + m
                } else {
                    m
                };
                let text_y = if spec.position.is_top() {
                    m
                } else {
                    height - m - text_h
                };
                (
                    width,
                    height,
                    Rect::new(text_x, text_y, text_w, text_h),
                    Some(Rect::new(seal_x, seal_y, seal_w, seal_h)),
                )
            }
            None => (
                m + text_w + m,
                m + text_h + m,
                Rect::new(m, m, text_w, text_h),
                None,
            ),
        };

        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        draw_text(&mut image, &lines, text_rect.x, text_rect.y, dot, self.font.color);
        if let (Some(seal), Some(rect)) = (&spec.seal, seal_rect) {
            imageops::overlay(&mut image, seal.image(), i64::from(rect.x), i64::from(rect.y));
        }

        debug!(
            width,
            height,
            lines = lines.len(),
            seal = spec.seal.is_some(),
            "stamp rendered"
        );

        StampBuffer {
            image,
            lines,
            font: self.font.clone(),
            dot,
            text_rect,
            seal: spec.seal.clone(),
            seal_rect,
        }
    }
}

fn draw_text(image: &mut RgbaImage, lines: &[String], x0: u32, y0: u32, dot: u32, color: Rgb) {
    let ink = Rgba([color.0, color.1, color.2, 255]);
    for (row_index, line) in lines.iter().enumerate() {
        let line_y = y0 + row_index as u32 * font::LINE_ADVANCE * dot;
        for (col_index, c) in line.chars().enumerate() {
            let char_x = x0 + col_index as u32 * font::ADVANCE * dot;
            for col in 0..font::GLYPH_WIDTH {
                for row in 0..font::GLYPH_HEIGHT {
                    if font::is_set(c, col, row) {
                        fill_block(image, char_x + col * dot, line_y + row * dot, dot, ink);
                    }
                }
            }
        }
    }
}

fn fill_block(image: &mut RgbaImage, x: u32, y: u32, size: u32, ink: Rgba<u8>) {
    for dy in 0..size {
        for dx in 0..size {
            let (px, py) = (x + dx, y + dy);
            if px < image.width() && py < image.height() {
                image.put_pixel(px, py, ink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal::Seal;
    use chrono::NaiveDate;
    use ordina_types::{ProtocolFormat, StampPosition};

    fn spec(position: StampPosition, seal: Option<Seal>) -> StampSpec {
        let style = StampStyle {
            position,
            ..StampStyle::default()
        };
        let timestamp = NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        StampSpec::new(ProtocolFormat::default().render(2025, 42), timestamp, &style, seal)
    }

    fn seal(width: u32, height: u32) -> Seal {
        Seal::from_image(
            RgbaImage::from_pixel(width, height, Rgba([0, 128, 0, 255])),
            200,
        )
        .unwrap()
    }

    fn renderer() -> StampRenderer {
        StampRenderer::from_style(&StampStyle::default()).unwrap()
    }

    #[test]
    fn dot_size_tracks_point_size() {
        let mut font = FontSpec::from(&StampStyle::default());
        assert_eq!(font.dot_size(), 2);
        font.size = 24.0;
        assert_eq!(font.dot_size(), 4);
        font.size = 4.0;
        assert_eq!(font.dot_size(), 1);
    }

    #[test]
    fn render_is_deterministic() {
        let a = renderer().render(&spec(StampPosition::BottomRight, Some(seal(30, 20))));
        let b = renderer().render(&spec(StampPosition::BottomRight, Some(seal(30, 20))));
        assert_eq!(a.image.dimensions(), b.image.dimensions());
        assert_eq!(a.image.as_raw(), b.image.as_raw());
    }

    #[test]
    fn background_is_transparent() {
        let buffer = renderer().render(&spec(StampPosition::TopLeft, None));
        assert_eq!(buffer.image.get_pixel(0, 0)[3], 0);
        let inked = buffer.image.pixels().filter(|p| p[3] == 255).count();
        assert!(inked > 0);
        assert!(inked < (buffer.width() * buffer.height()) as usize / 2);
    }

    #[test]
    fn text_uses_configured_color() {
        let buffer = renderer().render(&spec(StampPosition::TopLeft, None));
        assert!(buffer
            .image
            .pixels()
            .filter(|p| p[3] == 255)
            .all(|p| p[0] == 255 && p[1] == 0 && p[2] == 0));
    }

    #[test]
    fn buffer_without_seal_fits_text() {
        let buffer = renderer().render(&spec(StampPosition::BottomRight, None));
        let m = StampRenderer::MARGIN;
        assert_eq!(buffer.width(), buffer.text_rect.width + 2 * m);
        assert_eq!(buffer.height(), buffer.text_rect.height + 2 * m);
        assert_eq!(buffer.lines.len(), 2);
        assert_eq!(buffer.lines[0], "Prot. N° 42/2025");
        assert!(buffer.seal_rect.is_none());
    }

    #[test]
    fn seal_sits_in_requested_corner() {
        let m = StampRenderer::MARGIN;
        let right = renderer().render(&spec(StampPosition::BottomRight, Some(seal(30, 80))));
        let rect = right.seal_rect.unwrap();
        assert_eq!(rect.x + rect.width + m, right.width());
        assert_eq!(rect.y + rect.height + m, right.height());
        assert_eq!(right.text_rect.x, m);
        assert_eq!(*right.image.get_pixel(rect.x, rect.y), Rgba([0, 128, 0, 255]));

        let left = renderer().render(&spec(StampPosition::TopLeft, Some(seal(30, 80))));
        let rect = left.seal_rect.unwrap();
        assert_eq!((rect.x, rect.y), (m, m));
        assert_eq!(left.text_rect.x, m + 30 + m);
    }

    #[test]
    fn seal_is_not_distorted() {
        let buffer = renderer().render(&spec(StampPosition::TopRight, Some(seal(60, 15))));
        let rect = buffer.seal_rect.unwrap();
        assert_eq!((rect.width, rect.height), (60, 15));
    }

    #[test]
    fn text_and_seal_do_not_overlap() {
        let buffer = renderer().render(&spec(StampPosition::BottomLeft, Some(seal(40, 40))));
        let text = buffer.text_rect;
        let seal = buffer.seal_rect.unwrap();
        assert!(seal.x + seal.width <= text.x || text.x + text.width <= seal.x);
    }

    #[test]
    fn empty_family_rejected() {
        let font = FontSpec {
            family: " ".into(),
            size: 12.0,
            color: Rgb::RED,
        };
        assert!(StampRenderer::new(font).is_err());
    }

    proptest::proptest! {
        #[test]
        fn rects_stay_inside_buffer(
            size in 4.0f32..48.0,
            seal_w in 1u32..120,
            seal_h in 1u32..120,
            corner in 0usize..4,
        ) {
            let position = [
                StampPosition::TopLeft,
                StampPosition::TopRight,
                StampPosition::BottomLeft,
                StampPosition::BottomRight,
            ][corner];
            let style = StampStyle {
                font_size: size,
                ..StampStyle::default()
            };
            let buffer = StampRenderer::from_style(&style)
                .unwrap()
                .render(&spec(position, Some(seal(seal_w, seal_h))));
            for rect in [buffer.text_rect, buffer.seal_rect.unwrap()] {
                proptest::prop_assert!(rect.x + rect.width <= buffer.width());
                proptest::prop_assert!(rect.y + rect.height <= buffer.height());
            }
        }
    }
}
