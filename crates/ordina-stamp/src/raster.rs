use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use ordina_render::{Rect, StampBuffer};
use ordina_types::{DocumentFormat, StampPosition};
use tracing::debug;

use crate::error::{StampError, StampResult};
use crate::traits::Stamper;

/// Distance in pixels between the stamp and the image edges.
pub const IMAGE_MARGIN: u32 = 20;
/// JPEG quality used when re-encoding.
pub const JPEG_QUALITY: u8 = 95;
const BACKDROP_ALPHA: u8 = 128;
const BACKDROP_PADDING: u32 = 5;

/// Composites the stamp onto PNG and JPEG rasters.
///
/// The output keeps the source's dimensions and raster format. A
/// translucent white backdrop is laid under the text block so the stamp
/// stays legible on busy images.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageStamper;

impl Stamper for ImageStamper {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Image
    }

    fn apply(
        &self,
        source: &[u8],
        stamp: &StampBuffer,
        position: StampPosition,
    ) -> StampResult<Vec<u8>> {
        let raster_format = image::guess_format(source)
            .map_err(|e| StampError::MalformedImage(e.to_string()))?;
        if !matches!(raster_format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(StampError::MalformedImage(format!(
                "unsupported raster encoding {raster_format:?}"
            )));
        }
        let decoded = image::load_from_memory_with_format(source, raster_format)
            .map_err(|e| StampError::MalformedImage(e.to_string()))?;
        let had_alpha = decoded.color().has_alpha();
        let mut canvas = decoded.to_rgba8();

        let (x, y) = position.place(
            canvas.width(),
            canvas.height(),
            stamp.width(),
            stamp.height(),
            IMAGE_MARGIN,
        );
        let text = stamp.text_rect.padded(BACKDROP_PADDING);
        draw_backdrop(
            &mut canvas,
            Rect::new(x + text.x, y + text.y, text.width, text.height),
        );
        imageops::overlay(&mut canvas, &stamp.image, i64::from(x), i64::from(y));

        debug!(
            width = canvas.width(),
            height = canvas.height(),
            x,
            y,
            format = ?raster_format,
            "image stamped"
        );
        encode(canvas, raster_format, had_alpha)
    }
}

fn draw_backdrop(canvas: &mut RgbaImage, rect: Rect) {
    let veil = Rgba([255, 255, 255, BACKDROP_ALPHA]);
    let x_end = (rect.x + rect.width).min(canvas.width());
    let y_end = (rect.y + rect.height).min(canvas.height());
    for py in rect.y..y_end {
        for px in rect.x..x_end {
            blend(canvas.get_pixel_mut(px, py), veil);
        }
    }
}

/// Source-over blend of `top` onto `base`.
fn blend(base: &mut Rgba<u8>, top: Rgba<u8>) {
    let ta = u32::from(top[3]);
    let ba = u32::from(base[3]);
    let out_a = ta + ba * (255 - ta) / 255;
    if out_a == 0 {
        *base = Rgba([0, 0, 0, 0]);
        return;
    }
    for channel in 0..3 {
        let tc = u32::from(top[channel]) * ta;
        let bc = u32::from(base[channel]) * ba * (255 - ta) / 255;
        base[channel] = ((tc + bc) / out_a) as u8;
    }
    base[3] = out_a as u8;
}

fn encode(canvas: RgbaImage, format: ImageFormat, had_alpha: bool) -> StampResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| StampError::encode(DocumentFormat::Image, e))?;
        }
        _ => {
            let image = if had_alpha {
                DynamicImage::ImageRgba8(canvas)
            } else {
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
            };
            image
                .write_to(&mut out, ImageFormat::Png)
                .map_err(|e| StampError::encode(DocumentFormat::Image, e))?;
        }
    }
    Ok(out.into_inner())
}
