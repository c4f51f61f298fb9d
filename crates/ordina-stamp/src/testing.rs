use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use ordina_render::{Seal, StampBuffer, StampRenderer, StampSpec, StampStyle};
use ordina_types::{ProtocolFormat, StampPosition};

/// Stamp for protocol 42/2025 at 03/11/2025 16:45:12.
pub fn stamp(position: StampPosition, seal: Option<Seal>) -> StampBuffer {
    let style = StampStyle {
        position,
        ..StampStyle::default()
    };
    let at = NaiveDate::from_ymd_opt(2025, 11, 3)
        .unwrap()
        .and_hms_opt(16, 45, 12)
        .unwrap();
    let spec = StampSpec::new(ProtocolFormat::default().render(2025, 42), at, &style, seal);
    StampRenderer::from_style(&style).unwrap().render(&spec)
}

/// A 40×20 opaque seal.
pub fn seal() -> Seal {
    Seal::from_image(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 160, 255])), 200).unwrap()
}
