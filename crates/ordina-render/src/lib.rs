//! Stamp rendering for Ordina.
//!
//! [`StampRenderer`] turns a [`StampSpec`] (protocol number, timestamp, text
//! template, optional [`Seal`]) into a [`StampBuffer`]: a transparent RGBA
//! raster plus the vector description of the same stamp (lines, font, layout
//! rectangles) for containers that carry text natively.
//!
//! Rendering is deterministic. Text is drawn with a built-in 5×7 bitmap face
//! scaled from the configured point size, and the seal is thumbnailed once
//! when it is loaded. The same spec and style always yield the same pixels.

pub mod buffer;
pub mod error;
pub mod font;
pub mod renderer;
pub mod seal;
pub mod spec;
pub mod style;
pub mod template;

pub use buffer::{Rect, StampBuffer};
pub use error::{RenderError, RenderResult};
pub use renderer::{FontSpec, StampRenderer};
pub use seal::Seal;
pub use spec::StampSpec;
pub use style::StampStyle;
