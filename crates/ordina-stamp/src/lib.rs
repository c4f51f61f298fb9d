//! Format-specific stampers for Ordina.
//!
//! [`FormatDispatcher`] picks the [`DocumentFormat`](ordina_types::DocumentFormat)
//! from a file extension, and [`StamperSet`] maps each format to its
//! [`Stamper`] with one exhaustive `match`.
//!
//! # Key Types
//!
//! - [`ImageStamper`]: PNG/JPEG compositing, re-encoded in the source format
//! - [`PdfStamper`]: Form XObject overlay on page 1
//! - [`DocxStamper`]: header run and footer seal in a `.docx` package
//! - [`XlsxStamper`]: A1 text and anchored seal in a `.xlsx` package
//!
//! # Design Rules
//!
//! 1. Stampers work on bytes only. Reading the source and writing the
//!    artifact belong to the caller.
//! 2. A stamper either returns a complete document or a `Malformed*` error.
//! 3. Nothing outside the stamp's footprint is rewritten semantically.

pub mod dispatch;
pub mod docx;
pub mod error;
pub mod ooxml;
pub mod pdf;
pub mod raster;
pub mod traits;
pub mod xlsx;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{FormatDispatcher, StamperSet};
pub use docx::DocxStamper;
pub use error::{StampError, StampResult};
pub use pdf::{read_stamp_text, PdfStamper};
pub use raster::ImageStamper;
pub use traits::Stamper;
pub use xlsx::XlsxStamper;
