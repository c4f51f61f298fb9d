use ordina_render::StampBuffer;
use ordina_types::{DocumentFormat, StampPosition};

use crate::error::StampResult;

/// Embeds a rendered stamp into one container format.
///
/// All implementations must satisfy these invariants:
/// - `apply` is a pure function of its inputs: it never touches the
///   filesystem, and the same inputs produce the same output bytes.
/// - Content outside the stamp's footprint survives unchanged (pixels,
///   pages 2..N, body text, untouched cells).
/// - Input the stamper cannot understand yields the format's `Malformed*`
///   error, never a partially stamped output.
pub trait Stamper: Send + Sync {
    /// The container format this stamper handles.
    fn format(&self) -> DocumentFormat;

    /// Stamp `source` and return the new document bytes.
    fn apply(
        &self,
        source: &[u8],
        stamp: &StampBuffer,
        position: StampPosition,
    ) -> StampResult<Vec<u8>>;
}
