use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Container formats the engine knows how to stamp.
///
/// Closed on purpose: every consumer matches exhaustively, so adding a variant
/// is a compile error until each handler exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// PNG or JPEG raster.
    Image,
    /// PDF page-object graph.
    Pdf,
    /// WordprocessingML package (`.docx`).
    OfficeText,
    /// SpreadsheetML package (`.xlsx`).
    OfficeSheet,
}

impl DocumentFormat {
    /// All variants, in dispatch order.
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Image,
        DocumentFormat::Pdf,
        DocumentFormat::OfficeText,
        DocumentFormat::OfficeSheet,
    ];

    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::OfficeText),
            "xlsx" => Some(Self::OfficeSheet),
            _ => None,
        }
    }

    /// Map a path to a format by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Pdf => write!(f, "pdf"),
            Self::OfficeText => write!(f, "office-text"),
            Self::OfficeSheet => write!(f, "office-sheet"),
        }
    }
}

/// Corner of the page or image that receives the stamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StampPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl StampPosition {
    pub fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    /// Top-left corner `(x, y)` of a `width`×`height` box placed in this corner
    /// of a `outer_width`×`outer_height` area with `margin` on both axes, in a
    /// y-down coordinate system. Clamps to 0 when the box does not fit.
    pub fn place(
        self,
        outer_width: u32,
        outer_height: u32,
        width: u32,
        height: u32,
        margin: u32,
    ) -> (u32, u32) {
        let x = if self.is_left() {
            margin
        } else {
            outer_width.saturating_sub(width).saturating_sub(margin)
        };
        let y = if self.is_top() {
            margin
        } else {
            outer_height.saturating_sub(height).saturating_sub(margin)
        };
        (x, y)
    }
}

impl fmt::Display for StampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        };
        f.write_str(name)
    }
}

impl FromStr for StampPosition {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            _ => Err(TypeError::InvalidPosition(s.to_string())),
        }
    }
}
