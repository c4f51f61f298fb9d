use ordina_types::{Rgb, StampPosition};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::template;

/// User-facing stamp configuration.
///
/// Missing fields take their defaults, so a partial config section overlays
/// the built-in look instead of replacing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampStyle {
    /// Text template; `\n` separates lines.
    pub template: String,
    pub position: StampPosition,
    pub font_family: String,
    /// Point size.
    pub font_size: f32,
    pub color: Rgb,
    /// Substituted for `{location}`.
    pub location: Option<String>,
    /// Longest edge of the seal after thumbnailing, in pixels.
    pub seal_max_edge: u32,
}

impl StampStyle {
    pub const DEFAULT_TEMPLATE: &'static str = "Prot. N° {number}\n{date} {time}";

    /// Check the style before any number is allocated.
    pub fn validate(&self) -> RenderResult<()> {
        if self.template.trim().is_empty() {
            return Err(RenderError::InvalidStyle("template is empty".into()));
        }
        let names = template::placeholders(&self.template);
        if let Some(unknown) = names.iter().find(|n| !template::KNOWN.contains(*n)) {
            return Err(RenderError::InvalidStyle(format!(
                "unknown placeholder {{{unknown}}} in template"
            )));
        }
        if !names.contains(&"number") {
            return Err(RenderError::InvalidStyle(
                "template must contain {number}".into(),
            ));
        }
        if self.font_family.trim().is_empty() {
            return Err(RenderError::InvalidStyle("font family is empty".into()));
        }
        if !self.font_size.is_finite() || !(4.0..=144.0).contains(&self.font_size) {
            return Err(RenderError::InvalidStyle(format!(
                "font size {} outside 4..=144 pt",
                self.font_size
            )));
        }
        if !(16..=2000).contains(&self.seal_max_edge) {
            return Err(RenderError::InvalidStyle(format!(
                "seal max edge {} outside 16..=2000 px",
                self.seal_max_edge
            )));
        }
        Ok(())
    }
}

impl Default for StampStyle {
    fn default() -> Self {
        Self {
            template: Self::DEFAULT_TEMPLATE.to_string(),
            position: StampPosition::BottomRight,
            font_family: "Arial".to_string(),
            font_size: 12.0,
            color: Rgb::RED,
            location: None,
            seal_max_edge: 200,
        }
    }
}
