use std::fs;
use std::path::{Path, PathBuf};

use ordina_render::{Seal, StampStyle};
use ordina_types::ProtocolFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Engine settings, usually read from `ordina.toml`.
///
/// Every field has a default, so a file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// UI theme name. Carried for front-ends, ignored by the engine.
    pub theme: String,
    /// Stamped artifacts land in `<output_root>/<year>/`.
    pub output_root: PathBuf,
    /// Holds `sequence.json` and the `history/` ledger.
    pub state_dir: PathBuf,
    pub protocol_format: ProtocolFormat,
    pub stamp: StampStyleConfig,
}

/// The `[stamp]` table: the visual style plus the seal file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampStyleConfig {
    #[serde(flatten)]
    pub style: StampStyle,
    /// Raster composited next to the stamp text.
    pub seal_path: Option<PathBuf>,
}

impl EngineConfig {
    pub const SEQUENCE_FILE: &'static str = "sequence.json";
    pub const HISTORY_DIR: &'static str = "history";

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Static checks. The seal file is only touched by [`load_seal`](Self::load_seal).
    pub fn validate(&self) -> EngineResult<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig("output_root is empty".into()));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig("state_dir is empty".into()));
        }
        self.stamp
            .style
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Read and thumbnail the configured seal, if any.
    pub fn load_seal(&self) -> EngineResult<Option<Seal>> {
        let Some(path) = &self.stamp.seal_path else {
            return Ok(None);
        };
        let bytes = fs::read(path).map_err(|e| {
            EngineError::InvalidConfig(format!("seal {} cannot be read: {e}", path.display()))
        })?;
        let seal = Seal::from_bytes(&bytes, self.stamp.style.seal_max_edge).map_err(|e| {
            EngineError::InvalidConfig(format!("seal {}: {e}", path.display()))
        })?;
        Ok(Some(seal))
    }

    pub fn sequence_path(&self) -> PathBuf {
        self.state_dir.join(Self::SEQUENCE_FILE)
    }

    pub fn history_dir(&self) -> PathBuf {
        self.state_dir.join(Self::HISTORY_DIR)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            output_root: PathBuf::from("./Protocolli"),
            state_dir: PathBuf::from("./.ordina"),
            protocol_format: ProtocolFormat::default(),
            stamp: StampStyleConfig::default(),
        }
    }
}
