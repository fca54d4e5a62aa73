//! User defaults persisted as pretty-printed JSON.
//!
//! Nothing is loaded implicitly: a front-end calls [`Preferences::load`] at
//! start-up and [`Preferences::save`] when the user changes a setting.

use crate::config::{BatchConfig, DocumentConfig, PageSize, TextDirection};
use crate::error::ConvertError;
use crate::paths::{prepare_explicit_output, write_atomic};
use crate::profile::{ConversionOptions, OptionValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_NAME: &str = ".fileconverter_prefs.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Where batch output goes. `None` means beside each input.
    pub output_dir: Option<PathBuf>,
    /// Preferred target token for image conversion.
    pub image_format: String,
    pub jpeg_quality: u8,
    pub optimize: bool,
    pub maintain_aspect_ratio: bool,
    pub text_direction: Option<TextDirection>,
    pub page_size: PageSize,
    /// `None` means available parallelism.
    pub concurrency: Option<usize>,
    pub last_input_dir: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            output_dir: None,
            image_format: "png".to_string(),
            jpeg_quality: 95,
            optimize: true,
            maintain_aspect_ratio: true,
            text_direction: None,
            page_size: PageSize::A4,
            concurrency: None,
            last_input_dir: None,
        }
    }
}

impl Preferences {
    /// `~/.fileconverter_prefs.json`, or `None` when the platform reports no
    /// home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(FILE_NAME))
    }

    /// Load from `path`. A missing file yields the defaults; unknown fields
    /// are ignored and missing ones take their default.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConvertError::Unreadable {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&text).map_err(|e| {
            ConvertError::InvalidArguments(format!(
                "Malformed preferences file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConvertError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| ConvertError::InvalidArguments(format!("Cannot serialise preferences: {e}")))?;
        let path = prepare_explicit_output(path)?;
        write_atomic(&path, &json)
    }

    /// Image options implied by these preferences.
    pub fn image_options(&self) -> ConversionOptions {
        let mut options = ConversionOptions::new();
        options.insert("quality".into(), OptionValue::Int(i64::from(self.jpeg_quality)));
        options.insert("optimize".into(), OptionValue::Bool(self.optimize));
        options
    }

    pub fn document_config(&self) -> DocumentConfig {
        DocumentConfig {
            text_direction: self.text_direction,
            page_size: self.page_size,
            ..DocumentConfig::default()
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        let mut config = BatchConfig::default();
        if let Some(n) = self.concurrency.filter(|&n| n > 0) {
            config.concurrency = n;
        }
        config
    }
}
