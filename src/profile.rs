//! Option Profile Table: default codec options per output format.
//!
//! The table is built once on first use and never mutated, so it is shared
//! freely between batch workers. Converters look up the profile for their
//! target [`Format`] and overlay the caller's [`ConversionOptions`] on top of
//! it with [`OptionProfile::merged`]. Adding a format means adding one entry
//! here; no converter branches on format strings for defaults.

use crate::error::ConvertError;
use crate::format::Format;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Default JPEG quality when the caller supplies none.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// TIFF compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiffCompression {
    None,
    #[default]
    Lzw,
    Deflate,
    Packbits,
}

impl TiffCompression {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "raw" | "uncompressed" => Some(TiffCompression::None),
            "lzw" | "tiff_lzw" => Some(TiffCompression::Lzw),
            "deflate" | "zip" | "tiff_adobe_deflate" => Some(TiffCompression::Deflate),
            "packbits" => Some(TiffCompression::Packbits),
            _ => None,
        }
    }
}

/// Codec options applied at encode time. `None` means "codec default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionProfile {
    /// Lossy quality, 0–100.
    pub quality: Option<u8>,
    /// Spend more CPU for a smaller lossless file.
    pub optimize: Option<bool>,
    pub compression: Option<TiffCompression>,
}

/// A caller-supplied option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(i64::from(v))
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Text(v)
    }
}

/// Caller-supplied options keyed by name (`quality`, `optimize`, `compression`).
pub type ConversionOptions = BTreeMap<String, OptionValue>;

static PROFILES: Lazy<HashMap<Format, OptionProfile>> = Lazy::new(|| {
    let lossy = OptionProfile {
        quality: Some(DEFAULT_JPEG_QUALITY),
        optimize: Some(true),
        compression: None,
    };
    HashMap::from([
        (
            Format::Png,
            OptionProfile {
                optimize: Some(true),
                ..OptionProfile::default()
            },
        ),
        (Format::Jpeg, lossy),
        (Format::Bmp, OptionProfile::default()),
        (Format::Gif, OptionProfile::default()),
        (
            Format::Tiff,
            OptionProfile {
                compression: Some(TiffCompression::Lzw),
                ..OptionProfile::default()
            },
        ),
        (Format::Pdf, OptionProfile::default()),
        (Format::Docx, OptionProfile::default()),
        (Format::Html, OptionProfile::default()),
    ])
});

/// Default profile for an output format, or `None` if it is not an output format.
pub fn profile_for(format: Format) -> Option<OptionProfile> {
    PROFILES.get(&format).copied()
}

/// Clamp a requested quality into 0–100.
pub fn clamp_quality(q: i64) -> u8 {
    q.clamp(0, 100) as u8
}

impl OptionProfile {
    /// Overlay caller options on this profile.
    ///
    /// Unknown keys are ignored; a known key with the wrong value type is
    /// [`ConvertError::InvalidArguments`]. Out-of-range quality is clamped.
    pub fn merged(mut self, options: &ConversionOptions) -> Result<Self, ConvertError> {
        for (key, value) in options {
            match (key.as_str(), value) {
                ("quality", OptionValue::Int(q)) => self.quality = Some(clamp_quality(*q)),
                ("quality", other) => {
                    return Err(ConvertError::InvalidArguments(format!(
                        "quality must be an integer, got {other:?}"
                    )))
                }
                ("optimize", OptionValue::Bool(b)) => self.optimize = Some(*b),
                ("optimize", other) => {
                    return Err(ConvertError::InvalidArguments(format!(
                        "optimize must be a boolean, got {other:?}"
                    )))
                }
                ("compression", OptionValue::Text(s)) => {
                    let c = TiffCompression::parse(s).ok_or_else(|| {
                        ConvertError::InvalidArguments(format!(
                            "unknown compression '{s}' (expected lzw, deflate, packbits or none)"
                        ))
                    })?;
                    self.compression = Some(c);
                }
                ("compression", other) => {
                    return Err(ConvertError::InvalidArguments(format!(
                        "compression must be a string, got {other:?}"
                    )))
                }
                (unknown, _) => debug!("Ignoring unknown option '{}'", unknown),
            }
        }
        Ok(self)
    }
}
