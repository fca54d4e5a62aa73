//! Format tokens and per-converter format sets.
//!
//! A *token* is what users type or what appears after the dot of a file name
//! (`"jpg"`, `".JPEG"`, `"tif"`). Tokens are normalised (lower-cased, leading
//! dot stripped) before every comparison. Several tokens can name the same
//! [`Format`]; the token itself is preserved for output file names so a
//! caller asking for `jpeg` gets `photo.jpeg`, not `photo.jpg`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Normalise a format token: trim, strip one leading dot, lower-case.
pub fn normalize_token(token: &str) -> String {
    let t = token.trim();
    t.strip_prefix('.').unwrap_or(t).to_ascii_lowercase()
}

/// Normalised extension of `path`, or `None` if it has none.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_token)
        .filter(|e| !e.is_empty())
}

/// Every file format the crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Format {
    Png,
    Jpeg,
    Bmp,
    Gif,
    Tiff,
    Pdf,
    Docx,
    Markdown,
    Html,
}

impl Format {
    pub const ALL: [Format; 9] = [
        Format::Png,
        Format::Jpeg,
        Format::Bmp,
        Format::Gif,
        Format::Tiff,
        Format::Pdf,
        Format::Docx,
        Format::Markdown,
        Format::Html,
    ];

    /// Tokens that name this format. The first one is canonical.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            Format::Png => &["png"],
            Format::Jpeg => &["jpg", "jpeg"],
            Format::Bmp => &["bmp"],
            Format::Gif => &["gif"],
            Format::Tiff => &["tiff", "tif"],
            Format::Pdf => &["pdf"],
            Format::Docx => &["docx"],
            Format::Markdown => &["md", "markdown"],
            Format::Html => &["html", "htm"],
        }
    }

    pub fn canonical_extension(self) -> &'static str {
        self.tokens()[0]
    }

    /// Look up a format by token, case-insensitively and ignoring a leading dot.
    pub fn from_token(token: &str) -> Option<Format> {
        let t = normalize_token(token);
        Format::ALL
            .into_iter()
            .find(|f| f.tokens().contains(&t.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        extension_of(path).and_then(|e| Format::from_token(&e))
    }

    /// Whether the encoder can store an alpha channel.
    ///
    /// Only meaningful for raster formats; document formats return `false`.
    pub fn supports_transparency(self) -> bool {
        matches!(self, Format::Png | Format::Gif | Format::Tiff | Format::Bmp)
    }

    pub fn is_raster(self) -> bool {
        matches!(
            self,
            Format::Png | Format::Jpeg | Format::Bmp | Format::Gif | Format::Tiff
        )
    }

    /// The `image` crate format for raster variants.
    pub fn image_format(self) -> Option<image::ImageFormat> {
        match self {
            Format::Png => Some(image::ImageFormat::Png),
            Format::Jpeg => Some(image::ImageFormat::Jpeg),
            Format::Bmp => Some(image::ImageFormat::Bmp),
            Format::Gif => Some(image::ImageFormat::Gif),
            Format::Tiff => Some(image::ImageFormat::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_extension())
    }
}

/// An immutable set of recognised format tokens owned by one converter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    tokens: &'static [&'static str],
}

impl FormatSpec {
    /// Build a spec from already-normalised, lower-case tokens.
    pub const fn new(tokens: &'static [&'static str]) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &'static [&'static str] {
        self.tokens
    }

    /// Case-insensitive membership test that ignores a leading dot.
    pub fn contains(&self, token: &str) -> bool {
        let t = normalize_token(token);
        self.tokens.iter().any(|k| *k == t)
    }

    /// Whether `path`'s extension is a member of this set.
    pub fn accepts_path(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|e| self.contains(&e))
    }

    /// Comma-separated token list for error messages.
    pub fn describe(&self) -> String {
        self.tokens.join(", ")
    }
}

pub const IMAGE_FORMATS: FormatSpec =
    FormatSpec::new(&["png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif"]);
pub const PDF_FORMATS: FormatSpec = FormatSpec::new(&["pdf"]);
pub const DOCX_FORMATS: FormatSpec = FormatSpec::new(&["docx"]);
pub const MARKDOWN_FORMATS: FormatSpec = FormatSpec::new(&["md", "markdown"]);
pub const HTML_FORMATS: FormatSpec = FormatSpec::new(&["html", "htm"]);
/// Output side of the Markdown→HTML converter: documents are always `.html`.
pub const HTML_OUTPUT_FORMATS: FormatSpec = FormatSpec::new(&["html"]);
