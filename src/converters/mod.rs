//! One [`Converter`](crate::convert::Converter) per conversion kind.
//!
//! | Converter                   | Reads             | Writes                   |
//! |-----------------------------|-------------------|--------------------------|
//! | [`ImageConverter`]          | png jpg bmp gif tif | png jpg bmp gif tif    |
//! | [`PdfToWordConverter`]      | pdf               | docx                     |
//! | [`MarkdownToHtmlConverter`] | md markdown       | html                     |
//! | [`HtmlToPdfConverter`]      | html htm          | pdf                      |
//! | [`MarkdownToPdfConverter`]  | md markdown       | pdf                      |

pub mod html_to_pdf;
pub mod image;
pub mod md_to_html;
pub mod md_to_pdf;
pub mod pdf_to_word;

pub use html_to_pdf::{html_string_to_pdf, HtmlToPdfConverter};
pub use self::image::ImageConverter;
pub use md_to_html::MarkdownToHtmlConverter;
pub use md_to_pdf::MarkdownToPdfConverter;
pub use pdf_to_word::PdfToWordConverter;

use crate::config::DocumentConfig;
use crate::error::ConvertError;
use crate::paths::file_stem;
use std::path::Path;
use tracing::warn;

/// Read a text document, replacing invalid UTF-8 rather than failing.
pub(crate) fn read_text(path: &Path) -> Result<String, ConvertError> {
    let bytes = std::fs::read(path).map_err(|e| ConvertError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            warn!("{} is not valid UTF-8; replacing invalid bytes", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Configured title, else the input file stem.
pub(crate) fn document_title(config: &DocumentConfig, input: &Path) -> String {
    config
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| file_stem(input))
}
