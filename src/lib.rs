//! # file-converter
//!
//! Convert files between raster image formats, PDF, Word, Markdown and HTML.
//!
//! The codecs come from the ecosystem (`image`/`tiff`, `lopdf`,
//! `pulldown-cmark`, `zip`). This crate is the layer around them that every
//! conversion shares: it validates the input before any codec runs, resolves
//! where the output goes, applies per-format encoding defaults, writes the
//! result atomically and reports a typed error when anything goes wrong.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ConversionRequest
//!  │
//!  ├─ 1. Validate  exists? regular file? extension accepted?
//!  ├─ 2. Target    output_format / output_path extension must agree
//!  ├─ 3. Profile   per-format defaults (JPEG q95, TIFF LZW, …) + caller options
//!  ├─ 4. Path      explicit path, or <input dir>/<stem>.<format>
//!  ├─ 5. Render    image / lopdf / pulldown-cmark / zip
//!  └─ 6. Write     temp file + rename, never a partial output
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use file_converter::{convert_image, markdown_to_pdf, resize_image, ConversionOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), file_converter::ConvertError> {
//!     let jpg = convert_image("photo.png", None, Some("jpg"), &ConversionOptions::new())?;
//!     resize_image(&jpg, Path::new("thumbs/photo.jpg"), Some(200), None, true)?;
//!     markdown_to_pdf("README.md", None, Some("pdf"), &ConversionOptions::new())?;
//!     Ok(())
//! }
//! ```
//!
//! Batches run through [`batch_convert`] (async) or [`batch_convert_sync`];
//! one bad file never stops the rest.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod converters;
pub mod error;
pub mod format;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod preferences;
pub mod profile;
pub mod progress;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{batch_convert, batch_convert_sync};
pub use config::{
    BatchConfig, BatchConfigBuilder, DocumentConfig, DocumentConfigBuilder, PageSelection, PageSize,
    TextDirection,
};
pub use convert::{
    convert_image, html_to_pdf, markdown_to_html, markdown_to_pdf, pdf_to_word, resize_image,
    ConversionRequest, Converter, ConverterKind,
};
pub use converters::{
    html_string_to_pdf, HtmlToPdfConverter, ImageConverter, MarkdownToHtmlConverter,
    MarkdownToPdfConverter, PdfToWordConverter,
};
pub use error::{ConvertError, ErrorKind, ItemFailure};
pub use format::{Format, FormatSpec};
pub use output::{BatchEntry, BatchResult, BatchStats, ConversionOutcome, ConversionResult};
pub use paths::{collect_inputs, resolve_output_path};
pub use preferences::Preferences;
pub use profile::{ConversionOptions, OptionProfile, OptionValue, TiffCompression};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use validate::{validate, Validation};
