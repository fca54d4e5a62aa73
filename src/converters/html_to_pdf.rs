//! HTML → PDF.
//!
//! Page settings are resolved in this order, later sources winning:
//! [`DocumentConfig`] defaults, then `<style>` blocks in document order, then
//! `<link rel="stylesheet">` files, then the configured external stylesheets
//! in the order they were added.
//!
//! Linked hrefs resolve against [`DocumentConfig::base_dir`], defaulting to
//! the input's directory (the working directory for [`html_string_to_pdf`]).
//! Hrefs with a URL scheme are skipped, as are linked files that cannot be
//! read. A configured stylesheet that cannot be read is an error.
//!
//! Text direction is the exception: an explicit
//! [`DocumentConfig::text_direction`] always wins, then CSS `direction`, then
//! a `dir` attribute on `<html>`/`<body>`.

use crate::config::{DocumentConfig, TextDirection};
use crate::convert::{Converter, ConverterKind, RenderJob};
use crate::converters::{document_title, read_text};
use crate::error::ConvertError;
use crate::format::{Format, FormatSpec, HTML_FORMATS, PDF_FORMATS};
use crate::output::ConversionResult;
use crate::paths::{file_stem, prepare_explicit_output, write_atomic};
use crate::pipeline::html_text::{parse_document, HtmlDocument};
use crate::pipeline::pdf_layout::{render_pdf, LayoutSettings};
use crate::pipeline::stylesheet::{parse_css, PageStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lays out HTML files as PDF documents.
#[derive(Debug, Clone, Default)]
pub struct HtmlToPdfConverter {
    config: DocumentConfig,
}

impl HtmlToPdfConverter {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }
}

impl Converter for HtmlToPdfConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::HtmlToPdf
    }

    fn input_formats(&self) -> FormatSpec {
        HTML_FORMATS
    }

    fn output_formats(&self) -> FormatSpec {
        PDF_FORMATS
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError> {
        let html = read_text(job.input)?;
        let fallback = document_title(&self.config, job.input);
        let base = job.input.parent().unwrap_or(Path::new("."));
        render_html(&html, &fallback, &self.config, job.input, base)
    }
}

/// Render an in-memory HTML string to a PDF file at `output`.
///
/// The title comes from the configuration, then `<title>`, then the output
/// file stem.
pub fn html_string_to_pdf(html: &str, output: &Path, config: &DocumentConfig) -> ConversionResult {
    if Format::from_path(output) != Some(Format::Pdf) {
        return Err(ConvertError::UnsupportedFormat(format!(
            "Unsupported output format for '{}'. Supported formats are: {}",
            output.display(),
            PDF_FORMATS.describe()
        )));
    }
    let output = prepare_explicit_output(output)?;

    let fallback = config
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| file_stem(&output));
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let bytes = render_html(html, &fallback, config, &output, &cwd)?;
    write_atomic(&output, &bytes)?;

    info!("Rendered HTML string to {}", output.display());
    Ok(output)
}

/// Lay out `html` and return PDF bytes. `origin` names the document in errors;
/// `base` is where linked stylesheets are looked up unless the configuration
/// names a base directory.
pub(crate) fn render_html(
    html: &str,
    fallback_title: &str,
    config: &DocumentConfig,
    origin: &Path,
    base: &Path,
) -> Result<Vec<u8>, ConvertError> {
    let doc = parse_document(html);
    let base = config.base_dir.as_deref().unwrap_or(base);
    let settings = resolve_settings(&doc, fallback_title, config, base)?;
    debug!(
        "Page {}x{}pt, margin {}pt, font {}pt, {:?}",
        settings.page_width, settings.page_height, settings.margin, settings.font_size, settings.direction
    );

    debug!("Extracted {} text blocks from {}", doc.blocks.len(), origin.display());
    render_pdf(&doc.blocks, &settings).map_err(|e| ConvertError::failed(origin, e))
}

fn resolve_settings(
    doc: &HtmlDocument,
    fallback_title: &str,
    config: &DocumentConfig,
    base: &Path,
) -> Result<LayoutSettings, ConvertError> {
    let mut style = PageStyle::default();
    for css in &doc.styles {
        style.merge(parse_css(css));
    }
    for href in &doc.stylesheet_links {
        if let Some(css) = read_linked_stylesheet(href, base) {
            style.merge(parse_css(&css));
        }
    }
    for sheet in &config.stylesheets {
        style.merge(parse_css(&read_stylesheet(sheet)?));
    }

    let (page_width, page_height) = style.page_size.unwrap_or(config.page_size).dimensions_pt();

    let (mut margin, source) = match style.margin_pt {
        Some(m) => (m, "Stylesheet"),
        None => (config.margin_pt, "Configured"),
    };
    if margin * 2.0 >= page_width.min(page_height) {
        let fallback = config.margin_pt.min(page_width.min(page_height) / 4.0);
        warn!(
            "{} margin {}pt leaves no printable area; using {}pt",
            source, margin, fallback
        );
        margin = fallback;
    }

    let font_size = style
        .font_size_pt
        .unwrap_or(config.font_size_pt)
        .clamp(4.0, 72.0);

    let direction = config
        .text_direction
        .or(style.direction)
        .or(doc.direction)
        .unwrap_or(TextDirection::Ltr);

    let title = if config.title.as_deref().is_some_and(|t| !t.trim().is_empty()) {
        fallback_title.to_string()
    } else {
        doc.title.clone().unwrap_or_else(|| fallback_title.to_string())
    };

    Ok(LayoutSettings {
        page_width,
        page_height,
        margin,
        font_size,
        direction,
        title,
    })
}

fn read_linked_stylesheet(href: &str, base: &Path) -> Option<String> {
    let href = href.trim();
    if has_scheme(href) {
        debug!("Skipping non-local stylesheet {}", href);
        return None;
    }
    // Query and fragment never name part of a file.
    let file = href.split(['?', '#']).next().unwrap_or(href);
    let path = base.join(file);
    match read_stylesheet(&path) {
        Ok(css) => {
            debug!("Linked stylesheet {}", path.display());
            Some(css)
        }
        Err(e) => {
            warn!("Skipping linked stylesheet: {}", e);
            None
        }
    }
}

/// `true` for `https://…`, `data:…` and the like. Single letters are drive
/// names, not schemes.
fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => href.starts_with("//"),
    }
}

fn read_stylesheet(path: &Path) -> Result<String, ConvertError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
            path: path.to_path_buf(),
            reason: format!("Stylesheet does not exist: {}", path.display()),
        },
        _ => ConvertError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
