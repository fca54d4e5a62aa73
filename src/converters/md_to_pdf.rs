//! Markdown → PDF, through an in-memory HTML document.

use crate::config::DocumentConfig;
use crate::convert::{Converter, ConverterKind, RenderJob, Rendered};
use crate::converters::html_to_pdf::render_html;
use crate::converters::{document_title, read_text};
use crate::error::ConvertError;
use crate::format::{FormatSpec, MARKDOWN_FORMATS, PDF_FORMATS};
use crate::pipeline::markdown::render_document;
use std::path::Path;
use tracing::debug;

/// Markdown → HTML → PDF.
///
/// The intermediate HTML stays in memory unless
/// [`DocumentConfig::keep_html`] is set, in which case it is written to
/// [`DocumentConfig::html_path`] or beside the PDF with an `.html` extension.
/// It is only written once the PDF itself has been written.
#[derive(Debug, Clone, Default)]
pub struct MarkdownToPdfConverter {
    config: DocumentConfig,
}

impl MarkdownToPdfConverter {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }
}

impl Converter for MarkdownToPdfConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::MarkdownToPdf
    }

    fn input_formats(&self) -> FormatSpec {
        MARKDOWN_FORMATS
    }

    fn output_formats(&self) -> FormatSpec {
        PDF_FORMATS
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError> {
        self.render_all(job).map(|r| r.bytes)
    }

    fn render_all(&self, job: &RenderJob<'_>) -> Result<Rendered, ConvertError> {
        let markdown = read_text(job.input)?;
        let title = document_title(&self.config, job.input);
        let html = render_document(&markdown, &title, &self.config);
        let base = job.input.parent().unwrap_or(Path::new("."));
        let pdf = render_html(&html, &title, &self.config, job.input, base)?;

        let mut rendered = Rendered::from(pdf);
        if self.config.keep_html {
            let html_path = self
                .config
                .html_path
                .clone()
                .unwrap_or_else(|| job.output.with_extension("html"));
            debug!("Keeping intermediate HTML at {}", html_path.display());
            rendered.companions.push((html_path, html.into_bytes()));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionRequest;
    use crate::error::ErrorKind;
    use lopdf::Document;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir) -> PathBuf {
        let input = dir.path().join("guide.md");
        std::fs::write(&input, "# Guide\n\nRead *carefully*.\n\n- one\n- two\n").unwrap();
        input
    }

    #[test]
    fn intermediate_html_not_kept_by_default() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);

        let out = MarkdownToPdfConverter::default()
            .convert(&ConversionRequest::new(&input).output_format("pdf"))
            .unwrap();
        assert_eq!(out, dir.path().join("guide.pdf"));
        assert!(!dir.path().join("guide.html").exists());

        let doc = Document::load(&out).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("Guide"), "{text}");
        assert!(text.contains("carefully"), "{text}");
    }

    #[test]
    fn keep_html_beside_output() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let config = DocumentConfig::builder().keep_html(true).build().unwrap();

        let out = MarkdownToPdfConverter::new(config)
            .convert(&ConversionRequest::new(&input).output_path(dir.path().join("out/g.pdf")))
            .unwrap();
        assert!(out.is_file());
        let html = std::fs::read_to_string(dir.path().join("out/g.html")).unwrap();
        assert!(html.contains(r#"<h1 id="guide">Guide</h1>"#));
    }

    #[test]
    fn keep_html_at_explicit_path() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        let html_path = dir.path().join("kept/inter.html");
        let config = DocumentConfig::builder().html_path(&html_path).build().unwrap();

        MarkdownToPdfConverter::new(config)
            .convert(&ConversionRequest::new(&input).output_format("pdf"))
            .unwrap();
        assert!(html_path.is_file());
    }

    #[test]
    fn failed_pdf_write_leaves_no_html() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir);
        // A directory squatting on the PDF path makes the final rename fail.
        let squatter = dir.path().join("out/g.pdf");
        std::fs::create_dir_all(&squatter).unwrap();
        std::fs::write(squatter.join("keep"), "x").unwrap();
        let config = DocumentConfig::builder().keep_html(true).build().unwrap();

        let err = MarkdownToPdfConverter::new(config)
            .convert(&ConversionRequest::new(&input).output_path(&squatter))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoWrite);
        assert!(!dir.path().join("out/g.html").exists());
    }
}
