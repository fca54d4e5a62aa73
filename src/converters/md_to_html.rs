//! Markdown → standalone HTML5, with the default stylesheet and highlighted
//! code blocks unless disabled.

use crate::config::DocumentConfig;
use crate::convert::{Converter, ConverterKind, RenderJob};
use crate::converters::{document_title, read_text};
use crate::error::ConvertError;
use crate::format::{FormatSpec, HTML_OUTPUT_FORMATS, MARKDOWN_FORMATS};
use crate::pipeline::markdown::render_document;
use tracing::debug;

/// Renders Markdown files as standalone HTML5 documents.
#[derive(Debug, Clone, Default)]
pub struct MarkdownToHtmlConverter {
    config: DocumentConfig,
}

impl MarkdownToHtmlConverter {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }
}

impl Converter for MarkdownToHtmlConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::MarkdownToHtml
    }

    fn input_formats(&self) -> FormatSpec {
        MARKDOWN_FORMATS
    }

    fn output_formats(&self) -> FormatSpec {
        HTML_OUTPUT_FORMATS
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError> {
        let markdown = read_text(job.input)?;
        let title = document_title(&self.config, job.input);
        let html = render_document(&markdown, &title, &self.config);
        debug!("Rendered {} bytes of HTML from {}", html.len(), job.input.display());
        Ok(html.into_bytes())
    }
}
