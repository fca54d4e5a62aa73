//! PDF → DOCX via text extraction.
//!
//! Only the text layer survives: each selected page's text, line by line,
//! with a page break between pages. Scanned PDFs without a text layer
//! produce empty pages.

use crate::config::DocumentConfig;
use crate::convert::{Converter, ConverterKind, RenderJob};
use crate::converters::document_title;
use crate::error::ConvertError;
use crate::format::{FormatSpec, DOCX_FORMATS, PDF_FORMATS};
use crate::pipeline::docx::build_docx;
use lopdf::Document;
use tracing::{debug, warn};

/// Converts PDF documents into editable Word documents.
#[derive(Debug, Clone, Default)]
pub struct PdfToWordConverter {
    config: DocumentConfig,
}

impl PdfToWordConverter {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }
}

impl Converter for PdfToWordConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::PdfToWord
    }

    fn input_formats(&self) -> FormatSpec {
        PDF_FORMATS
    }

    fn output_formats(&self) -> FormatSpec {
        DOCX_FORMATS
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError> {
        let doc = Document::load(job.input).map_err(|e| ConvertError::failed(job.input, e))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total = page_numbers.len();

        let indices = self.config.pages.to_indices(total);
        if indices.is_empty() {
            return Err(ConvertError::InvalidArguments(format!(
                "Page selection {:?} matches none of the {} pages in '{}'",
                self.config.pages,
                total,
                job.input.display()
            )));
        }
        debug!("Extracting {} of {} pages from {}", indices.len(), total, job.input.display());

        let pages: Vec<String> = indices
            .iter()
            .map(|&i| {
                let number = page_numbers[i];
                doc.extract_text(&[number]).unwrap_or_else(|e| {
                    warn!("Page {} of {}: text extraction failed: {}", number, job.input.display(), e);
                    String::new()
                })
            })
            .collect();

        let title = document_title(&self.config, job.input);
        build_docx(&pages, &title).map_err(|e| ConvertError::failed(job.input, e))
    }
}
