//! Configuration types for batch runs and document conversions.
//!
//! Image conversion needs nothing beyond the per-request option map, but the
//! document converters (Markdown, HTML, PDF, Word) and the batch runner have
//! enough knobs that a builder is clearer than a long argument list. Defaults
//! follow what a desktop user expects with no configuration at all.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Settings for [`crate::batch::batch_convert`].
///
/// # Example
/// ```rust
/// use file_converter::BatchConfig;
///
/// let config = BatchConfig::builder().concurrency(4).build().unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Maximum conversions running at once. Default: available parallelism.
    ///
    /// Conversions are CPU-bound codec calls, so more workers than cores
    /// only adds contention. `1` processes the batch on the calling thread.
    pub concurrency: usize,

    /// Optional receiver for per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<BatchConfig, ConvertError> {
        if self.config.concurrency == 0 {
            return Err(ConvertError::InvalidArguments(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Document configuration ──────────────────────────────────────────────

/// Settings shared by the Markdown, HTML, PDF and Word converters.
///
/// Each converter reads only the fields relevant to it; the rest are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document title. Default: the input file stem.
    pub title: Option<String>,

    /// Embed the built-in stylesheet in generated HTML. Default: true.
    pub use_default_css: bool,

    /// Extra CSS appended after the built-in stylesheet.
    pub custom_css: Option<String>,

    /// Text direction. Default: unset (left-to-right, no attribute emitted).
    pub text_direction: Option<TextDirection>,

    /// External stylesheets applied when rendering HTML to PDF.
    pub stylesheets: Vec<PathBuf>,

    /// Directory that relative `<link rel="stylesheet">` hrefs resolve
    /// against. Default: the input file's directory, or the working
    /// directory for in-memory HTML.
    pub base_dir: Option<PathBuf>,

    /// PDF page size. Default: A4. A stylesheet `@page { size }` overrides it.
    pub page_size: PageSize,

    /// PDF page margin in points. Default: 56.7 (2 cm).
    pub margin_pt: f32,

    /// Body font size in points. Default: 11.
    pub font_size_pt: f32,

    /// Markdown→PDF: keep the intermediate HTML file. Default: false.
    pub keep_html: bool,

    /// Markdown→PDF: where to keep the HTML. Default: beside the PDF.
    pub html_path: Option<PathBuf>,

    /// PDF→Word: which pages to convert. Default: all.
    pub pages: PageSelection,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: None,
            use_default_css: true,
            custom_css: None,
            text_direction: None,
            stylesheets: Vec::new(),
            base_dir: None,
            page_size: PageSize::default(),
            margin_pt: 56.7,
            font_size_pt: 11.0,
            keep_html: false,
            html_path: None,
            pages: PageSelection::default(),
        }
    }
}

impl DocumentConfig {
    pub fn builder() -> DocumentConfigBuilder {
        DocumentConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DocumentConfig`].
#[derive(Debug)]
pub struct DocumentConfigBuilder {
    config: DocumentConfig,
}

impl DocumentConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn use_default_css(mut self, v: bool) -> Self {
        self.config.use_default_css = v;
        self
    }

    pub fn custom_css(mut self, css: impl Into<String>) -> Self {
        self.config.custom_css = Some(css.into());
        self
    }

    pub fn text_direction(mut self, dir: TextDirection) -> Self {
        self.config.text_direction = Some(dir);
        self
    }

    pub fn stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.stylesheets.push(path.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = Some(dir.into());
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin_pt(mut self, pt: f32) -> Self {
        self.config.margin_pt = pt;
        self
    }

    pub fn font_size_pt(mut self, pt: f32) -> Self {
        self.config.font_size_pt = pt.clamp(4.0, 72.0);
        self
    }

    pub fn keep_html(mut self, v: bool) -> Self {
        self.config.keep_html = v;
        self
    }

    pub fn html_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.html_path = Some(path.into());
        self.config.keep_html = true;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DocumentConfig, ConvertError> {
        let c = &self.config;
        let (w, h) = c.page_size.dimensions_pt();
        if !c.margin_pt.is_finite() || c.margin_pt < 0.0 || c.margin_pt * 2.0 >= w.min(h) {
            return Err(ConvertError::InvalidArguments(format!(
                "Margin {}pt leaves no printable area on a {}×{}pt page",
                c.margin_pt, w, h
            )));
        }
        if !c.font_size_pt.is_finite() {
            return Err(ConvertError::InvalidArguments(format!(
                "Font size {}pt is not a number",
                c.font_size_pt
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Writing direction of generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ltr" => Some(TextDirection::Ltr),
            "rtl" => Some(TextDirection::Rtl),
            _ => None,
        }
    }
}

/// PDF page size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    /// Width and height in points.
    Custom(f32, f32),
}

impl PageSize {
    /// Portrait width and height in PostScript points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom(w, h) => (w, h),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(PageSize::A4),
            "a5" => Some(PageSize::A5),
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            _ => None,
        }
    }

    /// Same sheet rotated to landscape.
    pub fn landscape(self) -> Self {
        let (w, h) = self.dimensions_pt();
        PageSize::Custom(w.max(h), w.min(h))
    }
}

/// Specifies which pages of a PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
