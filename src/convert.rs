//! The shared conversion pipeline and the one-call entry points.
//!
//! Every converter kind runs the same five steps, implemented once in
//! [`Converter::convert`]:
//!
//! ```text
//! request ──▶ validate input ──▶ resolve target ──▶ merge profile ──▶ render ──▶ atomic write
//!             (FileNotFound /     (format token +    (OptionProfile    (external    (IoWrite)
//!              UnsupportedFormat)  output path)       + caller opts)    codec)
//! ```
//!
//! Everything before `render` is validation: an error there is returned
//! before any codec runs and before any byte of output is written. A
//! converter only supplies [`Converter::render`], which turns the input into
//! encoded bytes and translates its library's errors into
//! [`ConvertError::ConversionFailed`].

use crate::config::DocumentConfig;
use crate::converters::{
    HtmlToPdfConverter, ImageConverter, MarkdownToHtmlConverter, MarkdownToPdfConverter,
    PdfToWordConverter,
};
use crate::error::ConvertError;
use crate::format::{extension_of, normalize_token, Format, FormatSpec};
use crate::output::ConversionResult;
use crate::paths::{prepare_explicit_output, resolve_output_path, write_atomic};
use crate::profile::{profile_for, ConversionOptions, OptionProfile, OptionValue};
use crate::validate::validate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The five conversion kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConverterKind {
    Image,
    PdfToWord,
    MarkdownToHtml,
    HtmlToPdf,
    MarkdownToPdf,
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConverterKind::Image => "image",
            ConverterKind::PdfToWord => "pdf→docx",
            ConverterKind::MarkdownToHtml => "markdown→html",
            ConverterKind::HtmlToPdf => "html→pdf",
            ConverterKind::MarkdownToPdf => "markdown→pdf",
        };
        f.write_str(name)
    }
}

/// One conversion to perform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    /// Used verbatim when present.
    pub output_path: Option<PathBuf>,
    /// Format token such as `"jpg"`; derived from `output_path` when absent.
    pub output_format: Option<String>,
    pub options: ConversionOptions,
}

impl ConversionRequest {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Self::default()
        }
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// The normalised output format token this request asks for.
    ///
    /// At least one of `output_path` / `output_format` must be set; when both
    /// are, they must name the same [`Format`] (`jpg` and `jpeg` agree).
    pub fn target_token(&self) -> Result<String, ConvertError> {
        let from_path = self.output_path.as_deref().map(extension_of);
        let requested = self
            .output_format
            .as_deref()
            .map(normalize_token)
            .filter(|t| !t.is_empty());

        match (from_path, requested) {
            (None, None) => Err(ConvertError::UnsupportedFormat(
                "Either output_path or output_format must be specified".into(),
            )),
            (Some(None), None) => Err(ConvertError::UnsupportedFormat(format!(
                "Cannot determine output format: '{}' has no extension",
                self.output_path.as_deref().unwrap_or(Path::new("")).display()
            ))),
            (Some(Some(ext)), None) => Ok(ext),
            (None, Some(fmt)) | (Some(None), Some(fmt)) => Ok(fmt),
            (Some(Some(ext)), Some(fmt)) => {
                let same = ext == fmt
                    || matches!(
                        (Format::from_token(&ext), Format::from_token(&fmt)),
                        (Some(a), Some(b)) if a == b
                    );
                if same {
                    Ok(ext)
                } else {
                    Err(ConvertError::InvalidArguments(format!(
                        "output_path extension '.{ext}' disagrees with output_format '{fmt}'"
                    )))
                }
            }
        }
    }
}

/// Everything a converter needs to produce its output bytes.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub input: &'a Path,
    /// Final destination; bytes are written there by the pipeline.
    pub output: &'a Path,
    pub format: Format,
    pub profile: OptionProfile,
}

/// What [`Converter::render_all`] produced: the main output plus side files
/// that are written only once the main output is in place.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub companions: Vec<(PathBuf, Vec<u8>)>,
}

impl From<Vec<u8>> for Rendered {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            companions: Vec::new(),
        }
    }
}

/// A component wrapping one external codec to perform one conversion kind.
pub trait Converter: Send + Sync {
    fn kind(&self) -> ConverterKind;

    /// Extensions this converter reads.
    fn input_formats(&self) -> FormatSpec;

    /// Extensions this converter writes.
    fn output_formats(&self) -> FormatSpec;

    /// Transform the validated input into encoded output bytes.
    ///
    /// Library errors must be translated into [`ConvertError`] here; nothing
    /// library-specific may escape.
    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError>;

    /// [`render`](Self::render) plus any companion files. Override when a
    /// conversion leaves something besides its main output behind.
    fn render_all(&self, job: &RenderJob<'_>) -> Result<Rendered, ConvertError> {
        self.render(job).map(Rendered::from)
    }

    /// Run the full validate → resolve → merge → render → write pipeline.
    fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        run_pipeline(self, request)
    }
}

fn run_pipeline<C: Converter + ?Sized>(
    converter: &C,
    request: &ConversionRequest,
) -> ConversionResult {
    let input = request.input_path.as_path();
    debug!("[{}] converting {}", converter.kind(), input.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    validate(input, &converter.input_formats())?.into_result(input)?;

    // ── Step 2: Resolve target format ────────────────────────────────────
    let token = request.target_token()?;
    let outputs = converter.output_formats();
    let format = Format::from_token(&token)
        .filter(|_| outputs.contains(&token))
        .ok_or_else(|| {
            ConvertError::UnsupportedFormat(format!(
                "Unsupported output format: {}. Supported formats are: {}",
                token,
                outputs.describe()
            ))
        })?;

    // ── Step 3: Merge caller options over the profile ────────────────────
    let profile = profile_for(format)
        .unwrap_or_default()
        .merged(&request.options)?;
    debug!("Profile for {}: {:?}", format, profile);

    // ── Step 4: Resolve output path ──────────────────────────────────────
    let output = match &request.output_path {
        Some(p) => prepare_explicit_output(p)?,
        None => resolve_output_path(input, None, &token)?,
    };

    // ── Step 5: Render and write atomically ──────────────────────────────
    let job = RenderJob {
        input,
        output: &output,
        format,
        profile,
    };
    let rendered = converter.render_all(&job)?;
    write_atomic(&output, &rendered.bytes)?;
    for (path, bytes) in &rendered.companions {
        let path = prepare_explicit_output(path)?;
        write_atomic(&path, bytes)?;
        info!("Wrote companion {}", path.display());
    }

    info!("Converted {} to {}", input.display(), output.display());
    Ok(output)
}

// ── One-call entry points ────────────────────────────────────────────────

fn request_for(
    input: &Path,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionRequest {
    ConversionRequest {
        input_path: input.to_path_buf(),
        output_path: output_path.map(Path::to_path_buf),
        output_format: output_format.map(str::to_string),
        options: options.clone(),
    }
}

/// Convert between PNG, JPEG, BMP, GIF and TIFF.
///
/// # Example
/// ```rust,no_run
/// use file_converter::{convert_image, ConversionOptions};
///
/// let mut options = ConversionOptions::new();
/// options.insert("quality".into(), 80.into());
/// let out = convert_image("photo.png", None, Some("jpg"), &options)?;
/// assert!(out.ends_with("photo.jpg"));
/// # Ok::<(), file_converter::ConvertError>(())
/// ```
pub fn convert_image(
    input: impl AsRef<Path>,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionResult {
    ImageConverter::new().convert(&request_for(
        input.as_ref(),
        output_path,
        output_format,
        options,
    ))
}

/// Resize an image; see [`ImageConverter::resize`].
pub fn resize_image(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    width: Option<u32>,
    height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> ConversionResult {
    ImageConverter::new().resize(
        input.as_ref(),
        output.as_ref(),
        width,
        height,
        maintain_aspect_ratio,
    )
}

/// Convert a PDF into an editable Word document.
pub fn pdf_to_word(
    input: impl AsRef<Path>,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionResult {
    PdfToWordConverter::new(DocumentConfig::default()).convert(&request_for(
        input.as_ref(),
        output_path,
        output_format,
        options,
    ))
}

/// Render a Markdown file as a standalone HTML document.
pub fn markdown_to_html(
    input: impl AsRef<Path>,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionResult {
    MarkdownToHtmlConverter::new(DocumentConfig::default()).convert(&request_for(
        input.as_ref(),
        output_path,
        output_format,
        options,
    ))
}

/// Lay out an HTML file as a PDF.
pub fn html_to_pdf(
    input: impl AsRef<Path>,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionResult {
    HtmlToPdfConverter::new(DocumentConfig::default()).convert(&request_for(
        input.as_ref(),
        output_path,
        output_format,
        options,
    ))
}

/// Render Markdown to HTML, then lay the HTML out as a PDF.
pub fn markdown_to_pdf(
    input: impl AsRef<Path>,
    output_path: Option<&Path>,
    output_format: Option<&str>,
    options: &ConversionOptions,
) -> ConversionResult {
    MarkdownToPdfConverter::new(DocumentConfig::default()).convert(&request_for(
        input.as_ref(),
        output_path,
        output_format,
        options,
    ))
}
