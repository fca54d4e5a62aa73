//! Raster image conversion and resizing via the `image` and `tiff` crates.
//!
//! ## Pixel normalisation
//!
//! Decoders hand back whatever layout the file stored: palette images arrive
//! expanded to RGB(A), CMYK JPEGs arrive as RGB, 16-bit PNGs arrive as
//! 16-bit buffers. Before encoding, everything that is not already 8-bit
//! gray/RGB (with or without alpha) is normalised to 8-bit RGB(A), so every
//! encoder sees one of four layouts it supports.
//!
//! ## Flattening
//!
//! JPEG has no alpha channel. Dropping alpha leaves whatever colour the
//! fully-transparent pixels happened to carry (often black), so images with
//! alpha are composited onto opaque white before a JPEG encode.

use crate::convert::{Converter, ConverterKind, RenderJob};
use crate::error::ConvertError;
use crate::format::{Format, FormatSpec, IMAGE_FORMATS};
use crate::output::ConversionResult;
use crate::paths::{prepare_explicit_output, write_atomic};
use crate::profile::{profile_for, OptionProfile, TiffCompression, DEFAULT_JPEG_QUALITY};
use crate::validate::validate;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tiff::encoder::compression::{Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{colortype, TiffEncoder};
use tracing::{debug, info};

/// Converts between PNG, JPEG, BMP, GIF and TIFF, and resizes images.
#[derive(Debug, Clone, Copy)]
pub struct ImageConverter {
    filter: FilterType,
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl ImageConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different resampling filter for [`ImageConverter::resize`].
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn supported_formats() -> FormatSpec {
        IMAGE_FORMATS
    }

    /// Resize `input` and write it to `output`, whose extension picks the format.
    ///
    /// At least one of `width`/`height` is required, and neither may be zero;
    /// this is checked before the file system is touched. With
    /// `maintain_aspect_ratio` the image is scaled to fit inside the requested
    /// box; without it a missing dimension keeps its original size.
    pub fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: Option<u32>,
        height: Option<u32>,
        maintain_aspect_ratio: bool,
    ) -> ConversionResult {
        check_dimensions(width, height)?;

        validate(input, &IMAGE_FORMATS)?.into_result(input)?;
        let format = Format::from_path(output)
            .filter(|f| f.is_raster())
            .ok_or_else(|| {
                ConvertError::UnsupportedFormat(format!(
                    "Unsupported output format for '{}'. Supported formats are: {}",
                    output.display(),
                    IMAGE_FORMATS.describe()
                ))
            })?;
        let profile = profile_for(format).unwrap_or_default();
        let output = prepare_explicit_output(output)?;

        let img = decode(input)?;
        let (w, h) = compute_dimensions(img.dimensions(), width, height, maintain_aspect_ratio)?;
        debug!(
            "Resizing {} from {:?} to {}x{}",
            input.display(),
            img.dimensions(),
            w,
            h
        );
        let resized = img.resize_exact(w, h, self.filter);

        let bytes = encode(prepare_for(resized, format), format, &profile, input)?;
        write_atomic(&output, &bytes)?;
        info!("Resized {} to {} ({}x{})", input.display(), output.display(), w, h);
        Ok(output)
    }
}

impl Converter for ImageConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::Image
    }

    fn input_formats(&self) -> FormatSpec {
        IMAGE_FORMATS
    }

    fn output_formats(&self) -> FormatSpec {
        IMAGE_FORMATS
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, ConvertError> {
        let img = decode(job.input)?;
        encode(prepare_for(img, job.format), job.format, &job.profile, job.input)
    }
}

fn check_dimensions(width: Option<u32>, height: Option<u32>) -> Result<(), ConvertError> {
    if width.is_none() && height.is_none() {
        return Err(ConvertError::InvalidArguments(
            "At least one of width or height must be specified".into(),
        ));
    }
    if width == Some(0) || height == Some(0) {
        return Err(ConvertError::InvalidArguments(
            "width and height must be positive".into(),
        ));
    }
    Ok(())
}

/// Target dimensions for a resize of an image of size `original`.
///
/// With aspect ratio maintained and both sides given, the smaller of the two
/// scale ratios is applied to both sides. Results are rounded to the nearest
/// pixel and never drop below 1.
pub fn compute_dimensions(
    original: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> Result<(u32, u32), ConvertError> {
    check_dimensions(width, height)?;
    let (ow, oh) = original;
    if ow == 0 || oh == 0 {
        return Err(ConvertError::InvalidArguments(
            "source image has zero size".into(),
        ));
    }

    let scale = |side: u32, ratio: f64| -> u32 { (f64::from(side) * ratio).round().max(1.0) as u32 };

    let dims = if maintain_aspect_ratio {
        match (width, height) {
            (Some(w), Some(h)) => {
                let ratio = (f64::from(w) / f64::from(ow)).min(f64::from(h) / f64::from(oh));
                (scale(ow, ratio), scale(oh, ratio))
            }
            (Some(w), None) => (w, scale(oh, f64::from(w) / f64::from(ow))),
            (None, Some(h)) => (scale(ow, f64::from(h) / f64::from(oh)), h),
            (None, None) => {
                return Err(ConvertError::InvalidArguments(
                    "At least one of width or height must be specified".into(),
                ))
            }
        }
    } else {
        (width.unwrap_or(ow), height.unwrap_or(oh))
    };
    Ok(dims)
}

fn decode(path: &Path) -> Result<DynamicImage, ConvertError> {
    let mut reader = ImageReader::open(path)
        .map_err(|e| ConvertError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| ConvertError::failed(path, e))?;
    // Content sniffing failed; trust the (already validated) extension.
    if reader.format().is_none() {
        if let Some(format) = Format::from_path(path).and_then(Format::image_format) {
            reader.set_format(format);
        }
    }
    reader.decode().map_err(|e| ConvertError::failed(path, e))
}

/// Reduce any decoded layout to 8-bit gray/RGB with or without alpha.
pub fn normalize(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Composite an image onto an opaque white background.
pub fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(out)
}

fn prepare_for(img: DynamicImage, format: Format) -> DynamicImage {
    let img = normalize(img);
    if !format.supports_transparency() && img.color().has_alpha() {
        debug!("Flattening alpha onto white for {}", format);
        flatten_onto_white(&img)
    } else {
        img
    }
}

fn encode(
    img: DynamicImage,
    format: Format,
    profile: &OptionProfile,
    input: &Path,
) -> Result<Vec<u8>, ConvertError> {
    let fail = |e: &dyn std::fmt::Display| ConvertError::failed(input, e);
    let mut buf = Vec::new();

    match format {
        Format::Jpeg => {
            // The encoder's floor is 1; a clamped 0 encodes at 1.
            let quality = profile.quality.unwrap_or(DEFAULT_JPEG_QUALITY).max(1);
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            img.write_with_encoder(encoder).map_err(|e| fail(&e))?;
        }
        Format::Png => {
            let compression = if profile.optimize.unwrap_or(false) {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
            img.write_with_encoder(encoder).map_err(|e| fail(&e))?;
        }
        Format::Bmp => {
            let encoder = BmpEncoder::new(&mut buf);
            img.write_with_encoder(encoder).map_err(|e| fail(&e))?;
        }
        Format::Gif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
                .map_err(|e| fail(&e))?;
        }
        Format::Tiff => {
            let compression = profile.compression.unwrap_or_default();
            buf = encode_tiff(&img, compression).map_err(|e| fail(&e))?;
        }
        other => {
            return Err(ConvertError::UnsupportedFormat(format!(
                "{other} is not an image format"
            )))
        }
    }
    Ok(buf)
}

macro_rules! write_tiff_pixels {
    ($encoder:expr, $compression:expr, $img:expr) => {{
        let (w, h) = $img.dimensions();
        match $img {
            DynamicImage::ImageLuma8(gray) => $encoder
                .write_image_with_compression::<colortype::Gray8, _>(w, h, $compression, gray.as_raw()),
            DynamicImage::ImageRgb8(rgb) => $encoder
                .write_image_with_compression::<colortype::RGB8, _>(w, h, $compression, rgb.as_raw()),
            other => {
                let rgba = other.to_rgba8();
                $encoder.write_image_with_compression::<colortype::RGBA8, _>(
                    w,
                    h,
                    $compression,
                    rgba.as_raw(),
                )
            }
        }
    }};
}

fn encode_tiff(img: &DynamicImage, compression: TiffCompression) -> tiff::TiffResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor)?;
        match compression {
            TiffCompression::None => write_tiff_pixels!(encoder, Uncompressed::default(), img)?,
            TiffCompression::Lzw => write_tiff_pixels!(encoder, Lzw::default(), img)?,
            TiffCompression::Deflate => write_tiff_pixels!(encoder, Deflate::default(), img)?,
            TiffCompression::Packbits => write_tiff_pixels!(encoder, Packbits::default(), img)?,
        }
    }
    Ok(cursor.into_inner())
}
