//! Integration tests for file-converter.
//!
//! All fixtures are generated in-test into temporary directories, so these
//! run anywhere without network access or sample files.
//!
//! Run with:
//!   cargo test --test conversion -- --nocapture
//!
//! Set `RUST_LOG=file_converter=debug` to see pipeline logging.

use file_converter::{
    batch_convert, batch_convert_sync, collect_inputs, convert_image, html_string_to_pdf,
    markdown_to_html, markdown_to_pdf, pdf_to_word, resize_image, BatchConfig, ConversionOptions,
    ConversionRequest, Converter, DocumentConfig, ErrorKind, HtmlToPdfConverter, ImageConverter,
    MarkdownToPdfConverter, PageSelection, PageSize, PdfToWordConverter, Preferences,
    TextDirection,
};
use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient(width, height).save(&path).unwrap();
    path
}

fn media_box(pdf: &Path) -> (f32, f32) {
    let doc = lopdf::Document::load(pdf).unwrap();
    let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    let pages = doc.get_object(pages_id).unwrap().as_dict().unwrap();
    let mb = pages.get(b"MediaBox").unwrap().as_array().unwrap();
    (mb[2].as_float().unwrap(), mb[3].as_float().unwrap())
}

fn assert_page_size(pdf: &Path, size: PageSize) {
    let (w, h) = media_box(pdf);
    let (ew, eh) = size.dimensions_pt();
    assert!((w - ew).abs() < 0.01 && (h - eh).abs() < 0.01, "{w}x{h} is not {size:?}");
}

fn no_options() -> ConversionOptions {
    ConversionOptions::new()
}

fn docx_text(path: &Path) -> String {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut part = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

// ── Image conversion ─────────────────────────────────────────────────────────

#[test]
fn test_png_to_jpeg_and_back_keeps_dimensions() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "photo.png", 320, 240);

    let jpg = convert_image(&png, None, Some("jpg"), &no_options()).unwrap();
    assert_eq!(jpg, dir.path().join("photo.jpg"));

    let back_path = dir.path().join("back/photo.png");
    let back = convert_image(&jpg, Some(back_path.as_path()), None, &no_options()).unwrap();
    assert_eq!(image::open(&back).unwrap().dimensions(), (320, 240));
}

#[test]
fn test_png_to_bmp_and_back_is_pixel_exact() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "art.png", 64, 48);

    let bmp = convert_image(&png, None, Some("BMP"), &no_options()).unwrap();
    let art2 = dir.path().join("art2.png");
    let back = convert_image(&bmp, Some(art2.as_path()), Some("png"), &no_options()).unwrap();

    assert_eq!(image::open(&back).unwrap().to_rgb8(), gradient(64, 48));
}

#[test]
fn test_transparent_png_to_jpeg_uses_white_background() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logo.png");
    RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 0])).save(&path).unwrap();

    let jpg = convert_image(&path, None, Some("jpeg"), &no_options()).unwrap();
    let decoded = image::open(&jpg).unwrap().to_rgb8();
    for px in decoded.pixels() {
        assert!(px.0.iter().all(|&c| c >= 250), "expected white, got {:?}", px.0);
    }
}

#[test]
fn test_tiff_keeps_alpha_and_defaults_to_lzw() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mask.png");
    let mut img = RgbaImage::from_pixel(8, 8, Rgba([0, 128, 255, 255]));
    img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    img.save(&path).unwrap();

    let tif = convert_image(&path, None, Some("tif"), &no_options()).unwrap();
    assert_eq!(tif, dir.path().join("mask.tif"));

    let decoded = image::open(&tif).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(5, 5).0, [0, 128, 255, 255]);

    let mut decoder = tiff::decoder::Decoder::new(std::fs::File::open(&tif).unwrap()).unwrap();
    let compression = decoder
        .get_tag_u32(tiff::tags::Tag::Compression)
        .unwrap();
    assert_eq!(compression, 5, "LZW is TIFF compression 5");
}

#[test]
fn test_out_of_range_quality_is_clamped() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "q.png", 50, 50);

    let mut over = ConversionOptions::new();
    over.insert("quality".into(), 150.into());
    let over_path = dir.path().join("over.jpg");
    let a = convert_image(&png, Some(over_path.as_path()), None, &over).unwrap();

    let mut max = ConversionOptions::new();
    max.insert("quality".into(), 100.into());
    let max_path = dir.path().join("max.jpg");
    let b = convert_image(&png, Some(max_path.as_path()), None, &max).unwrap();

    assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
}

#[test]
fn test_wrongly_typed_option_is_invalid_arguments() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "t.png", 4, 4);
    let mut options = ConversionOptions::new();
    options.insert("quality".into(), "high".into());

    let err = convert_image(&png, None, Some("jpg"), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert!(!dir.path().join("t.jpg").exists());
}

#[test]
fn test_validation_errors_write_nothing() {
    let dir = TempDir::new().unwrap();

    let err = convert_image(dir.path().join("ghost.png"), None, Some("jpg"), &no_options())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);

    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, "hello").unwrap();
    let err = convert_image(&txt, None, Some("png"), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    let png = write_png(dir.path(), "ok.png", 4, 4);
    let err = convert_image(&png, None, Some("webp"), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    let err = convert_image(&png, None, None, &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    let mismatched = dir.path().join("x.png");
    let err = convert_image(&png, Some(mismatched.as_path()), Some("gif"), &no_options())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["notes.txt", "ok.png"]);
}

#[test]
fn test_corrupt_image_is_conversion_failure_without_output() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"\x89PNG but not really").unwrap();

    let err = convert_image(&bad, None, Some("jpg"), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    assert!(!dir.path().join("bad.jpg").exists());
}

// ── Resize ───────────────────────────────────────────────────────────────────

#[test]
fn test_resize_width_only_keeps_aspect() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "wide.png", 400, 300);

    let out = resize_image(&png, dir.path().join("small/wide.png"), Some(200), None, true).unwrap();
    assert_eq!(image::open(out).unwrap().dimensions(), (200, 150));
}

#[test]
fn test_resize_box_uses_smaller_ratio() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "pano.png", 400, 200);

    let out = resize_image(&png, dir.path().join("pano.jpg"), Some(100), Some(100), true).unwrap();
    assert_eq!(image::open(out).unwrap().dimensions(), (100, 50));
}

#[test]
fn test_resize_stretch_without_aspect() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "sq.png", 100, 100);

    let out = resize_image(&png, dir.path().join("sq.bmp"), Some(30), Some(70), false).unwrap();
    assert_eq!(image::open(out).unwrap().dimensions(), (30, 70));
}

#[test]
fn test_resize_without_dimensions_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("never-created");

    let err = resize_image(
        dir.path().join("does-not-exist.png"),
        out_dir.join("x.png"),
        None,
        None,
        true,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert!(!out_dir.exists());
}

// ── Batch ────────────────────────────────────────────────────────────────────

fn batch_fixture(dir: &Path) -> Vec<PathBuf> {
    (0..5)
        .map(|i| {
            let name = format!("img{i}.png");
            if i == 2 {
                let p = dir.join(name);
                std::fs::write(&p, b"corrupt").unwrap();
                p
            } else {
                write_png(dir, &name, 20 + i, 10)
            }
        })
        .collect()
}

#[tokio::test]
async fn test_batch_with_one_corrupt_item() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let inputs = batch_fixture(dir.path());
    let out = dir.path().join("jpg");

    let config = BatchConfig::builder().concurrency(4).build().unwrap();
    let result = batch_convert(
        Arc::new(ImageConverter::new()),
        &inputs,
        &out,
        "jpg",
        &no_options(),
        &config,
    )
    .await;

    assert_eq!(result.len(), 5);
    for (i, entry) in result.entries.iter().enumerate() {
        assert_eq!(entry.input_path, inputs[i]);
        if i == 2 {
            assert_eq!(entry.outcome.error_kind(), Some(ErrorKind::ConversionFailed));
        } else {
            let path = entry.outcome.output_path().unwrap();
            assert_eq!(path, &out.join(format!("img{i}.jpg")));
            assert_eq!(image::open(path).unwrap().width(), 20 + i as u32);
        }
    }
    assert_eq!((result.stats.succeeded, result.stats.failed), (4, 1));

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("ConversionFailed"));
    println!("batch: {json}");
}

#[test]
fn test_batch_sync_from_directory_listing() {
    let dir = TempDir::new().unwrap();
    batch_fixture(dir.path());
    std::fs::write(dir.path().join("readme.txt"), "skip me").unwrap();

    let inputs = collect_inputs(dir.path(), &ImageConverter::supported_formats()).unwrap();
    assert_eq!(inputs.len(), 5);

    let result = batch_convert_sync(
        Arc::new(ImageConverter::new()),
        &inputs,
        &dir.path().join("gif"),
        "gif",
        &no_options(),
        &BatchConfig::default(),
    );
    assert_eq!(result.successes().count(), 4);
    assert_eq!(result.failures().count(), 1);
}

#[test]
fn test_batch_via_block_on() {
    let dir = TempDir::new().unwrap();
    let inputs = batch_fixture(dir.path());

    let result = tokio_test::block_on(batch_convert(
        Arc::new(ImageConverter::new()),
        &inputs,
        &dir.path().join("tiff"),
        "tiff",
        &no_options(),
        &BatchConfig::builder().concurrency(2).build().unwrap(),
    ));
    assert_eq!(result.stats.total, 5);
    assert_eq!(result.stats.succeeded, 4);
}

#[test]
fn test_batch_inputs_sharing_a_stem_write_once() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "a.png", 8, 8);
    let bmp = dir.path().join("a.bmp");
    gradient(3, 3).save(&bmp).unwrap();
    let out = dir.path().join("jpg");

    let result = batch_convert_sync(
        Arc::new(ImageConverter::new()),
        &[png.clone(), bmp.clone()],
        &out,
        "jpg",
        &no_options(),
        &BatchConfig::default(),
    );
    assert_eq!(result.entries[0].input_path, png);
    assert_eq!(result.entries[0].outcome.output_path(), Some(&out.join("a.jpg")));
    assert_eq!(result.entries[1].input_path, bmp);
    assert_eq!(result.entries[1].outcome.error_kind(), Some(ErrorKind::InvalidArguments));
    // The first claimant's pixels survive.
    assert_eq!(image::open(out.join("a.jpg")).unwrap().width(), 8);
}

#[tokio::test]
async fn test_batch_sync_called_from_async_code() {
    let dir = TempDir::new().unwrap();
    let inputs = batch_fixture(dir.path());

    let result = batch_convert_sync(
        Arc::new(ImageConverter::new()),
        &inputs,
        &dir.path().join("bmp"),
        "bmp",
        &no_options(),
        &BatchConfig::default(),
    );
    assert_eq!((result.stats.succeeded, result.stats.failed), (4, 1));
}

// ── Documents ────────────────────────────────────────────────────────────────

#[test]
fn test_markdown_to_html_has_heading_ids() {
    let dir = TempDir::new().unwrap();
    let md = dir.path().join("README.md");
    std::fs::write(&md, "# Install Guide\n\nRun the installer.\nThen reboot.\n").unwrap();

    let html_path = markdown_to_html(&md, None, Some("html"), &no_options()).unwrap();
    let html = std::fs::read_to_string(html_path).unwrap();
    assert!(html.contains(r#"<h1 id="install-guide">Install Guide</h1>"#));
    assert!(html.contains("Run the installer.<br />"));
    assert!(html.contains("<title>README</title>"));
}

#[test]
fn test_html_to_pdf_then_pdf_to_word() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let html = dir.path().join("memo.html");
    std::fs::write(
        &html,
        "<html><head><title>Memo</title></head><body>\
         <h2>Budget</h2><p>Spend less on coffee.</p>\
         <ul><li>Beans</li><li>Filters</li></ul></body></html>",
    )
    .unwrap();

    let pdf = file_converter::html_to_pdf(&html, None, Some("pdf"), &no_options()).unwrap();
    let doc = lopdf::Document::load(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let docx = pdf_to_word(&pdf, None, Some("docx"), &no_options()).unwrap();
    assert_eq!(docx, dir.path().join("memo.docx"));
    let xml = docx_text(&docx);
    assert!(xml.contains("Budget"), "{xml}");
    assert!(xml.contains("Spend less on coffee."), "{xml}");
    assert!(xml.contains("Filters"), "{xml}");
}

#[test]
fn test_multi_page_pdf_to_word_has_page_breaks() {
    let dir = TempDir::new().unwrap();
    let body: String = (0..150).map(|i| format!("<p>Line {i}</p>")).collect();
    let pdf = html_string_to_pdf(&body, &dir.path().join("long.pdf"), &DocumentConfig::default())
        .unwrap();
    let pages = lopdf::Document::load(&pdf).unwrap().get_pages().len();
    assert!(pages > 1);

    let docx = pdf_to_word(&pdf, None, Some("docx"), &no_options()).unwrap();
    let xml = docx_text(&docx);
    assert_eq!(xml.matches("w:type=\"page\"").count(), pages - 1);
    assert!(xml.contains("Line 149"));
}

#[test]
fn test_markdown_to_pdf_keeps_html_when_asked() {
    let dir = TempDir::new().unwrap();
    let md = dir.path().join("post.md");
    std::fs::write(&md, "# Hello PDF\n\nBody text.\n").unwrap();

    let pdf = markdown_to_pdf(&md, None, Some("pdf"), &no_options()).unwrap();
    assert!(pdf.is_file());
    assert!(!dir.path().join("post.html").exists());

    let config = DocumentConfig::builder().keep_html(true).build().unwrap();
    let pdf = MarkdownToPdfConverter::new(config)
        .convert(&ConversionRequest::new(&md).output_path(dir.path().join("out/post.pdf")))
        .unwrap();
    assert!(pdf.is_file());
    assert!(dir.path().join("out/post.html").is_file());
}

fn long_pdf(dir: &Path) -> (PathBuf, usize) {
    let body: String = (0..150).map(|i| format!("<p>Line {i}</p>")).collect();
    let pdf = html_string_to_pdf(&body, &dir.join("long.pdf"), &DocumentConfig::default()).unwrap();
    let pages = lopdf::Document::load(&pdf).unwrap().get_pages().len();
    assert!(pages > 2, "need at least three pages, got {pages}");
    (pdf, pages)
}

fn pdf_pages_to_word(pdf: &Path, selection: PageSelection, output: PathBuf) -> Result<String, ErrorKind> {
    let config = DocumentConfig::builder().pages(selection).build().unwrap();
    PdfToWordConverter::new(config)
        .convert(&ConversionRequest::new(pdf).output_path(output))
        .map(|docx| docx_text(&docx))
        .map_err(|e| e.kind())
}

#[test]
fn test_pdf_to_word_page_selection() {
    let dir = TempDir::new().unwrap();
    let (pdf, pages) = long_pdf(dir.path());
    let breaks = |xml: &str| xml.matches("w:type=\"page\"").count();

    let xml = pdf_pages_to_word(&pdf, PageSelection::Single(1), dir.path().join("first.docx")).unwrap();
    assert!(xml.contains("Line 0"));
    assert!(!xml.contains("Line 149"));
    assert_eq!(breaks(&xml), 0);

    let xml = pdf_pages_to_word(&pdf, PageSelection::Range(2, pages), dir.path().join("rest.docx")).unwrap();
    assert!(!xml.contains("Line 0"));
    assert!(xml.contains("Line 149"));
    assert_eq!(breaks(&xml), pages - 2);

    let xml = pdf_pages_to_word(
        &pdf,
        PageSelection::Set(vec![pages, 1, 1]),
        dir.path().join("ends.docx"),
    )
    .unwrap();
    assert!(xml.contains("Line 0") && xml.contains("Line 149"));
    assert_eq!(breaks(&xml), 1);
}

#[test]
fn test_pdf_to_word_empty_selection_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let (pdf, pages) = long_pdf(dir.path());

    for (name, selection) in [
        ("past.docx", PageSelection::Single(pages + 1)),
        ("beyond.docx", PageSelection::Range(pages + 1, pages + 3)),
        ("none.docx", PageSelection::Set(vec![])),
    ] {
        let output = dir.path().join(name);
        let err = pdf_pages_to_word(&pdf, selection, output.clone()).unwrap_err();
        assert_eq!(err, ErrorKind::InvalidArguments);
        assert!(!output.exists());
    }
}

#[test]
fn test_external_stylesheet_beats_style_block() {
    let dir = TempDir::new().unwrap();
    let html = dir.path().join("report.html");
    std::fs::write(
        &html,
        "<html><head><style>@page { size: letter }</style></head><body><p>Q3</p></body></html>",
    )
    .unwrap();
    let sheet = dir.path().join("a5.css");
    std::fs::write(&sheet, "@page { size: A5 }").unwrap();

    let pdf = file_converter::html_to_pdf(&html, None, Some("pdf"), &no_options()).unwrap();
    assert_page_size(&pdf, PageSize::Letter);

    let config = DocumentConfig::builder().stylesheet(&sheet).build().unwrap();
    let pdf = HtmlToPdfConverter::new(config)
        .convert(&ConversionRequest::new(&html).output_path(dir.path().join("a5.pdf")))
        .unwrap();
    assert_page_size(&pdf, PageSize::A5);
}

#[test]
fn test_missing_stylesheet_is_file_not_found() {
    let dir = TempDir::new().unwrap();
    let html = dir.path().join("report.html");
    std::fs::write(&html, "<p>Q3</p>").unwrap();
    let config = DocumentConfig::builder()
        .stylesheet(dir.path().join("gone.css"))
        .build()
        .unwrap();

    let err = HtmlToPdfConverter::new(config)
        .convert(&ConversionRequest::new(&html).output_format("pdf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert!(!dir.path().join("report.pdf").exists());
}

#[test]
fn test_linked_stylesheet_next_to_input() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("legal.css"), "@page { size: legal }").unwrap();
    let html = dir.path().join("brief.html");
    std::fs::write(
        &html,
        "<head><link rel=\"stylesheet\" href=\"legal.css\">\
         <link rel=\"stylesheet\" href=\"https://cdn.example.com/x.css\"></head><p>Brief</p>",
    )
    .unwrap();

    let pdf = file_converter::html_to_pdf(&html, None, Some("pdf"), &no_options()).unwrap();
    assert_page_size(&pdf, PageSize::Legal);
}

// ── Preferences ──────────────────────────────────────────────────────────────

#[test]
fn test_preferences_round_trip_drive_configs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/prefs.json");
    assert_eq!(Preferences::load(&path).unwrap(), Preferences::default());

    let prefs = Preferences {
        output_dir: Some(dir.path().join("out")),
        image_format: "webp".into(),
        jpeg_quality: 70,
        optimize: false,
        text_direction: Some(TextDirection::Rtl),
        page_size: PageSize::Letter,
        concurrency: Some(3),
        ..Preferences::default()
    };
    prefs.save(&path).unwrap();
    let loaded = Preferences::load(&path).unwrap();
    assert_eq!(loaded, prefs);

    assert_eq!(loaded.batch_config().concurrency, 3);
    let config = loaded.document_config();
    assert_eq!(config.page_size, PageSize::Letter);
    assert_eq!(config.text_direction, Some(TextDirection::Rtl));

    // A quality the preferences carry reaches the encoder.
    let png = write_png(dir.path(), "shot.png", 16, 16);
    let jpg = convert_image(&png, None, Some("jpg"), &loaded.image_options()).unwrap();
    assert!(jpg.is_file());
}

#[test]
fn test_wrong_converter_for_input_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let png = write_png(dir.path(), "pic.png", 4, 4);
    let err = pdf_to_word(&png, None, Some("docx"), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}
