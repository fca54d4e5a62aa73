//! Text blocks → paginated PDF, written with `lopdf`.
//!
//! Layout is deliberately simple: one column, greedy word wrapping, the four
//! standard Type1 fonts (no embedding), WinAnsi encoding. Characters outside
//! WinAnsi print as `?`. Right-to-left documents right-align each line; no
//! bidi reordering is attempted.

use crate::config::TextDirection;
use crate::pipeline::html_text::Block;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use thiserror::Error;

/// Line box height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.4;
/// Indent per list nesting level, in points.
const LIST_INDENT: f32 = 18.0;
const HEADING_SCALE: [f32; 6] = [2.0, 1.6, 1.35, 1.15, 1.0, 0.9];

/// Resolved page geometry and typography.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSettings {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub direction: TextDirection,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum PdfWriteError {
    #[error("failed to encode page content: {0}")]
    Content(String),

    #[error("failed to serialise PDF: {0}")]
    Save(String),
}

/// Lay out `blocks` and serialise the result as PDF bytes.
pub fn render_pdf(blocks: &[Block], settings: &LayoutSettings) -> Result<Vec<u8>, PdfWriteError> {
    let mut layout = Layout::new(settings);
    for block in blocks {
        layout.place_block(block);
    }
    write_document(layout.finish(), settings)
}

// ── Fonts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Oblique,
    Mono,
}

impl Font {
    const ALL: [Font; 4] = [Font::Regular, Font::Bold, Font::Oblique, Font::Mono];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
            Font::Mono => "F4",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
            Font::Mono => "Courier",
        }
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Mono => return 600,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Oblique => &HELVETICA_WIDTHS,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            0x95 => 350,
            0xA0 => 278,
            _ => 556,
        }
    }
}

#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn text_width(bytes: &[u8], font: Font, size: f32) -> f32 {
    let units: u32 = bytes.iter().map(|&b| u32::from(font.glyph_width(b))).sum();
    units as f32 * size / 1000.0
}

/// Encode text in WinAnsiEncoding (Windows-1252). Unmappable characters
/// become `?`; control characters are dropped.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        let byte = match c {
            '\t' => {
                out.extend_from_slice(b"    ");
                continue;
            }
            c if c.is_control() => continue,
            _ if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) => code as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        };
        out.push(byte);
    }
    out
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Text {
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        bytes: Vec<u8>,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

struct Layout<'a> {
    settings: &'a LayoutSettings,
    pages: Vec<Vec<Mark>>,
    current: Vec<Mark>,
    /// Top of the next line box, in PDF user space (origin bottom-left).
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(settings: &'a LayoutSettings) -> Self {
        Self {
            settings,
            pages: Vec::new(),
            current: Vec::new(),
            y: settings.page_height - settings.margin,
        }
    }

    fn content_width(&self) -> f32 {
        self.settings.page_width - 2.0 * self.settings.margin
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.settings.page_height - self.settings.margin;
    }

    /// Vertical gap; swallowed at the top of a page.
    fn gap(&mut self, amount: f32) {
        if !self.current.is_empty() {
            self.y -= amount;
        }
    }

    fn reserve(&mut self, height: f32) {
        if self.y - height < self.settings.margin && !self.current.is_empty() {
            self.break_page();
        }
    }

    fn line(&mut self, font: Font, size: f32, indent: f32, bytes: Vec<u8>) {
        let box_height = size * LINE_HEIGHT;
        self.reserve(box_height);
        self.y -= box_height;
        let baseline = self.y + (box_height - size) / 2.0 + size * 0.2;

        let x = match self.settings.direction {
            TextDirection::Ltr => self.settings.margin + indent,
            TextDirection::Rtl => {
                self.settings.margin + self.content_width() - indent - text_width(&bytes, font, size)
            }
        };
        // Blank lines are recorded too so a following `gap` sees a non-empty page.
        self.current.push(Mark::Text { font, size, x, y: baseline, bytes });
    }

    fn place_block(&mut self, block: &Block) {
        let base = self.settings.font_size;
        match block {
            Block::Heading { level, text } => {
                let scale = HEADING_SCALE[usize::from(level.saturating_sub(1)).min(5)];
                let size = base * scale;
                self.gap(size * 0.6);
                self.wrapped(text, Font::Bold, size, 0.0, None);
                self.gap(size * 0.3);
            }
            Block::Paragraph(text) => {
                self.wrapped(text, Font::Regular, base, 0.0, None);
                self.gap(base * 0.6);
            }
            Block::ListItem { marker, depth, text } => {
                let indent = LIST_INDENT * (*depth).saturating_sub(1) as f32;
                self.wrapped(text, Font::Regular, base, indent, Some(marker));
                self.gap(base * 0.2);
            }
            Block::Preformatted(text) => {
                self.preformatted(text, base * 0.9);
                self.gap(base * 0.6);
            }
            Block::Quote(text) => {
                self.wrapped(text, Font::Oblique, base, LIST_INDENT, None);
                self.gap(base * 0.6);
            }
            Block::TableRow(cells) => {
                self.wrapped(&cells.join("  |  "), Font::Regular, base, 0.0, None);
                self.gap(base * 0.2);
            }
            Block::Rule => {
                self.gap(base * 0.4);
                self.reserve(base * 0.4);
                let y = self.y - base * 0.2;
                self.current.push(Mark::Rule {
                    x1: self.settings.margin,
                    x2: self.settings.page_width - self.settings.margin,
                    y,
                });
                self.y -= base * 0.4;
                self.gap(base * 0.4);
            }
        }
    }

    /// Place word-wrapped text. A list `marker` hangs in front of the first
    /// line; an empty marker indents like a marked item without printing one.
    fn wrapped(&mut self, text: &str, font: Font, size: f32, indent: f32, marker: Option<&str>) {
        let (prefix, hang) = match marker {
            Some(m) if !m.is_empty() => {
                let prefix = encode_winansi(&format!("{m} "));
                let hang = text_width(&prefix, font, size);
                (prefix, hang)
            }
            Some(_) => (Vec::new(), text_width(&encode_winansi("\u{2022} "), font, size)),
            None => (Vec::new(), 0.0),
        };

        let available = (self.content_width() - indent - hang).max(size);
        for (i, line) in wrap_text(text, font, size, available).into_iter().enumerate() {
            if i == 0 && !prefix.is_empty() {
                let mut bytes = prefix.clone();
                bytes.extend(line);
                self.line(font, size, indent, bytes);
            } else {
                self.line(font, size, indent + hang, line);
            }
        }
    }

    fn preformatted(&mut self, text: &str, size: f32) {
        let char_width = f32::from(Font::Mono.glyph_width(b' ')) * size / 1000.0;
        let max_chars = ((self.content_width() / char_width).floor() as usize).max(1);
        for raw in text.split('\n') {
            let bytes = encode_winansi(raw);
            if bytes.is_empty() {
                self.line(Font::Mono, size, 0.0, Vec::new());
                continue;
            }
            for chunk in bytes.chunks(max_chars) {
                self.line(Font::Mono, size, 0.0, chunk.to_vec());
            }
        }
    }

    fn finish(mut self) -> Vec<Vec<Mark>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Greedy word wrap into WinAnsi-encoded lines no wider than `available`.
/// Words longer than a whole line are broken between characters.
fn wrap_text(text: &str, font: Font, size: f32, available: f32) -> Vec<Vec<u8>> {
    let space = text_width(b" ", font, size);
    let mut lines = Vec::new();

    for hard_line in text.split('\n') {
        let mut line: Vec<u8> = Vec::new();
        let mut width = 0.0;

        for word in hard_line.split(' ').filter(|w| !w.is_empty()) {
            let bytes = encode_winansi(word);
            let word_width = text_width(&bytes, font, size);

            if !line.is_empty() && width + space + word_width > available {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
            if !line.is_empty() {
                line.push(b' ');
                width += space;
            }
            if word_width <= available {
                line.extend(bytes);
                width += word_width;
                continue;
            }
            for b in bytes {
                let w = text_width(&[b], font, size);
                if !line.is_empty() && width + w > available {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(b);
                width += w;
            }
        }
        lines.push(line);
    }
    lines
}

// ── Serialisation ────────────────────────────────────────────────────────────

fn page_operations(marks: &[Mark]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(marks.len() * 5);
    for mark in marks {
        match mark {
            Mark::Text { bytes, .. } if bytes.is_empty() => {}
            Mark::Text { font, size, x, y, bytes } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![font.resource().into(), (*size).into()]));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(bytes.clone(), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            Mark::Rule { x1, x2, y } => {
                ops.push(Operation::new("w", vec![0.5f32.into()]));
                ops.push(Operation::new("m", vec![(*x1).into(), (*y).into()]));
                ops.push(Operation::new("l", vec![(*x2).into(), (*y).into()]));
                ops.push(Operation::new("S", vec![]));
            }
        }
    }
    ops
}

/// A PDF text string: literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn write_document(pages: Vec<Vec<Mark>>, settings: &LayoutSettings) -> Result<Vec<u8>, PdfWriteError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource(), id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for marks in &pages {
        let content = Content {
            operations: page_operations(marks),
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfWriteError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        settings.page_width.into(),
        settings.page_height.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&settings.title),
        "Producer" => Object::string_literal(concat!("file-converter ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| PdfWriteError::Save(e.to_string()))?;
    Ok(buf)
}
