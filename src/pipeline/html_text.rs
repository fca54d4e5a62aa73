//! HTML → flat list of text blocks for PDF layout.
//!
//! lol_html tokenizes the document; a small state machine then recognises
//! the block structure produced by Markdown renderers and typical hand-written
//! documents (headings, paragraphs, lists, preformatted text, quotes, tables,
//! rules) and throws everything else away. Inline markup is dropped; its text
//! is kept.
//!
//! ## Rules
//!
//! 1. Tokenize with lol_html; comments and doctypes are skipped, and the text
//!    of `<title>`, `<style>`, `<script>` and friends is captured, not laid out
//! 2. Flush the pending text as a block whenever a block-level tag opens or
//!    closes
//! 3. Collapse whitespace outside `<pre>`; `<br>` is a hard line break
//! 4. Decode character references with `html_escape`

use crate::config::TextDirection;
use lol_html::html_content::EndTag;
use lol_html::{doc_text, element, rewrite_str, RewriteStrSettings};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// One laid-out unit of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    /// `marker` is empty for continuation paragraphs inside the same item.
    ListItem { marker: String, depth: usize, text: String },
    Preformatted(String),
    Quote(String),
    TableRow(Vec<String>),
    Rule,
}

/// What the PDF renderer needs from one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    /// Contents of `<title>`, entity-decoded and whitespace-collapsed.
    pub title: Option<String>,
    /// Contents of every `<style>` element, in document order.
    pub styles: Vec<String>,
    /// `href` of every `<link rel="stylesheet">`, in document order.
    pub stylesheet_links: Vec<String>,
    /// Direction from a `dir` attribute on `<html>` or `<body>`.
    pub direction: Option<TextDirection>,
    pub blocks: Vec<Block>,
}

/// Tokenize `html` once and build the [`HtmlDocument`].
pub fn parse_document(html: &str) -> HtmlDocument {
    let mut doc = HtmlDocument::default();
    let mut scanner = Scanner::default();
    // Open raw-text element we are inside of, if any.
    let mut raw: Option<(String, String)> = None;

    for token in tokenize(html) {
        match token {
            Token::Open { name, .. } if raw.is_some() => {
                debug!("Ignoring <{}> inside raw text", name);
            }
            Token::Open { name, attrs } => {
                if matches!(name.as_str(), "html" | "body") && doc.direction.is_none() {
                    doc.direction = attr_value(&attrs, "dir").and_then(|d| TextDirection::parse(&d));
                }
                if name == "link" && is_stylesheet_link(&attrs) {
                    doc.stylesheet_links.extend(attr_value(&attrs, "href").filter(|h| !h.trim().is_empty()));
                }
                if is_raw_text(&name) {
                    raw = Some((name, String::new()));
                } else {
                    scanner.open(&name, &attrs);
                }
            }
            Token::Close(name) => match raw.take() {
                Some((open, text)) if open == name => match open.as_str() {
                    "title" if doc.title.is_none() => {
                        let title = collapse_whitespace(&decode_entities(&text)).trim().to_string();
                        doc.title = Some(title).filter(|t| !t.is_empty());
                    }
                    "style" => doc.styles.push(text),
                    _ => {}
                },
                still_open @ Some(_) => raw = still_open,
                None => scanner.close(&name),
            },
            Token::Text(text) => match raw.as_mut() {
                Some((_, buf)) => buf.push_str(&text),
                None => scanner.text(&text),
            },
        }
    }
    doc.blocks = scanner.finish();
    doc
}

/// Contents of `<title>`, entity-decoded and whitespace-collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    parse_document(html).title
}

/// Contents of every `<style>` element, in document order.
pub fn extract_styles(html: &str) -> Vec<String> {
    parse_document(html).styles
}

/// Direction from a `dir` attribute on `<html>` or `<body>`.
pub fn document_direction(html: &str) -> Option<TextDirection> {
    parse_document(html).direction
}

/// Extract the text blocks of an HTML document or fragment.
pub fn extract_blocks(html: &str) -> Vec<Block> {
    parse_document(html).blocks
}

// ── Rule 1: Tokenize ─────────────────────────────────────────────────────────

type Attrs = Vec<(String, String)>;

#[derive(Debug)]
enum Token {
    Open { name: String, attrs: Attrs },
    Close(String),
    /// Raw text; entities are still encoded.
    Text(String),
}

/// Elements whose text is never laid out.
fn is_raw_text(name: &str) -> bool {
    matches!(name, "title" | "style" | "script" | "template" | "noscript" | "textarea")
}

/// Stream `html` through lol_html, recording start tags, end tags and text
/// in document order. Comments and doctypes never reach a handler.
fn tokenize(html: &str) -> Vec<Token> {
    let tokens: Rc<RefCell<Vec<Token>>> = Rc::new(RefCell::new(Vec::new()));

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let name = el.tag_name().to_ascii_lowercase();
                let attrs = el
                    .attributes()
                    .iter()
                    .map(|a| (a.name().to_ascii_lowercase(), a.value()))
                    .collect();
                tokens.borrow_mut().push(Token::Open {
                    name: name.clone(),
                    attrs,
                });
                if let Some(handlers) = el.end_tag_handlers() {
                    let tokens = Rc::clone(&tokens);
                    let handler: lol_html::EndTagHandler<'static> =
                        Box::new(move |_end: &mut EndTag<'_>| {
                            tokens.borrow_mut().push(Token::Close(name));
                            Ok(())
                        });
                    handlers.push(handler);
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_text!(|chunk| {
                let mut tokens = tokens.borrow_mut();
                match tokens.last_mut() {
                    Some(Token::Text(buf)) => buf.push_str(chunk.as_str()),
                    _ if chunk.as_str().is_empty() => {}
                    _ => tokens.push(Token::Text(chunk.as_str().to_string())),
                }
                Ok(())
            })],
            strict: false,
            ..RewriteStrSettings::default()
        },
    );
    if let Err(e) = result {
        warn!("HTML tokenizer stopped early: {}", e);
    }

    let collected = tokens.take();
    collected
}

// ── Rule 2: Block scanning ───────────────────────────────────────────────────

#[derive(Default)]
struct Scanner {
    blocks: Vec<Block>,
    buf: String,
    heading: Option<u8>,
    pre_depth: usize,
    quote_depth: usize,
    /// One entry per open list: `None` for `<ul>`, next number for `<ol>`.
    lists: Vec<Option<usize>>,
    item_marker: Option<String>,
    in_item: bool,
    row: Option<Vec<String>>,
    in_cell: bool,
}

impl Scanner {
    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        if self.pre_depth > 0 {
            self.buf.push_str(&decoded);
        } else {
            let collapsed = collapse_whitespace(&decoded);
            if self.buf.is_empty() || self.buf.ends_with(' ') || self.buf.ends_with('\n') {
                self.buf.push_str(collapsed.trim_start_matches(' '));
            } else {
                self.buf.push_str(&collapsed);
            }
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        match name {
            "br" => self.buf.push('\n'),
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.heading = name[1..].parse().ok();
            }
            "pre" => {
                self.flush();
                self.pre_depth += 1;
            }
            "blockquote" => {
                self.flush();
                self.quote_depth += 1;
            }
            "ul" => {
                self.flush();
                self.lists.push(None);
            }
            "ol" => {
                self.flush();
                let start = attr_value(attrs, "start")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                self.lists.push(Some(start));
            }
            "li" => {
                self.flush();
                self.in_item = true;
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}.");
                        *n += 1;
                        m
                    }
                    _ => "\u{2022}".to_string(),
                };
                self.item_marker = Some(marker);
            }
            "tr" => {
                self.flush();
                self.row = Some(Vec::new());
            }
            "td" | "th" => {
                if self.row.is_some() {
                    self.buf.clear();
                    self.in_cell = true;
                }
            }
            "input" => {
                if attr_value(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
                    let mark = if attr_value(attrs, "checked").is_some() { "[x] " } else { "[ ] " };
                    self.buf.push_str(mark);
                }
            }
            "img" => {
                if let Some(alt) = attr_value(attrs, "alt").filter(|a| !a.is_empty()) {
                    self.buf.push_str(&decode_entities(&alt));
                }
            }
            n if is_block_container(n) => self.flush(),
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.heading = None;
            }
            "pre" => {
                self.flush();
                self.pre_depth = self.pre_depth.saturating_sub(1);
            }
            "blockquote" => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
                self.in_item = false;
                self.item_marker = None;
            }
            "li" => {
                self.flush();
                self.in_item = false;
                self.item_marker = None;
            }
            "td" | "th" => {
                if self.in_cell {
                    let cell = normalise_lines(&std::mem::take(&mut self.buf));
                    if let Some(row) = self.row.as_mut() {
                        row.push(cell);
                    }
                    self.in_cell = false;
                }
            }
            "tr" => {
                if let Some(row) = self.row.take() {
                    if row.iter().any(|c| !c.is_empty()) {
                        self.blocks.push(Block::TableRow(row));
                    }
                }
                self.buf.clear();
            }
            n if is_block_container(n) => self.flush(),
            _ => {}
        }
    }

    fn flush(&mut self) {
        if self.in_cell {
            return;
        }
        let raw = std::mem::take(&mut self.buf);
        if self.row.is_some() {
            // stray text between cells
            return;
        }
        let text = if self.pre_depth > 0 {
            raw.trim_matches('\n').trim_end().to_string()
        } else {
            normalise_lines(&raw)
        };
        if text.is_empty() {
            return;
        }

        let block = if let Some(level) = self.heading {
            Block::Heading { level, text }
        } else if self.in_item {
            Block::ListItem {
                marker: self.item_marker.take().unwrap_or_default(),
                depth: self.lists.len().max(1),
                text,
            }
        } else if self.pre_depth > 0 {
            Block::Preformatted(text)
        } else if self.quote_depth > 0 {
            Block::Quote(text)
        } else {
            Block::Paragraph(text)
        };
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.in_cell = false;
        self.row = None;
        self.flush();
        self.blocks
    }
}

fn is_block_container(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "nav"
            | "aside"
            | "figure"
            | "figcaption"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "dl"
            | "dt"
            | "dd"
            | "body"
            | "html"
    )
}

fn is_stylesheet_link(attrs: &[(String, String)]) -> bool {
    attr_value(attrs, "rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|r| r.eq_ignore_ascii_case("stylesheet"))
    })
}

fn attr_value(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}

// ── Rule 3: Whitespace ───────────────────────────────────────────────────────

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Trim every hard line and drop leading/trailing empty lines.
fn normalise_lines(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

// ── Rule 4: Entities ─────────────────────────────────────────────────────────

/// Decode every HTML5 character reference (named, decimal and hex).
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
