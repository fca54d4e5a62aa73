//! The CSS subset honoured by the PDF layout stage.
//!
//! Only page-level properties are read:
//!
//! | Rule                   | Properties                 |
//! |------------------------|----------------------------|
//! | `@page`                | `size`, `margin`           |
//! | `body`, `html`         | `font-size`, `direction`   |
//!
//! Everything else is ignored. Later rules override earlier ones, so
//! stylesheets are merged in document order with external sheets last.

use crate::config::{PageSize, TextDirection};
use once_cell::sync::Lazy;
use regex::Regex;

/// Page-level settings found in a stylesheet. `None` means "not specified".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageStyle {
    pub page_size: Option<PageSize>,
    pub margin_pt: Option<f32>,
    pub font_size_pt: Option<f32>,
    pub direction: Option<TextDirection>,
}

impl PageStyle {
    /// Overlay `other` onto `self`; fields set in `other` win.
    pub fn merge(&mut self, other: PageStyle) {
        self.page_size = other.page_size.or(self.page_size);
        self.margin_pt = other.margin_pt.or(self.margin_pt);
        self.font_size_pt = other.font_size_pt.or(self.font_size_pt);
        self.direction = other.direction.or(self.direction);
    }
}

static RE_CSS_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static RE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").unwrap());

/// Parse the supported subset out of a stylesheet.
pub fn parse_css(css: &str) -> PageStyle {
    let css = RE_CSS_COMMENT.replace_all(css, "");
    let mut style = PageStyle::default();

    for caps in RE_RULE.captures_iter(&css) {
        let selector = caps[1].trim();
        let body = &caps[2];

        if selector.eq_ignore_ascii_case("@page") || selector.starts_with("@page ") {
            for (prop, value) in declarations(body) {
                match prop.as_str() {
                    "size" => style.page_size = parse_page_size(&value).or(style.page_size),
                    "margin" => {
                        style.margin_pt = value
                            .split_whitespace()
                            .next()
                            .and_then(parse_length)
                            .or(style.margin_pt)
                    }
                    _ => {}
                }
            }
        } else if selector
            .split(',')
            .map(str::trim)
            .any(|s| s.eq_ignore_ascii_case("body") || s.eq_ignore_ascii_case("html"))
        {
            for (prop, value) in declarations(body) {
                match prop.as_str() {
                    "font-size" => style.font_size_pt = parse_length(&value).or(style.font_size_pt),
                    "direction" => {
                        style.direction = TextDirection::parse(&value).or(style.direction)
                    }
                    _ => {}
                }
            }
        }
    }
    style
}

fn declarations(body: &str) -> impl Iterator<Item = (String, String)> + '_ {
    body.split(';').filter_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        let value = value.trim().trim_end_matches("!important").trim();
        Some((prop.trim().to_ascii_lowercase(), value.to_string()))
    })
}

/// A CSS length in points. Supports `pt`, `px`, `mm`, `cm`, `in` and bare `0`.
pub fn parse_length(value: &str) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    let split = v.find(|c: char| c.is_ascii_alphabetic())?;
    let (num, unit) = v.split_at(split);
    let n: f32 = num.trim().parse().ok()?;
    let pt = match unit {
        "pt" => n,
        "px" => n * 0.75,
        "mm" => n * 72.0 / 25.4,
        "cm" => n * 72.0 / 2.54,
        "in" => n * 72.0,
        "pc" => n * 12.0,
        _ => return None,
    };
    (pt.is_finite() && pt >= 0.0).then_some(pt)
}

/// `size` values: a named sheet, optionally `landscape`/`portrait`, or two lengths.
fn parse_page_size(value: &str) -> Option<PageSize> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [one] if one.eq_ignore_ascii_case("landscape") => Some(PageSize::A4.landscape()),
        [one] if one.eq_ignore_ascii_case("portrait") => Some(PageSize::A4),
        [one] => PageSize::parse(one),
        [a, b] => {
            if let Some(named) = PageSize::parse(a) {
                return match b.to_ascii_lowercase().as_str() {
                    "landscape" => Some(named.landscape()),
                    "portrait" => Some(named),
                    _ => None,
                };
            }
            let w = parse_length(a)?;
            let h = parse_length(b)?;
            (w > 0.0 && h > 0.0).then_some(PageSize::Custom(w, h))
        }
        _ => None,
    }
}
