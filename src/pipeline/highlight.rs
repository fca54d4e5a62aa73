//! Syntax highlighting for fenced code blocks.
//!
//! A fenced block whose info string names a language syntect knows is
//! replaced by
//!
//! ```text
//! <div class="codehilite"><pre><code class="language-rust">…</code></pre></div>
//! ```
//!
//! with one classed `<span>` per scope. [`highlight_css`] holds the matching
//! colours. Blocks without a language, or in a language syntect does not
//! know, are left for pulldown-cmark to render as plain `<pre><code>`.

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Wrapper class on highlighted blocks.
pub const HIGHLIGHT_CLASS: &str = "codehilite";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

const THEME: &str = "InspiredGitHub";

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static CSS: Lazy<String> = Lazy::new(|| {
    let themes = ThemeSet::load_defaults();
    match themes.themes.get(THEME) {
        Some(theme) => css_for_theme_with_class_style(theme, CLASS_STYLE).unwrap_or_else(|e| {
            debug!("No highlight stylesheet: {}", e);
            String::new()
        }),
        None => String::new(),
    }
});

/// Stylesheet for the spans produced by [`highlight`].
pub fn highlight_css() -> &'static str {
    &CSS
}

/// Highlight `code` as `lang`. `None` when the language is unknown.
pub fn highlight(code: &str, lang: &str) -> Option<String> {
    let syntax = SYNTAXES.find_syntax_by_token(lang)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            debug!("Highlighting {} block failed: {}", lang, e);
            return None;
        }
    }
    Some(generator.finalize())
}

/// Replace every fenced code block in a known language with highlighted HTML.
pub fn highlight_code_blocks<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        let lang = match &event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => info
                .split(|c: char| c.is_whitespace() || c == ',')
                .next()
                .map(str::to_string)
                .filter(|l| !l.is_empty()),
            _ => None,
        };
        let Some(lang) = lang else {
            out.push(event);
            continue;
        };

        let mut block = vec![event];
        let mut code = String::new();
        for inner in iter.by_ref() {
            let end = matches!(inner, Event::End(TagEnd::CodeBlock));
            if let Event::Text(t) = &inner {
                code.push_str(t);
            }
            block.push(inner);
            if end {
                break;
            }
        }

        match highlight(&code, &lang) {
            Some(spans) => out.push(Event::Html(CowStr::from(format!(
                "<div class=\"{HIGHLIGHT_CLASS}\"><pre><code class=\"language-{}\">{}</code></pre></div>\n",
                html_escape::encode_double_quoted_attribute(&lang),
                spans
            )))),
            None => out.extend(block),
        }
    }
    out
}
