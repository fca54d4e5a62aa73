//! Markdown → standalone HTML5 document.
//!
//! Parsing and HTML emission are pulldown-cmark's; this stage only rewrites
//! the event stream before it is serialised:
//!
//! - soft line breaks become `<br />`, so a single newline in the source is
//!   a visible line break (what people writing notes expect)
//! - headings without an explicit `{#id}` get a slug id, de-duplicated with
//!   a numeric suffix, so every heading is linkable
//! - fenced code blocks in a known language are syntax highlighted
//!   (see [`highlight`](super::highlight))
//!
//! The fragment is then wrapped in a full document with the built-in
//! stylesheet, any custom CSS and the configured text direction.

use crate::config::{DocumentConfig, TextDirection};
use crate::pipeline::highlight::{highlight_code_blocks, highlight_css, HIGHLIGHT_CLASS};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

/// Stylesheet embedded when [`DocumentConfig::use_default_css`] is set.
pub const DEFAULT_CSS: &str = r#"body {
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  line-height: 1.6;
  max-width: 50em;
  margin: 2em auto;
  padding: 0 1em;
  color: #24292e;
}
h1, h2 { border-bottom: 1px solid #eaecef; padding-bottom: .3em; }
code, pre { font-family: SFMono-Regular, Consolas, Menlo, monospace; }
pre { background: #f6f8fa; padding: 1em; overflow: auto; }
blockquote { margin: 0; padding: 0 1em; color: #6a737d; border-left: .25em solid #dfe2e5; }
table { border-collapse: collapse; }
th, td { border: 1px solid #dfe2e5; padding: 6px 13px; }
img { max-width: 100%; }
"#;

/// Markdown extensions enabled on top of CommonMark.
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Render Markdown to an HTML fragment (the `<body>` contents).
pub fn render_fragment(markdown: &str) -> String {
    let events: Vec<Event<'_>> = Parser::new_ext(markdown, markdown_options())
        .map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        })
        .collect();
    let events = highlight_code_blocks(assign_heading_ids(events));

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Render Markdown to a complete HTML5 document.
pub fn render_document(markdown: &str, title: &str, config: &DocumentConfig) -> String {
    let body = render_fragment(markdown);

    let mut css = String::new();
    if config.use_default_css {
        css.push_str(DEFAULT_CSS);
        if body.contains(HIGHLIGHT_CLASS) {
            css.push_str(highlight_css());
        }
    }
    if let Some(custom) = &config.custom_css {
        css.push_str(custom);
        css.push('\n');
    }
    if let Some(dir) = config.text_direction {
        let align = match dir {
            TextDirection::Rtl => "right",
            TextDirection::Ltr => "left",
        };
        css.push_str(&format!(
            "body {{ direction: {}; text-align: {}; }}\n",
            dir.as_str(),
            align
        ));
    }

    let dir_attr = config
        .text_direction
        .map(|d| format!(" dir=\"{}\"", d.as_str()))
        .unwrap_or_default();

    let mut doc = String::with_capacity(body.len() + css.len() + 256);
    doc.push_str("<!DOCTYPE html>\n");
    doc.push_str(&format!("<html lang=\"en\"{dir_attr}>\n"));
    doc.push_str("<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str(&format!("<title>{}</title>\n", html_escape::encode_text(title)));
    if !css.is_empty() {
        doc.push_str("<style>\n");
        doc.push_str(&css);
        doc.push_str("</style>\n");
    }
    doc.push_str("</head>\n<body>\n");
    doc.push_str(&body);
    doc.push_str("</body>\n</html>\n");
    doc
}

/// GitHub-style anchor slug: lower-case, alphanumerics kept, runs of
/// spaces/hyphens/underscores collapsed to one hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

fn assign_heading_ids(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    // Explicit ids claim their slug first.
    for event in &events {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            seen.insert(id.to_string(), 1);
        }
    }

    for i in 0..events.len() {
        if !matches!(&events[i], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }
        let mut text = String::new();
        for event in &events[i + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
        }
        let slug = unique_slug(slugify(&text), &mut seen);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }
    events
}

fn unique_slug(base: String, seen: &mut HashMap<String, usize>) -> String {
    match seen.get_mut(&base) {
        None => {
            seen.insert(base.clone(), 1);
            base
        }
        Some(count) => {
            let mut n = *count;
            *count += 1;
            loop {
                let candidate = format!("{base}-{n}");
                if !seen.contains_key(&candidate) {
                    seen.insert(candidate.clone(), 1);
                    return candidate;
                }
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_get_slug_ids() {
        let html = render_fragment("# Getting Started\n\n## API & Usage\n");
        assert!(html.contains(r#"<h1 id="getting-started">Getting Started</h1>"#), "{html}");
        assert!(html.contains(r#"<h2 id="api-usage">"#), "{html}");
    }

    #[test]
    fn duplicate_headings_are_suffixed() {
        let html = render_fragment("# Notes\n\n# Notes\n\n# Notes\n");
        assert!(html.contains(r#"id="notes""#));
        assert!(html.contains(r#"id="notes-1""#));
        assert!(html.contains(r#"id="notes-2""#));
    }

    #[test]
    fn explicit_heading_id_kept() {
        let html = render_fragment("# Intro {#start}\n");
        assert!(html.contains(r#"id="start""#), "{html}");
    }

    #[test]
    fn soft_breaks_become_br() {
        let html = render_fragment("line one\nline two\n");
        assert!(html.contains("line one<br />"), "{html}");
    }

    #[test]
    fn extensions_enabled() {
        let html = render_fragment("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn document_wraps_fragment() {
        let config = DocumentConfig::builder()
            .text_direction(TextDirection::Rtl)
            .custom_css("p { color: red; }")
            .build()
            .unwrap();
        let doc = render_document("Hello", "A <b> & c", &config);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>A &lt;b&gt; &amp; c</title>"));
        assert!(doc.contains(r#"dir="rtl""#));
        assert!(doc.contains("direction: rtl"));
        assert!(doc.contains("p { color: red; }"));
        assert!(doc.contains("<p>Hello</p>"));
    }

    #[test]
    fn highlighted_code_pulls_in_its_css() {
        let doc = render_document("```python\nprint('hi')\n```\n", "t", &DocumentConfig::default());
        assert!(doc.contains(r#"class="codehilite""#), "{doc}");
        assert!(doc.contains(".hl-"), "{doc}");

        let plain = render_document("no code here", "t", &DocumentConfig::default());
        assert!(!plain.contains(".hl-"));
    }

    #[test]
    fn default_css_optional() {
        let config = DocumentConfig::builder().use_default_css(false).build().unwrap();
        let doc = render_document("x", "t", &config);
        assert!(!doc.contains("<style>"));
    }

    #[test]
    fn slugify_edge_cases() {
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("snake_case-name"), "snake-case-name");
        assert_eq!(slugify("???"), "section");
        assert_eq!(slugify("Überblick"), "überblick");
    }
}
