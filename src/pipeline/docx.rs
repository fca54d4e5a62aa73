//! Plain text pages → minimal WordprocessingML (`.docx`) package.
//!
//! The package holds the four parts Word needs to open a document:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! word/document.xml
//! docProps/core.xml
//! ```
//!
//! Each non-blank line becomes a paragraph, runs of blank lines become one
//! empty paragraph, and pages are separated by explicit page breaks.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML serialisation error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error while packaging: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, DocxError>;

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_WORDML: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_CORE: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

const TYPE_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const TYPE_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";

/// Package `pages` (one string per source page) as a `.docx` file.
pub fn build_docx(pages: &[String], title: &str) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types_xml()?)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&package_rels_xml()?)?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(&document_xml(pages)?)?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(&core_xml(title)?)?;

    Ok(zip.finish()?.into_inner())
}

fn new_part() -> Result<Writer<Cursor<Vec<u8>>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn finish_part(writer: Writer<Cursor<Vec<u8>>>) -> Vec<u8> {
    writer.into_inner().into_inner()
}

fn content_types_xml() -> Result<Vec<u8>> {
    let mut w = new_part()?;
    w.write_event(Event::Start(
        BytesStart::new("Types").with_attributes([("xmlns", NS_CONTENT_TYPES)]),
    ))?;
    for (ext, content_type) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
    ] {
        w.write_event(Event::Empty(
            BytesStart::new("Default").with_attributes([("Extension", ext), ("ContentType", content_type)]),
        ))?;
    }
    for (part, content_type) in [("/word/document.xml", TYPE_DOCUMENT), ("/docProps/core.xml", TYPE_CORE)] {
        w.write_event(Event::Empty(
            BytesStart::new("Override").with_attributes([("PartName", part), ("ContentType", content_type)]),
        ))?;
    }
    w.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(finish_part(w))
}

fn package_rels_xml() -> Result<Vec<u8>> {
    let mut w = new_part()?;
    w.write_event(Event::Start(
        BytesStart::new("Relationships").with_attributes([("xmlns", NS_RELATIONSHIPS)]),
    ))?;
    for (id, rel_type, target) in [
        ("rId1", REL_OFFICE_DOCUMENT, "word/document.xml"),
        ("rId2", REL_CORE_PROPERTIES, "docProps/core.xml"),
    ] {
        w.write_event(Event::Empty(BytesStart::new("Relationship").with_attributes([
            ("Id", id),
            ("Type", rel_type),
            ("Target", target),
        ])))?;
    }
    w.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(finish_part(w))
}

fn document_xml(pages: &[String]) -> Result<Vec<u8>> {
    let mut w = new_part()?;
    w.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", NS_WORDML)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("w:body")))?;

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            w.write_event(Event::Start(BytesStart::new("w:p")))?;
            w.write_event(Event::Start(BytesStart::new("w:r")))?;
            w.write_event(Event::Empty(BytesStart::new("w:br").with_attributes([("w:type", "page")])))?;
            w.write_event(Event::End(BytesEnd::new("w:r")))?;
            w.write_event(Event::End(BytesEnd::new("w:p")))?;
        }
        let mut previous_blank = true;
        for line in page.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                if !previous_blank {
                    w.write_event(Event::Empty(BytesStart::new("w:p")))?;
                }
                previous_blank = true;
                continue;
            }
            previous_blank = false;
            w.write_event(Event::Start(BytesStart::new("w:p")))?;
            w.write_event(Event::Start(BytesStart::new("w:r")))?;
            w.write_event(Event::Start(
                BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
            ))?;
            w.write_event(Event::Text(BytesText::new(&xml_safe(line))))?;
            w.write_event(Event::End(BytesEnd::new("w:t")))?;
            w.write_event(Event::End(BytesEnd::new("w:r")))?;
            w.write_event(Event::End(BytesEnd::new("w:p")))?;
        }
    }

    w.write_event(Event::Empty(BytesStart::new("w:sectPr")))?;
    w.write_event(Event::End(BytesEnd::new("w:body")))?;
    w.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(finish_part(w))
}

fn core_xml(title: &str) -> Result<Vec<u8>> {
    let mut w = new_part()?;
    w.write_event(Event::Start(
        BytesStart::new("cp:coreProperties").with_attributes([("xmlns:cp", NS_CORE), ("xmlns:dc", NS_DC)]),
    ))?;
    write_simple_element(&mut w, "dc:title", &xml_safe(title))?;
    write_simple_element(&mut w, "dc:creator", "file-converter")?;
    w.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
    Ok(finish_part(w))
}

fn write_simple_element<W: Write>(w: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Drop code points XML 1.0 forbids; quick-xml escapes markup but keeps these.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    let forbidden =
        |c: char| ((c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{FFFE}' || c == '\u{FFFF}';
    if text.chars().any(forbidden) {
        Cow::Owned(text.chars().filter(|&c| !forbidden(c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut s = String::new();
        part.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn package_has_required_parts() {
        let bytes = build_docx(&["Hello".into()], "Doc").unwrap();
        let archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "docProps/core.xml", "word/document.xml"]
        );
    }

    #[test]
    fn lines_become_paragraphs_with_page_breaks() {
        let pages = vec!["First line\nSecond & last\n\n\n".to_string(), "Page two".to_string()];
        let bytes = build_docx(&pages, "T").unwrap();
        let xml = read_part(&bytes, "word/document.xml");

        assert!(xml.contains(">First line</w:t>"));
        assert!(xml.contains(">Second &amp; last</w:t>"));
        assert_eq!(xml.matches("w:type=\"page\"").count(), 1);
        assert_eq!(xml.matches("<w:p/>").count(), 1);
        assert!(xml.find("Second").unwrap() < xml.find("Page two").unwrap());
    }

    #[test]
    fn parts_are_well_formed_xml() {
        let bytes = build_docx(&["a < b & c".into(), "\"quoted\"".into()], "T").unwrap();
        for part in ["[Content_Types].xml", "_rels/.rels", "word/document.xml", "docProps/core.xml"] {
            let xml = read_part(&bytes, part);
            let mut reader = quick_xml::Reader::from_str(&xml);
            loop {
                match reader.read_event() {
                    Ok(quick_xml::events::Event::Eof) => break,
                    Ok(_) => {}
                    Err(e) => panic!("{part} is not well formed: {e}"),
                }
            }
        }
    }

    #[test]
    fn title_escaped_in_core_properties() {
        let bytes = build_docx(&[], "R&D <draft>").unwrap();
        let core = read_part(&bytes, "docProps/core.xml");
        assert!(core.contains("<dc:title>R&amp;D &lt;draft&gt;</dc:title>"));
    }

    #[test]
    fn control_characters_dropped() {
        assert_eq!(xml_safe("a\u{1}b\tc"), "ab\tc");
        let bytes = build_docx(&["bell\u{7} ring".into()], "T").unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains(">bell ring</w:t>"), "{xml}");
    }
}
