//! Document pipeline stages used by the non-image converters.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the converters only compose them.
//!
//! ## Data Flow
//!
//! ```text
//!  Markdown ──▶ markdown ──▶ HTML ──▶ html_text ──▶ blocks ──▶ pdf_layout ──▶ PDF
//!                                 └─▶ stylesheet ──▶ page style ─┘
//!
//!  PDF ──▶ (lopdf text extraction) ──▶ pages ──▶ docx ──▶ DOCX
//! ```
//!
//! 1. [`markdown`]: pulldown-cmark rendering with heading anchors, with
//!    [`highlight`] colouring fenced code
//! 2. [`html_text`]: lol_html scan into headings, paragraphs, lists…
//! 3. [`stylesheet`]: the `@page` / `body` CSS subset
//! 4. [`pdf_layout`]: wrapping, pagination and PDF serialisation
//! 5. [`docx`]: WordprocessingML packaging

pub mod docx;
pub mod highlight;
pub mod html_text;
pub mod markdown;
pub mod pdf_layout;
pub mod stylesheet;
