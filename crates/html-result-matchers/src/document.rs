//! Response bytes to a queryable HTML document.
//!
//! Encoding resolution order when decoding a body:
//!
//! 1. a byte order mark, which always wins
//! 2. the declared encoding (from response metadata)
//! 3. `<meta charset>` (or an `http-equiv` content type) when sniffing is
//!    enabled: a byte scan of the first `META_PRESCAN_BYTES`, then a query of
//!    the whole document parsed as UTF-8
//! 4. the configured default encoding
//!
//! Parsing itself never fails: the HTML parser recovers from any markup.
//! Failures come from unknown encoding labels and invalid selectors.

use std::borrow::Cow;
use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use regex::bytes::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::config::{DocumentConfig, ParseMode};
use crate::response::charset_from_content_type;
use crate::result::{MatchError, MatchResult};

/// How far into the body `<meta charset>` is scanned for before parsing
pub const META_PRESCAN_BYTES: usize = 5 * 1024;

/// Enclosing elements, nearest first, inspected for whitespace preservation
const PRESERVE_DEPTH: usize = 6;

/// Elements whose boundaries separate words in rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Elements holding script data rather than text
const DATA_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose text keeps its whitespace as written
const PRESERVE_ELEMENTS: &[&str] = &["pre", "plaintext", "textarea", "title"];

/// A response body parsed into an HTML tree
#[derive(Debug)]
pub struct ParsedDocument {
    html: Html,
}

impl ParsedDocument {
    /// Decode `content` and parse it according to `config`
    pub fn parse(
        content: &[u8],
        declared_encoding: Option<&str>,
        config: &DocumentConfig,
    ) -> MatchResult<Self> {
        let text = decode(content, declared_encoding, config)?;
        let html = match config.mode {
            ParseMode::Document => Html::parse_document(&text),
            ParseMode::Fragment => Html::parse_fragment(&text),
        };
        Ok(Self { html })
    }

    /// Elements matching `expression`, in document order
    pub fn select(&self, expression: &str) -> MatchResult<Vec<ElementRef<'_>>> {
        let selector = Selector::parse(expression).map_err(|e| MatchError::InvalidSelector {
            selector: expression.to_string(),
            message: e.to_string(),
        })?;
        Ok(self.html.select(&selector).collect())
    }
}

/// Decode a response body to text.
pub fn decode<'b>(
    content: &'b [u8],
    declared_encoding: Option<&str>,
    config: &DocumentConfig,
) -> MatchResult<Cow<'b, str>> {
    let encoding = match declared_encoding {
        Some(label) => lookup(label)?,
        None => sniff(content, config)?,
    };
    // decode() lets a BOM override the requested encoding
    let (text, used, malformed) = encoding.decode(content);
    trace!(
        requested = encoding.name(),
        used = used.name(),
        malformed,
        "decoded response body"
    );
    Ok(text)
}

fn lookup(label: &str) -> MatchResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| MatchError::UnknownEncoding {
        label: label.to_string(),
    })
}

fn sniff(content: &[u8], config: &DocumentConfig) -> MatchResult<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(content) {
        return Ok(encoding);
    }
    if config.sniff_meta_charset {
        if let Some(encoding) = meta_charset(content) {
            return Ok(encoding);
        }
    }
    lookup(&config.default_encoding)
}

fn meta_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i-u)<meta\b[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#)
            .expect("meta charset pattern is valid")
    })
}

fn meta_charset(content: &[u8]) -> Option<&'static Encoding> {
    let head = &content[..content.len().min(META_PRESCAN_BYTES)];
    let prescanned = meta_regex()
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = match prescanned {
        Some(encoding) => encoding,
        None if content.len() > META_PRESCAN_BYTES => declared_in_document(content)?,
        None => return None,
    };
    // A UTF-16 declaration readable as ASCII is a lie; the bytes are UTF-8
    if encoding == UTF_16LE || encoding == UTF_16BE {
        Some(UTF_8)
    } else {
        Some(encoding)
    }
}

/// First charset declared by a `<meta>` element anywhere in the document.
fn declared_in_document(content: &[u8]) -> Option<&'static Encoding> {
    static META: OnceLock<Option<Selector>> = OnceLock::new();
    let selector = META
        .get_or_init(|| Selector::parse("meta[charset], meta[http-equiv]").ok())
        .as_ref()?;
    let html = Html::parse_document(&String::from_utf8_lossy(content));
    let encoding = html.select(selector).find_map(|meta| {
        let meta = meta.value();
        let label = match meta.attr("charset") {
            Some(label) => label,
            None if meta
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type")) =>
            {
                charset_from_content_type(meta.attr("content")?)?
            }
            None => return None,
        };
        Encoding::for_label(label.trim().as_bytes())
    });
    trace!(found = encoding.map(Encoding::name), "queried document for meta charset");
    encoding
}

/// Text content of `element` as a reader would see it.
///
/// Text nodes are concatenated in document order and block-level
/// boundaries and `<br>` separate words. Whitespace runs collapse to one
/// space, except in text inside `pre`, `textarea`, `title` or `plaintext`
/// (up to six levels up), which is kept as written. The result is trimmed.
/// Script and style contents are not text.
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out.trim().to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let preserve = preserves_whitespace(element);
    for child in element.children() {
        match child.value() {
            Node::Text(text) if preserve => out.push_str(&text.text),
            Node::Text(text) => push_normalised(out, &text.text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if DATA_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    separate(out);
                }
                collect_text(child, out);
                if block {
                    separate(out);
                }
            }
            _ => {}
        }
    }
}

fn preserves_whitespace(parent: ElementRef<'_>) -> bool {
    std::iter::once(parent)
        .chain(parent.ancestors().filter_map(ElementRef::wrap))
        .take(PRESERVE_DEPTH)
        .any(|element| PRESERVE_ELEMENTS.contains(&element.value().name()))
}

fn ends_in_whitespace(out: &str) -> bool {
    out.chars().next_back().is_some_and(char::is_whitespace)
}

fn separate(out: &mut String) {
    if !out.is_empty() && !ends_in_whitespace(out) {
        out.push(' ');
    }
}

fn push_normalised(out: &mut String, text: &str) {
    for c in text.chars() {
        if !c.is_whitespace() {
            out.push(c);
        } else if !out.is_empty() && !ends_in_whitespace(out) {
            out.push(' ');
        }
    }
}
