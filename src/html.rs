//! Load rendered HTML into a [`Document`].
//!
//! The input is whatever the site renderer emitted, so the reader is
//! lenient: void elements need no closing slash, unquoted and valueless
//! attributes are accepted, mismatched end tags close up to the nearest
//! matching open element and stray end tags are dropped. A `&` or `<` that
//! does not start a reference or a tag is read as literal text, and named
//! references resolve against the HTML5 entity table.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::dom::{is_void_element, Document, NodeId};
use crate::error::ScrollmarkError;

/// Structural limits applied while building the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HtmlLimits {
    /// Maximum number of nodes (elements and text runs).
    pub max_nodes: usize,
    /// Maximum element nesting depth.
    pub max_depth: usize,
    /// Maximum UTF-8 byte length of one attribute value.
    pub max_attr_bytes: usize,
}

impl Default for HtmlLimits {
    fn default() -> Self {
        Self {
            max_nodes: 1 << 20,
            max_depth: 256,
            max_attr_bytes: 64 * 1024,
        }
    }
}

impl HtmlLimits {
    /// Tighter bounds for untrusted snippets.
    pub fn compact() -> Self {
        Self {
            max_nodes: 16 * 1024,
            max_depth: 64,
            max_attr_bytes: 4096,
        }
    }
}

/// Elements whose content is raw text and never part of the tree.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse rendered HTML with [`HtmlLimits::default`].
pub fn parse_html(content: &[u8]) -> Result<Document, ScrollmarkError> {
    parse_html_with_limits(content, HtmlLimits::default())
}

/// Parse rendered HTML with explicit limits.
pub fn parse_html_with_limits(
    content: &[u8],
    limits: HtmlLimits,
) -> Result<Document, ScrollmarkError> {
    let content = strip_raw_text(content);
    let content = escape_bare_markup(&content);
    let mut reader = Reader::from_reader(content.as_ref());
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = Vec::with_capacity(32);
    let mut buf = Vec::with_capacity(256);

    loop {
        let parent = stack.last().copied().unwrap_or(doc.root());
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let node = element_from_start(&reader, &mut doc, &e, &limits)?;
                doc.append_child(parent, node);
                check_node_budget(&doc, &limits)?;
                // `<img>` and friends are written without the closing slash.
                if !doc.tag_name(node).is_some_and(is_void_element) {
                    if stack.len() >= limits.max_depth {
                        return Err(ScrollmarkError::limit(
                            "max_depth",
                            stack.len() + 1,
                            limits.max_depth,
                        ));
                    }
                    stack.push(node);
                }
            }
            Ok(Event::Empty(e)) => {
                let node = element_from_start(&reader, &mut doc, &e, &limits)?;
                doc.append_child(parent, node);
                check_node_budget(&doc, &limits)?;
            }
            Ok(Event::End(e)) => {
                let tag = decode_tag_name(&reader, e.name().as_ref())?;
                if is_void_element(&tag) {
                    buf.clear();
                    continue;
                }
                match stack
                    .iter()
                    .rposition(|open| doc.tag_name(*open) == Some(tag.as_str()))
                {
                    Some(pos) => stack.truncate(pos),
                    None => log::debug!("dropping stray </{}>", tag),
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|err| {
                    ScrollmarkError::parse(
                        format!("text decode error: {:?}", err),
                        reader.buffer_position(),
                    )
                })?;
                doc.append_text(parent, text.as_ref());
                check_node_budget(&doc, &limits)?;
            }
            Ok(Event::CData(e)) => {
                let text = reader.decoder().decode(&e).map_err(|err| {
                    ScrollmarkError::parse(
                        format!("cdata decode error: {:?}", err),
                        reader.buffer_position(),
                    )
                })?;
                doc.append_text(parent, text.as_ref());
                check_node_budget(&doc, &limits)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().map_err(|err| {
                    ScrollmarkError::parse(
                        format!("entity decode error: {:?}", err),
                        reader.buffer_position(),
                    )
                })?;
                let raw = format!("&{};", name);
                doc.append_text(parent, &unescape_html(&raw));
                check_node_budget(&doc, &limits)?;
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ScrollmarkError::parse(
                    format!("{:?}", err),
                    reader.buffer_position(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

fn check_node_budget(doc: &Document, limits: &HtmlLimits) -> Result<(), ScrollmarkError> {
    // The arena also holds the root.
    let nodes = doc.node_count().saturating_sub(1);
    if nodes > limits.max_nodes {
        return Err(ScrollmarkError::limit("max_nodes", nodes, limits.max_nodes));
    }
    Ok(())
}

/// Blank out the bodies of `<script>` and `<style>` elements, which are
/// raw text and would otherwise be tokenized as markup.
fn strip_raw_text(content: &[u8]) -> Cow<'_, [u8]> {
    let lower = content.to_ascii_lowercase();
    if next_raw_open(&lower, 0).is_none() {
        return Cow::Borrowed(content);
    }
    let mut out = Vec::with_capacity(content.len());
    let mut pos = 0usize;
    let mut search = 0usize;
    while let Some((tag, start)) = next_raw_open(&lower, search) {
        let Some(open_end) = find_bytes(&lower[start..], b">").map(|i| start + i + 1) else {
            break;
        };
        if lower[..open_end].ends_with(b"/>") {
            search = open_end;
            continue;
        }
        let close_pattern = format!("</{}", tag);
        let close = find_bytes(&lower[open_end..], close_pattern.as_bytes())
            .map(|i| open_end + i)
            .unwrap_or(content.len());
        out.extend_from_slice(&content[pos..open_end]);
        pos = close;
        search = close;
    }
    out.extend_from_slice(&content[pos..]);
    Cow::Owned(out)
}

/// Resolve character and HTML5 named references; unknown names stay
/// verbatim.
fn unescape_html(raw: &str) -> Cow<'_, str> {
    match unescape_with(raw, resolve_html5_entity) {
        Ok(resolved) => resolved,
        Err(_) => {
            let mut out = String::with_capacity(raw.len());
            let mut rest = raw;
            while let Some(amp) = rest.find('&') {
                out.push_str(&rest[..amp]);
                let tail = &rest[amp..];
                match tail.find(';') {
                    Some(end) => {
                        let reference = &tail[..=end];
                        match unescape_with(reference, resolve_html5_entity) {
                            Ok(v) => out.push_str(&v),
                            Err(_) => out.push_str(reference),
                        }
                        rest = &tail[end + 1..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            }
            out.push_str(rest);
            Cow::Owned(out)
        }
    }
}

/// Rewrite `&` and `<` that cannot start a reference or a tag as `&amp;`
/// and `&lt;`, so they reach the tree as text. Comments pass through.
fn escape_bare_markup(content: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0usize;
    let mut i = 0usize;
    while i < content.len() {
        let replacement: &[u8] = match content[i] {
            b'<' if content[i..].starts_with(b"<!--") => {
                i = find_bytes(&content[i + 4..], b"-->")
                    .map(|end| i + 4 + end + 3)
                    .unwrap_or(content.len());
                continue;
            }
            b'<' if opens_markup(&content[i + 1..]) => {
                i += 1;
                continue;
            }
            b'<' => b"&lt;",
            b'&' if is_reference(&content[i + 1..]) => {
                i += 1;
                continue;
            }
            b'&' => b"&amp;",
            _ => {
                i += 1;
                continue;
            }
        };
        let buf = out.get_or_insert_with(|| Vec::with_capacity(content.len() + 16));
        buf.extend_from_slice(&content[copied..i]);
        buf.extend_from_slice(replacement);
        i += 1;
        copied = i;
    }
    match out {
        Some(mut buf) => {
            buf.extend_from_slice(&content[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(content),
    }
}

/// Bytes after a `<`: a start tag, end tag, declaration or instruction.
fn opens_markup(rest: &[u8]) -> bool {
    match rest.first() {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'!') | Some(b'?') => true,
        Some(b'/') => rest.get(1).is_some_and(|b| b.is_ascii_alphabetic()),
        _ => false,
    }
}

/// Bytes after a `&`: `name;`, `#123;` or `#x1F;`.
fn is_reference(rest: &[u8]) -> bool {
    let (body, valid): (&[u8], fn(&u8) -> bool) = match rest {
        [b'#', b'x' | b'X', tail @ ..] => (tail, u8::is_ascii_hexdigit),
        [b'#', tail @ ..] => (tail, u8::is_ascii_digit),
        [first, ..] if first.is_ascii_alphabetic() => (rest, u8::is_ascii_alphanumeric),
        _ => return false,
    };
    let len = body.iter().take_while(|b| valid(*b)).count();
    len > 0 && body.get(len) == Some(&b';')
}

fn next_raw_open(lower: &[u8], from: usize) -> Option<(&'static str, usize)> {
    RAW_TEXT_ELEMENTS
        .iter()
        .filter_map(|tag| {
            let pattern = format!("<{}", tag);
            let mut offset = from;
            while let Some(i) = lower
                .get(offset..)
                .and_then(|rest| find_bytes(rest, pattern.as_bytes()))
            {
                let at = offset + i;
                let next = lower.get(at + pattern.len()).copied();
                if next.is_some_and(|b| b == b'>' || b == b'/' || b.is_ascii_whitespace()) {
                    return Some((*tag, at));
                }
                offset = at + pattern.len();
            }
            None
        })
        .min_by_key(|(_, at)| *at)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, ScrollmarkError> {
    let decoded = reader.decoder().decode(raw).map_err(|err| {
        ScrollmarkError::parse(
            format!("tag name decode error: {:?}", err),
            reader.buffer_position(),
        )
    })?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    doc: &mut Document,
    e: &BytesStart<'_>,
    limits: &HtmlLimits,
) -> Result<NodeId, ScrollmarkError> {
    let tag = decode_tag_name(reader, e.name().as_ref())?;
    let node = doc.create_element(&tag);
    for attr in e.html_attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        let raw = match reader.decoder().decode(&attr.value) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if raw.len() > limits.max_attr_bytes {
            return Err(ScrollmarkError::limit(
                "max_attr_bytes",
                raw.len(),
                limits.max_attr_bytes,
            ));
        }
        let value = unescape_html(&raw);
        if key == "style" {
            for (property, val) in parse_inline_style(&value) {
                doc.set_style(node, property, val);
            }
        } else {
            doc.set_attr(node, &key, &value);
        }
    }
    Ok(node)
}

/// Split `a: b; c: d` into trimmed pairs, skipping malformed declarations.
pub(crate) fn parse_inline_style(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (property, value) = decl.split_once(':')?;
        let property = property.trim();
        let value = value.trim();
        if property.is_empty() || value.is_empty() {
            return None;
        }
        Some((property, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toc_structure() {
        let html = br##"<!DOCTYPE html>
<html><body>
<nav class="toc"><ol>
  <li><a href="#one">One</a>
    <ol><li><a href="#one-a">One A</a></li></ol>
  </li>
  <li><a href="#two">Two</a></li>
</ol></nav>
</body></html>"##;
        let doc = parse_html(html).unwrap();
        let toc = doc.elements_by_class("toc");
        assert_eq!(toc.len(), 1);
        let list = doc.first_element_child(toc[0]).unwrap();
        assert_eq!(doc.tag_name(list), Some("ol"));
        assert_eq!(doc.children(list).count(), 2);
        let anchors = doc.elements_by_tag("a");
        let hrefs: Vec<_> = anchors.iter().filter_map(|a| doc.attr(*a, "href")).collect();
        assert_eq!(hrefs, vec!["#one", "#one-a", "#two"]);
    }

    #[test]
    fn test_void_elements_without_slash() {
        let html = br#"<p>before<img src="a.jpg" alt="A"><br>after</p><p>next</p>"#;
        let doc = parse_html(html).unwrap();
        let ps = doc.elements_by_tag("p");
        assert_eq!(ps.len(), 2);
        assert_eq!(doc.text_content(ps[0]), "beforeafter");
        let img = doc.elements_by_tag("img")[0];
        assert_eq!(doc.parent(img), Some(ps[0]));
        assert_eq!(doc.attr(img, "alt"), Some("A"));
    }

    #[test]
    fn test_valueless_and_unquoted_attributes() {
        let html = br#"<dialog open class=zoom><img src=x.png></dialog>"#;
        let doc = parse_html(html).unwrap();
        let dialog = doc.elements_by_tag("dialog")[0];
        assert!(doc.has_attr(dialog, "open"));
        assert!(doc.has_class(dialog, "zoom"));
        assert_eq!(doc.attr(doc.elements_by_tag("img")[0], "src"), Some("x.png"));
    }

    #[test]
    fn test_mismatched_end_closes_to_nearest_match() {
        let html = br#"<div><section><p>x</div><span>y</span>"#;
        let doc = parse_html(html).unwrap();
        let span = doc.elements_by_tag("span")[0];
        assert_eq!(doc.parent(span), Some(doc.root()));
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let html = br#"</p><div>ok</div>"#;
        let doc = parse_html(html).unwrap();
        assert_eq!(doc.elements_by_tag("div").len(), 1);
    }

    #[test]
    fn test_entities_resolve_or_stay_verbatim() {
        let html = b"<p>a &amp; b&nbsp;c &#65;&#x42; &bogus;</p>";
        let doc = parse_html(html).unwrap();
        let p = doc.elements_by_tag("p")[0];
        assert_eq!(doc.text_content(p), "a & b\u{a0}c AB &bogus;");
        assert_eq!(doc.child_nodes(p).len(), 1);
    }

    #[test]
    fn test_html5_entities_serialize_once() {
        let doc = parse_html(b"<p>&nbsp;x&copy;</p>").unwrap();
        let p = doc.elements_by_tag("p")[0];
        assert_eq!(doc.text_content(p), "\u{a0}x\u{a9}");
        assert_eq!(doc.outer_html(p), "<p>\u{a0}x\u{a9}</p>");
    }

    #[test]
    fn test_bare_ampersand_is_text() {
        let doc = parse_html(b"<body><p>Q&A session</p><p>R & D &c</p></body>").unwrap();
        let ps = doc.elements_by_tag("p");
        assert_eq!(doc.text_content(ps[0]), "Q&A session");
        assert_eq!(doc.text_content(ps[1]), "R & D &c");
        assert_eq!(doc.outer_html(ps[0]), "<p>Q&amp;A session</p>");
    }

    #[test]
    fn test_bare_less_than_is_text() {
        let doc = parse_html(b"<div><p>a < b</p><p>1 <= 2</p></div>").unwrap();
        let div = doc.elements_by_tag("div")[0];
        let ps = doc.elements_by_tag("p");
        assert_eq!(ps.len(), 2);
        assert_eq!(doc.children(div).count(), 2);
        assert_eq!(doc.text_content(ps[0]), "a < b");
        assert_eq!(doc.text_content(ps[1]), "1 <= 2");
        assert_eq!(doc.outer_html(ps[0]), "<p>a &lt; b</p>");
    }

    #[test]
    fn test_query_string_ampersand_in_attribute() {
        let doc = parse_html(br#"<a href="/s?q=1&page=2&amp;x=3" title="a < b">s</a>"#).unwrap();
        let a = doc.elements_by_tag("a")[0];
        assert_eq!(doc.attr(a, "href"), Some("/s?q=1&page=2&x=3"));
        assert_eq!(doc.attr(a, "title"), Some("a < b"));
    }

    #[test]
    fn test_comments_pass_through() {
        let doc = parse_html(b"<!-- a & b < c --><p>ok</p>").unwrap();
        assert_eq!(doc.text_content(doc.elements_by_tag("p")[0]), "ok");
    }

    #[test]
    fn test_script_content_is_skipped() {
        let html = br#"<body><SCRIPT type="module">if (a < b && c) { go("</p>"); }</script><p>text</p><style>p > a { color: red }</style></body>"#;
        let doc = parse_html(html).unwrap();
        let script = doc.elements_by_tag("script")[0];
        assert!(doc.child_nodes(script).is_empty());
        assert_eq!(doc.elements_by_tag("p").len(), 1);
        assert_eq!(doc.elements_by_tag("style").len(), 1);
    }

    #[test]
    fn test_self_closing_script_keeps_following_markup() {
        let html = br#"<script src="a.js"/><p>kept</p><script>x()</script>"#;
        let doc = parse_html(html).unwrap();
        assert_eq!(doc.text_content(doc.elements_by_tag("p")[0]), "kept");
    }

    #[test]
    fn test_inline_style_is_split() {
        let html = br#"<div style="width: 10%; opacity:0; bogus"></div>"#;
        let doc = parse_html(html).unwrap();
        let div = doc.elements_by_tag("div")[0];
        assert_eq!(doc.style(div, "width"), Some("10%"));
        assert_eq!(doc.style(div, "opacity"), Some("0"));
        assert_eq!(doc.attr(div, "style"), None);
    }

    #[test]
    fn test_depth_limit() {
        let mut html = String::new();
        for _ in 0..10 {
            html.push_str("<div>");
        }
        let limits = HtmlLimits {
            max_depth: 4,
            ..HtmlLimits::default()
        };
        let err = parse_html_with_limits(html.as_bytes(), limits).unwrap_err();
        assert!(matches!(
            err,
            ScrollmarkError::LimitExceeded {
                kind: "max_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_node_limit() {
        let html = "<p>x</p>".repeat(20);
        let limits = HtmlLimits {
            max_nodes: 8,
            ..HtmlLimits::compact()
        };
        let err = parse_html_with_limits(html.as_bytes(), limits).unwrap_err();
        assert!(matches!(
            err,
            ScrollmarkError::LimitExceeded {
                kind: "max_nodes",
                ..
            }
        ));
    }
}
