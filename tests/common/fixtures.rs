#![allow(dead_code)]

use scrollmark::{parse_html, Document, Rect};

/// Vertical distance between consecutive heading anchors in
/// [`laid_out_article`].
pub const SECTION_HEIGHT: f64 = 400.0;

/// First heading anchor top in [`laid_out_article`].
pub const FIRST_HEADING_Y: f64 = 200.0;

/// A rendered post the way the static site generator emits it: progress
/// bar, nested TOC, anchored headings with a subsection under every even
/// section, one footnote reference per section (the first one referenced
/// twice), pre-rendered zoom pairs and a right-hand overlay column.
pub fn article_html(sections: usize) -> String {
    let mut toc = String::new();
    let mut body = String::new();
    let mut notes = String::new();
    for s in 0..sections {
        let id = format!("s{}", s);
        toc.push_str(&format!("<li><a href=\"#{id}\">Section {s}</a>"));
        body.push_str(&format!(
            "<h2 id=\"{id}\"><a class=\"header-anchor\" href=\"#{id}\">Section {s}</a></h2>\n"
        ));
        body.push_str(&format!(
            "<p>Body {s}<sup class=\"footnote-ref\"><a href=\"#fn{n}\" id=\"fnref{n}\">{n}</a></sup></p>\n",
            n = s + 1
        ));
        if s == 0 {
            body.push_str(
                "<p>Again<sup class=\"footnote-ref\"><a href=\"#fn1\" id=\"fnref1:1\">1:1</a></sup></p>\n",
            );
        }
        if s % 2 == 0 {
            let sub = format!("{}-sub", id);
            toc.push_str(&format!("<ol><li><a href=\"#{sub}\">Sub {s}</a></li></ol>"));
            body.push_str(&format!(
                "<h3 id=\"{sub}\"><a class=\"header-anchor\" href=\"#{sub}\">Sub {s}</a></h3>\n"
            ));
        }
        toc.push_str("</li>\n");
        body.push_str(&format!(
            "<div class=\"expand-img\"><button aria-haspopup=\"dialog\" aria-label=\"Expand image\"><img src=\"img/{s}.webp\" alt=\"Figure {s}\"></button><dialog><img src=\"img/{s}.webp\" alt=\"Figure {s}\"></dialog></div>\n"
        ));
        notes.push_str(&format!(
            "<li id=\"fn{n}\" class=\"footnote-item\"><p>Note {n}. <a href=\"#fnref{n}\" class=\"footnote-backref\">\u{21a9}</a></p></li>\n",
            n = s + 1
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html><head><title>Post</title><style>.toc a {{ color: red }}</style></head><body>\n\
<div class=\"progress-bar\"><div class=\"progress-bar-inner\"></div></div>\n\
<main id=\"main\">\n<nav class=\"toc\"><ol>\n{toc}</ol></nav>\n<article>\n{body}\
<section class=\"footnotes\"><ol class=\"footnotes-list\">\n{notes}</ol></section>\n\
</article>\n</main>\n<div id=\"main-right\"></div>\n</body></html>\n"
    )
}

/// Parsed [`article_html`] with every heading anchor laid out
/// [`SECTION_HEIGHT`] apart, footnote references next to their heading and
/// the body box spanning the whole post.
pub fn laid_out_article(sections: usize) -> Document {
    let html = article_html(sections);
    let mut doc = parse_html(html.as_bytes()).unwrap_or_else(|e| panic!("fixture parse: {}", e));
    let anchors = doc.elements_by_class("header-anchor");
    for (i, anchor) in anchors.iter().enumerate() {
        let y = FIRST_HEADING_Y + SECTION_HEIGHT * i as f64;
        doc.set_layout(*anchor, Rect::new(40.0, y, 600.0, 32.0));
    }
    let refs = doc.elements_with_id_prefix_within(doc.root(), "a", "fnref");
    for (i, reference) in refs.iter().enumerate() {
        let y = FIRST_HEADING_Y + 60.0 + SECTION_HEIGHT * i as f64;
        doc.set_layout(*reference, Rect::new(400.0, y, 10.0, 14.0));
    }
    if let Some(body) = doc.body() {
        let height = FIRST_HEADING_Y + SECTION_HEIGHT * anchors.len() as f64;
        doc.set_layout(body, Rect::new(0.0, 0.0, 1280.0, height));
    }
    doc
}

/// Scroll offset that puts heading anchor `i` exactly at the viewport top.
pub fn scroll_to_heading(i: usize) -> f64 {
    FIRST_HEADING_Y + SECTION_HEIGHT * i as f64
}
