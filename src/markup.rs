//! Build-time rewrites that produce the markup the widgets expect.
//!
//! These run once over rendered article HTML before it is written out:
//! wrapping images into pre-rendered zoom pairs, shifting heading levels
//! below the page title, turning blockquotes into side notes and adding
//! ARIA roles to footnote links.

use crate::dom::{Document, NodeId};

/// Which rewrites [`apply`] runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupOptions {
    pub prerender_zoom: bool,
    pub shift_headings: bool,
    pub blockquote_asides: bool,
    pub annotate_footnotes: bool,
    /// `id` prefix of footnote reference anchors.
    pub ref_prefix: String,
    /// Class of the "back to text" links inside footnote bodies.
    pub backref_class: String,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            prerender_zoom: true,
            shift_headings: true,
            blockquote_asides: true,
            annotate_footnotes: true,
            ref_prefix: "fnref".to_string(),
            backref_class: "footnote-backref".to_string(),
        }
    }
}

/// Number of nodes each rewrite touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarkupReport {
    pub zoom_pairs: usize,
    pub headings: usize,
    pub asides: usize,
    pub footnote_links: usize,
}

/// Run every rewrite enabled in `options`.
pub fn apply(doc: &mut Document, options: &MarkupOptions) -> MarkupReport {
    let mut report = MarkupReport::default();
    if options.prerender_zoom {
        report.zoom_pairs = prerender_zoom_pairs(doc);
    }
    if options.shift_headings {
        report.headings = shift_heading_levels(doc);
    }
    if options.blockquote_asides {
        report.asides = blockquotes_to_asides(doc);
    }
    if options.annotate_footnotes {
        report.footnote_links =
            annotate_footnote_links(doc, &options.ref_prefix, &options.backref_class);
    }
    log::debug!("markup rewrites: {:?}", report);
    report
}

/// Wrap every image into
/// `<div class="expand-img"><button ...>IMG</button><dialog>IMG</dialog></div>`.
///
/// Images already inside an `.expand-img` wrapper are left alone, so the
/// rewrite can run twice.
pub fn prerender_zoom_pairs(doc: &mut Document) -> usize {
    let images: Vec<NodeId> = doc
        .elements_by_tag("img")
        .into_iter()
        .filter(|img| {
            !doc.ancestors_inclusive(*img)
                .iter()
                .any(|a| doc.has_class(*a, "expand-img"))
        })
        .collect();

    let mut wrapped = 0;
    for img in images {
        let Some(copy) = doc.clone_subtree(img) else {
            continue;
        };
        let wrapper = doc.create_element("div");
        if !doc.replace(img, wrapper) {
            continue;
        }
        doc.set_attr(wrapper, "class", "expand-img");

        let button = doc.create_element("button");
        doc.set_attr(button, "aria-haspopup", "dialog");
        doc.set_attr(button, "aria-label", "Expand image");
        doc.append_child(button, img);

        let dialog = doc.create_element("dialog");
        doc.append_child(dialog, copy);

        doc.append_child(wrapper, button);
        doc.append_child(wrapper, dialog);
        wrapped += 1;
    }
    wrapped
}

/// Demote `h1`..`h5` by one level so the page title stays the only `h1`.
/// `h6` has nowhere to go and stays.
pub fn shift_heading_levels(doc: &mut Document) -> usize {
    let headings: Vec<(NodeId, u8)> = doc
        .descendants(doc.root())
        .filter_map(|node| heading_level(doc.tag_name(node)?).map(|level| (node, level)))
        .collect();
    let mut shifted = 0;
    for (node, level) in headings {
        if level < 6 {
            doc.set_tag_name(node, &format!("h{}", level + 1));
            shifted += 1;
        }
    }
    shifted
}

fn heading_level(tag: &str) -> Option<u8> {
    let digit = tag.strip_prefix('h')?;
    match digit.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Render blockquotes as `<aside class="side-info">`.
pub fn blockquotes_to_asides(doc: &mut Document) -> usize {
    let quotes = doc.elements_by_tag("blockquote");
    for quote in &quotes {
        doc.set_tag_name(*quote, "aside");
        doc.add_class(*quote, "side-info");
    }
    quotes.len()
}

/// Give footnote references and back links their document roles.
pub fn annotate_footnote_links(doc: &mut Document, ref_prefix: &str, backref_class: &str) -> usize {
    let refs = doc.elements_with_id_prefix_within(doc.root(), "a", ref_prefix);
    for node in &refs {
        doc.set_attr(*node, "role", "doc-noteref");
        doc.set_attr(*node, "aria-label", "go to footnote");
    }
    let backs = doc.elements_by_class(backref_class);
    for node in &backs {
        doc.set_attr(*node, "role", "doc-backlink");
        doc.set_attr(*node, "aria-label", "back to text");
    }
    refs.len() + backs.len()
}

/// Footnote number without brackets: zero-based `id` 0 is `"1"`, and
/// repeated references carry their sub-index, `"1:2"`.
pub fn footnote_caption(id: usize, sub_id: usize) -> String {
    let mut caption = (id + 1).to_string();
    if sub_id > 0 {
        caption.push(':');
        caption.push_str(&sub_id.to_string());
    }
    caption
}
