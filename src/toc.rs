//! Table-of-contents index.
//!
//! The renderer emits the TOC as nested lists:
//!
//! ```html
//! <nav class="toc">
//!   <ol>
//!     <li><a href="#intro">Intro</a>
//!       <ol><li><a href="#intro-why">Why</a></li></ol>
//!     </li>
//!   </ol>
//! </nav>
//! ```
//!
//! Each list item's first element child is its entry anchor; anything after
//! it may hold a nested list.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::dom::{Document, NodeId};

/// Default cap on list nesting.
pub const DEFAULT_MAX_TOC_DEPTH: usize = 64;

/// Normalize an `href` to the key used for matching: the fragment
/// (including `#`) when present, the whole value otherwise.
///
/// `page.html#intro` and `#intro` both map to `#intro`, the way resolved
/// anchor URLs on the same page compare equal in a browser.
pub fn fragment_key(href: &str) -> &str {
    match href.find('#') {
        Some(pos) => &href[pos..],
        None => href,
    }
}

/// A single TOC line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// Matching key, see [`fragment_key`].
    pub key: String,
    /// Raw `href` attribute of the anchor.
    pub href: String,
    /// Anchor text.
    pub label: String,
    /// List nesting level, 0 for top-level items.
    pub depth: usize,
    /// The anchor element.
    pub node: NodeId,
}

/// Map from fragment key to TOC entry, in document order.
#[derive(Clone, Debug, Default)]
pub struct TocIndex {
    entries: Vec<TocEntry>,
    by_key: HashMap<String, usize>,
}

impl TocIndex {
    /// Index the list rooted at `list_root` (normally the `<ol>` inside the
    /// TOC container).
    pub fn build(doc: &Document, list_root: NodeId) -> Self {
        Self::build_with_max_depth(doc, list_root, DEFAULT_MAX_TOC_DEPTH)
    }

    pub fn build_with_max_depth(doc: &Document, list_root: NodeId, max_depth: usize) -> Self {
        let mut index = Self::default();
        index.link_anchors(doc, list_root, 0, max_depth);
        index
    }

    fn link_anchors(&mut self, doc: &Document, element: NodeId, depth: usize, max_depth: usize) {
        if depth > max_depth {
            log::warn!(
                "TOC nesting depth {} exceeds max_depth ({}); ignoring deeper entries",
                depth,
                max_depth
            );
            return;
        }
        let children: SmallVec<[NodeId; 16]> = doc.children(element).collect();
        for child in children {
            match doc.tag_name(child) {
                Some("ol") | Some("ul") => self.link_anchors(doc, child, depth, max_depth),
                Some("li") => {
                    let mut rest = doc.children(child);
                    if let Some(anchor) = rest.next() {
                        self.register(doc, anchor, depth);
                    }
                    let nested: SmallVec<[NodeId; 4]> = rest.collect();
                    for next in nested {
                        self.link_anchors(doc, next, depth + 1, max_depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn register(&mut self, doc: &Document, anchor: NodeId, depth: usize) {
        let Some(href) = doc.attr(anchor, "href") else {
            log::debug!("TOC item without href skipped");
            return;
        };
        let entry = TocEntry {
            key: fragment_key(href).to_string(),
            href: href.to_string(),
            label: doc.text_content(anchor).trim().to_string(),
            depth,
            node: anchor,
        };
        match self.by_key.get(&entry.key) {
            Some(&slot) => {
                log::debug!("duplicate TOC href {}; later entry wins", entry.href);
                self.entries[slot] = entry;
            }
            None => {
                self.by_key.insert(entry.key.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Look up by raw `href` or key.
    pub fn get(&self, href: &str) -> Option<&TocEntry> {
        self.by_key
            .get(fragment_key(href))
            .and_then(|slot| self.entries.get(*slot))
    }

    /// Document-order slot of the entry for `href`.
    pub fn position(&self, href: &str) -> Option<usize> {
        self.by_key.get(fragment_key(href)).copied()
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
