//! Scroll-spy: keep the TOC entry of the heading nearest the viewport top
//! marked as current.
//!
//! Scroll events only record the latest position. The nearest-heading
//! search runs once per animation frame no matter how many scroll events
//! arrived since the previous one.

use crate::coalesce::{Coalescer, Schedule};
use crate::dom::{Document, NodeId};
use crate::geometry::Viewport;
use crate::toc::{fragment_key, TocIndex, DEFAULT_MAX_TOC_DEPTH};

/// Class names and marker values used by [`ScrollSpy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollSpyOptions {
    /// Class of the TOC container; its first element child is the list.
    pub toc_class: String,
    /// Class of the anchors generated inside headings.
    pub heading_class: String,
    /// Deepest list level indexed.
    pub max_depth: usize,
    /// `aria-current` value of the current entry.
    pub current_value: String,
    /// `aria-current` value written to an entry when it stops being current.
    pub cleared_value: String,
}

impl Default for ScrollSpyOptions {
    fn default() -> Self {
        Self {
            toc_class: "toc".to_string(),
            heading_class: "header-anchor".to_string(),
            max_depth: DEFAULT_MAX_TOC_DEPTH,
            current_value: "location".to_string(),
            cleared_value: "false".to_string(),
        }
    }
}

/// An anchor generated inside a heading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingAnchor {
    pub node: NodeId,
    /// Fragment key of the anchor's `href`.
    pub key: String,
}

/// Heading whose box top is closest to the viewport top, by absolute
/// distance. Ties go to the earlier heading; headings that were never laid
/// out are ignored.
pub fn nearest_heading<'a>(
    doc: &Document,
    viewport: &Viewport,
    headings: &'a [HeadingAnchor],
) -> Option<&'a HeadingAnchor> {
    let mut best: Option<(&HeadingAnchor, f64)> = None;
    for heading in headings {
        let Some(rect) = doc.client_rect(heading.node, viewport) else {
            continue;
        };
        let distance = rect.top().abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((heading, distance));
        }
    }
    best.map(|(heading, _)| heading)
}

/// One scroll-spy instance over one TOC.
#[derive(Clone, Debug)]
pub struct ScrollSpy {
    options: ScrollSpyOptions,
    index: TocIndex,
    headings: Vec<HeadingAnchor>,
    current: Option<usize>,
    frames: Coalescer<f64>,
    recomputations: u64,
}

impl ScrollSpy {
    /// Attach to the first TOC in the document. Returns `None` when the page
    /// has no TOC container.
    pub fn attach(doc: &Document, viewport: &Viewport, options: ScrollSpyOptions) -> Option<Self> {
        Self::attach_within(doc, doc.root(), viewport, options)
    }

    /// Attach to the first TOC beneath `scope`, tracking only headings
    /// beneath `scope`.
    pub fn attach_within(
        doc: &Document,
        scope: NodeId,
        viewport: &Viewport,
        options: ScrollSpyOptions,
    ) -> Option<Self> {
        let Some(container) = doc
            .elements_by_class_within(scope, &options.toc_class)
            .first()
            .copied()
        else {
            log::debug!("no .{} container; scroll-spy disabled", options.toc_class);
            return None;
        };
        let Some(list) = doc.first_element_child(container) else {
            log::debug!("empty .{} container; scroll-spy disabled", options.toc_class);
            return None;
        };
        let index = TocIndex::build_with_max_depth(doc, list, options.max_depth);

        let mut headings: Vec<HeadingAnchor> = doc
            .elements_by_class_within(scope, &options.heading_class)
            .into_iter()
            .filter_map(|node| {
                doc.attr(node, "href").map(|href| HeadingAnchor {
                    node,
                    key: fragment_key(href).to_string(),
                })
            })
            .collect();
        headings.sort_by(|a, b| {
            let ay = doc.bounding_client_rect(a.node, viewport).top();
            let by = doc.bounding_client_rect(b.node, viewport).top();
            ay.total_cmp(&by)
        });

        Some(Self {
            options,
            index,
            headings,
            current: None,
            frames: Coalescer::new(),
            recomputations: 0,
        })
    }

    /// Record a scroll event. Returns `true` when the host must schedule an
    /// animation frame.
    pub fn on_scroll(&mut self, scroll_y: f64) -> bool {
        matches!(self.frames.push(scroll_y), Schedule::Requested)
    }

    pub fn needs_frame(&self) -> bool {
        self.frames.is_pending()
    }

    /// Run the pending recomputation, if any. Returns whether the current
    /// entry changed.
    pub fn on_frame(&mut self, doc: &mut Document, viewport: &Viewport) -> bool {
        if self.frames.take().is_none() {
            return false;
        }
        self.recompute(doc, viewport)
    }

    /// Find the nearest heading and move the current marker to its entry.
    pub fn recompute(&mut self, doc: &mut Document, viewport: &Viewport) -> bool {
        self.recomputations += 1;
        let Some(nearest) = nearest_heading(doc, viewport, &self.headings) else {
            return false;
        };
        let Some(slot) = self.index.position(&nearest.key) else {
            log::debug!("heading {} has no TOC entry; keeping marker", nearest.key);
            return false;
        };
        if self.current == Some(slot) {
            return false;
        }
        if let Some(previous) = self.current.and_then(|s| self.index.entries().get(s)) {
            doc.set_attr(previous.node, "aria-current", &self.options.cleared_value);
        }
        if let Some(entry) = self.index.entries().get(slot) {
            log::trace!("scroll-spy current -> {}", entry.key);
            doc.set_attr(entry.node, "aria-current", &self.options.current_value);
        }
        self.current = Some(slot);
        true
    }

    /// Key of the current entry.
    pub fn current_href(&self) -> Option<&str> {
        self.current
            .and_then(|slot| self.index.entries().get(slot))
            .map(|e| e.key.as_str())
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current
            .and_then(|slot| self.index.entries().get(slot))
            .map(|e| e.node)
    }

    pub fn index(&self) -> &TocIndex {
        &self.index
    }

    pub fn headings(&self) -> &[HeadingAnchor] {
        &self.headings
    }

    /// Recomputations run so far.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Scroll events seen so far.
    pub fn scroll_events(&self) -> u64 {
        self.frames.pushed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::html::parse_html;

    const ARTICLE: &[u8] = br##"<html><body>
<nav class="toc"><ol>
  <li><a href="#a">A</a><ol><li><a href="#a1">A1</a></li></ol></li>
  <li><a href="#b">B</a></li>
</ol></nav>
<h2><a class="header-anchor" href="#a">A</a></h2>
<h3><a class="header-anchor" href="#a1">A1</a></h3>
<h2><a class="header-anchor" href="#b">B</a></h2>
<h2><a class="header-anchor" href="#orphan">Orphan</a></h2>
</body></html>"##;

    fn laid_out(positions: &[f64]) -> Document {
        let mut doc = parse_html(ARTICLE).unwrap();
        let anchors = doc.elements_by_class("header-anchor");
        for (node, y) in anchors.iter().zip(positions) {
            doc.set_layout(*node, Rect::new(0.0, *y, 400.0, 30.0));
        }
        doc
    }

    fn marked(doc: &Document, spy: &ScrollSpy) -> Vec<(String, String)> {
        spy.index()
            .entries()
            .iter()
            .filter_map(|e| {
                doc.attr(e.node, "aria-current")
                    .map(|v| (e.key.clone(), v.to_string()))
            })
            .collect()
    }

    #[test]
    fn test_no_toc_means_no_spy() {
        let doc = parse_html(br#"<body><h2><a class="header-anchor" href="x">x</a></h2></body>"#)
            .unwrap();
        assert!(ScrollSpy::attach(&doc, &Viewport::new(800.0, 600.0), Default::default()).is_none());
    }

    #[test]
    fn test_nearest_uses_absolute_distance() {
        let doc = laid_out(&[-50.0, 10.0, 200.0, 5000.0]);
        let vp = Viewport::new(800.0, 600.0);
        let spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();
        let nearest = nearest_heading(&doc, &vp, spy.headings()).unwrap();
        assert_eq!(nearest.key, "#a1");
    }

    #[test]
    fn test_ties_go_to_first_heading() {
        let doc = laid_out(&[-20.0, 20.0, 900.0, 5000.0]);
        let vp = Viewport::new(800.0, 600.0);
        let spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();
        assert_eq!(nearest_heading(&doc, &vp, spy.headings()).unwrap().key, "#a");
    }

    #[test]
    fn test_burst_of_scrolls_recomputes_once() {
        let mut doc = laid_out(&[100.0, 700.0, 1500.0, 5000.0]);
        let vp = Viewport::new(800.0, 600.0);
        let mut spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();
        let mut requested = 0;
        for step in 0..100 {
            if spy.on_scroll(step as f64) {
                requested += 1;
            }
        }
        assert_eq!(requested, 1);
        spy.on_frame(&mut doc, &vp.scrolled_to(99.0));
        spy.on_frame(&mut doc, &vp.scrolled_to(99.0));
        assert_eq!(spy.recomputations(), 1);
        assert_eq!(spy.scroll_events(), 100);
        assert_eq!(spy.current_href(), Some("#a"));
    }

    #[test]
    fn test_marker_moves_and_stays_unique() {
        let mut doc = laid_out(&[100.0, 700.0, 1500.0, 5000.0]);
        let vp = Viewport::new(800.0, 600.0);
        let mut spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();

        for y in [0.0, 650.0, 1480.0, 690.0] {
            spy.on_scroll(y);
            spy.on_frame(&mut doc, &vp.scrolled_to(y));
            let current: Vec<_> = marked(&doc, &spy)
                .into_iter()
                .filter(|(_, v)| v == "location")
                .collect();
            assert_eq!(current.len(), 1, "scroll {}", y);
        }
        assert_eq!(spy.current_href(), Some("#a1"));
        assert_eq!(
            marked(&doc, &spy),
            vec![
                ("#a".to_string(), "false".to_string()),
                ("#a1".to_string(), "location".to_string()),
                ("#b".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_heading_without_entry_keeps_marker() {
        let mut doc = laid_out(&[100.0, 700.0, 1500.0, 3000.0]);
        let vp = Viewport::new(800.0, 600.0);
        let mut spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();
        spy.on_scroll(1500.0);
        spy.on_frame(&mut doc, &vp.scrolled_to(1500.0));
        assert_eq!(spy.current_href(), Some("#b"));

        spy.on_scroll(3000.0);
        assert!(!spy.on_frame(&mut doc, &vp.scrolled_to(3000.0)));
        assert_eq!(spy.current_href(), Some("#b"));
        assert_eq!(spy.recomputations(), 2);
    }

    #[test]
    fn test_no_headings_is_a_no_op() {
        let mut doc = parse_html(
            br##"<nav class="toc"><ol><li><a href="#a">A</a></li></ol></nav><p>text</p>"##,
        )
        .unwrap();
        let vp = Viewport::new(800.0, 600.0);
        let mut spy = ScrollSpy::attach(&doc, &vp, ScrollSpyOptions::default()).unwrap();
        spy.on_scroll(10.0);
        assert!(!spy.on_frame(&mut doc, &vp));
        assert_eq!(spy.current_href(), None);
    }

    #[test]
    fn test_scoped_instances_do_not_share_state() {
        let mut doc = parse_html(
            br##"<body>
<section id="one"><nav class="toc"><ol><li><a href="#x">X</a></li></ol></nav>
<h2><a class="header-anchor" href="#x">X</a></h2></section>
<section id="two"><nav class="toc"><ol><li><a href="#y">Y</a></li></ol></nav>
<h2><a class="header-anchor" href="#y">Y</a></h2></section>
</body>"##,
        )
        .unwrap();
        for (i, node) in doc.elements_by_class("header-anchor").into_iter().enumerate() {
            doc.set_layout(node, Rect::new(0.0, 100.0 + 500.0 * i as f64, 100.0, 20.0));
        }
        let vp = Viewport::new(800.0, 600.0);
        let one = doc.element_by_id("one").unwrap();
        let two = doc.element_by_id("two").unwrap();
        let mut spy_one = ScrollSpy::attach_within(&doc, one, &vp, Default::default()).unwrap();
        let mut spy_two = ScrollSpy::attach_within(&doc, two, &vp, Default::default()).unwrap();

        spy_one.on_scroll(0.0);
        spy_one.on_frame(&mut doc, &vp);
        assert_eq!(spy_one.current_href(), Some("#x"));
        assert!(!spy_two.needs_frame());
        assert_eq!(spy_two.current_href(), None);

        spy_two.on_scroll(0.0);
        spy_two.on_frame(&mut doc, &vp);
        assert_eq!(spy_two.current_href(), Some("#y"));
        assert_eq!(spy_one.current_href(), Some("#x"));
    }
}
