//! Reading progress bar.
//!
//! Every `.progress-bar` element's first child is stretched to the share of
//! the scrollable distance already covered.

use crate::dom::{Document, NodeId};
use crate::geometry::Viewport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressOptions {
    pub bar_class: String,
    /// Clamp the fraction into `[0, 1]` before writing it. Off by default:
    /// overscroll produces widths beyond the range and the stylesheet caps
    /// them.
    pub clamp: bool,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            bar_class: "progress-bar".to_string(),
            clamp: false,
        }
    }
}

/// `scroll_y / (document_height - viewport_height)`, or `None` when the
/// document does not overflow the viewport.
pub fn scroll_fraction(scroll_y: f64, document_height: f64, viewport_height: f64) -> Option<f64> {
    let scrollable = document_height - viewport_height;
    if scrollable <= 0.0 || !scrollable.is_finite() {
        return None;
    }
    Some(scroll_y / scrollable)
}

#[derive(Clone, Debug)]
pub struct ProgressBar {
    options: ProgressOptions,
    inners: Vec<NodeId>,
}

impl ProgressBar {
    pub fn attach(doc: &Document, options: ProgressOptions) -> Self {
        let inners = doc
            .elements_by_class(&options.bar_class)
            .into_iter()
            .filter_map(|bar| doc.first_element_child(bar))
            .collect();
        Self { options, inners }
    }

    pub fn is_empty(&self) -> bool {
        self.inners.is_empty()
    }

    /// Inner elements whose width is driven.
    pub fn bars(&self) -> &[NodeId] {
        &self.inners
    }

    /// Width written for the given scroll state.
    pub fn width_for(&self, viewport: &Viewport, document_height: f64) -> String {
        // A page that fits the window has been read in full.
        let fraction =
            scroll_fraction(viewport.scroll_y, document_height, viewport.height).unwrap_or(1.0);
        let fraction = if self.options.clamp {
            fraction.clamp(0.0, 1.0)
        } else {
            fraction
        };
        format!("{}%", fraction * 100.0)
    }

    pub fn on_scroll(&self, doc: &mut Document, viewport: &Viewport, document_height: f64) {
        if self.inners.is_empty() {
            return;
        }
        let width = self.width_for(viewport, document_height);
        for inner in &self.inners {
            doc.set_style(*inner, "width", &width);
        }
    }
}
