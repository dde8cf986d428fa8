//! Modal image zoom.
//!
//! Two markups are supported. The build can pre-render a trigger button and
//! a closed dialog next to every image (`.expand-img > button + dialog`,
//! see [`crate::markup::prerender_zoom_pairs`]), or plain images can be
//! cloned into a fresh dialog when clicked.
//!
//! Dismissal follows the usual backdrop idiom: a click closes the dialog
//! when it lands outside the box of the element that received it. Clicks
//! on the backdrop are delivered to the dialog itself at coordinates
//! outside its box; clicks on the image always land inside the image.

use crate::dom::{Document, NodeId};
use crate::geometry::{Point, Viewport};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZoomVariant {
    /// Triggers and dialogs were rendered at build time.
    #[default]
    Prerendered,
    /// Each image is cloned into a new dialog on click.
    CloneOnClick,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoomOptions {
    pub variant: ZoomVariant,
    /// Class of the pre-rendered wrapper.
    pub wrapper_class: String,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            variant: ZoomVariant::Prerendered,
            wrapper_class: "expand-img".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Trigger {
    node: NodeId,
    /// Pre-rendered dialog; `None` for the clone variant.
    dialog: Option<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenDialog {
    dialog: NodeId,
    cloned: bool,
}

/// Zoom controller for one page region.
#[derive(Clone, Debug)]
pub struct ImageZoomDialog {
    options: ZoomOptions,
    triggers: Vec<Trigger>,
    open: Option<OpenDialog>,
}

impl ImageZoomDialog {
    pub fn attach(doc: &Document, options: ZoomOptions) -> Self {
        Self::attach_within(doc, doc.root(), options)
    }

    pub fn attach_within(doc: &Document, scope: NodeId, options: ZoomOptions) -> Self {
        let triggers = match options.variant {
            ZoomVariant::CloneOnClick => doc
                .elements_by_tag_within(scope, "img")
                .into_iter()
                .map(|node| Trigger { node, dialog: None })
                .collect(),
            ZoomVariant::Prerendered => doc
                .elements_by_class_within(scope, &options.wrapper_class)
                .into_iter()
                .filter_map(|wrapper| {
                    let mut children = doc.children(wrapper);
                    let (Some(button), Some(dialog)) = (children.next(), children.next()) else {
                        log::debug!(".{} without button and dialog", options.wrapper_class);
                        return None;
                    };
                    Some(Trigger {
                        node: button,
                        dialog: Some(dialog),
                    })
                })
                .collect(),
        };
        Self {
            options,
            triggers,
            open: None,
        }
    }

    pub fn variant(&self) -> ZoomVariant {
        self.options.variant
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Trigger index hit by a click on `target` or anything inside a trigger.
    pub fn trigger_for(&self, doc: &Document, target: NodeId) -> Option<usize> {
        doc.ancestors_inclusive(target)
            .into_iter()
            .find_map(|node| self.triggers.iter().position(|t| t.node == node))
    }

    /// Open the dialog for trigger `i` modally. Only one dialog can be open;
    /// while one is, this is a no-op returning the open dialog.
    pub fn open(&mut self, doc: &mut Document, i: usize) -> Option<NodeId> {
        if let Some(open) = self.open {
            return Some(open.dialog);
        }
        let trigger = *self.triggers.get(i)?;
        let opened = match trigger.dialog {
            Some(dialog) => OpenDialog {
                dialog,
                cloned: false,
            },
            None => {
                let copy = doc.clone_subtree(trigger.node)?;
                // The thumbnail's box does not describe the enlarged copy.
                doc.clear_layout(copy);
                let dialog = doc.create_element("dialog");
                doc.append_child(dialog, copy);
                let parent = doc.body().unwrap_or(doc.root());
                doc.append_child(parent, dialog);
                OpenDialog {
                    dialog,
                    cloned: true,
                }
            }
        };
        doc.set_attr(opened.dialog, "open", "");
        self.open = Some(opened);
        Some(opened.dialog)
    }

    /// Handle a click delivered to `target` inside the open dialog, at
    /// client coordinates `point`. Returns whether the dialog closed.
    pub fn on_dialog_click(
        &mut self,
        doc: &mut Document,
        viewport: &Viewport,
        target: NodeId,
        point: Point,
    ) -> bool {
        if self.open.is_none() {
            return false;
        }
        if doc.bounding_client_rect(target, viewport).contains(point) {
            return false;
        }
        self.close(doc);
        true
    }

    /// Close the open dialog: cloned dialogs leave the document and their
    /// nodes are released, pre-rendered ones lose their `open` attribute.
    pub fn close(&mut self, doc: &mut Document) {
        let Some(open) = self.open.take() else {
            return;
        };
        if open.cloned {
            doc.discard(open.dialog);
        } else {
            doc.remove_attr(open.dialog, "open");
        }
    }

    pub fn open_dialog(&self) -> Option<NodeId> {
        self.open.map(|o| o.dialog)
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
