//! Floating footnote previews.
//!
//! markdown-it-footnote renders references as
//! `<sup class="footnote-ref"><a href="#fn1" id="fnref1">1</a></sup>` (with
//! `fnref1:1`, `fnref1:2` for repeated references) and bodies as
//! `<li id="fn1" class="footnote-item"><p>...</p></li>`. While a reference
//! has pointer focus, a copy of the body's first block floats next to it.

use crate::dom::{Document, NodeId};
use crate::focus::{FocusChange, FocusTracker, Modality, PointerInput};
use crate::geometry::Viewport;

/// How references are matched with bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PairingMode {
    /// `fnref<N>` / `fnref<N>:<k>` pairs with `fn<N>`; references whose
    /// identifier has no body fall back to the body at the same position.
    #[default]
    Identifier,
    /// i-th reference with i-th body, in document order.
    Positional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FootnoteOptions {
    /// `id` prefix of reference anchors.
    pub ref_prefix: String,
    /// `id` prefix of footnote bodies.
    pub body_prefix: String,
    /// Class shared by footnote bodies.
    pub body_class: String,
    /// Element that receives preview overlays; falls back to `body`.
    pub overlay_host_id: Option<String>,
    /// Class added to each overlay.
    pub overlay_class: String,
    pub pairing: PairingMode,
    pub modality: Modality,
}

impl Default for FootnoteOptions {
    fn default() -> Self {
        Self {
            ref_prefix: "fnref".to_string(),
            body_prefix: "fn".to_string(),
            body_class: "footnote-item".to_string(),
            overlay_host_id: Some("main-right".to_string()),
            overlay_class: "footnote-preview".to_string(),
            pairing: PairingMode::Identifier,
            modality: Modality::Hover,
        }
    }
}

/// A reference anchor and the body it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FootnotePair {
    pub reference: NodeId,
    pub body: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overlay {
    Hidden,
    Visible(NodeId),
    FadingOut(NodeId),
}

#[derive(Clone, Debug)]
struct Slot {
    pair: FootnotePair,
    /// Detached copy of the body's first block, cloned again per preview.
    template: Option<NodeId>,
    overlay: Overlay,
    focus: FocusTracker,
}

/// Footnote preview controller for one page region.
#[derive(Clone, Debug)]
pub struct FootnotePreview {
    options: FootnoteOptions,
    slots: Vec<Slot>,
    bodies: Vec<NodeId>,
}

impl FootnotePreview {
    pub fn attach(doc: &mut Document, options: FootnoteOptions) -> Self {
        let root = doc.root();
        Self::attach_within(doc, root, options)
    }

    /// Pair references and bodies found beneath `scope`.
    pub fn attach_within(doc: &mut Document, scope: NodeId, options: FootnoteOptions) -> Self {
        let refs = doc.elements_with_id_prefix_within(scope, "a", &options.ref_prefix);
        let bodies = doc.elements_by_class_within(scope, &options.body_class);
        if refs.len() != bodies.len() {
            log::debug!(
                "{} footnote references for {} bodies",
                refs.len(),
                bodies.len()
            );
        }

        let pairs = match options.pairing {
            PairingMode::Positional => refs
                .iter()
                .zip(bodies.iter())
                .map(|(r, b)| FootnotePair {
                    reference: *r,
                    body: *b,
                })
                .collect::<Vec<_>>(),
            PairingMode::Identifier => pair_by_identifier(doc, &refs, &bodies, &options),
        };

        let slots = pairs
            .into_iter()
            .map(|pair| {
                let template = doc
                    .first_element_child(pair.body)
                    .and_then(|block| doc.clone_subtree(block));
                Slot {
                    pair,
                    template,
                    overlay: Overlay::Hidden,
                    focus: FocusTracker::new(options.modality),
                }
            })
            .collect();

        Self {
            options,
            slots,
            bodies,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = FootnotePair> + '_ {
        self.slots.iter().map(|s| s.pair)
    }

    /// Pair index for a reference anchor.
    pub fn slot_for_reference(&self, node: NodeId) -> Option<usize> {
        self.slots.iter().position(|s| s.pair.reference == node)
    }

    /// Overlay currently attached for pair `i`, visible or fading.
    pub fn overlay(&self, i: usize) -> Option<NodeId> {
        match self.slots.get(i)?.overlay {
            Overlay::Hidden => None,
            Overlay::Visible(node) | Overlay::FadingOut(node) => Some(node),
        }
    }

    /// Overlays of this controller still in the document.
    pub fn live_overlays(&self, doc: &Document) -> usize {
        (0..self.slots.len())
            .filter_map(|i| self.overlay(i))
            .filter(|node| doc.is_connected(*node))
            .count()
    }

    /// Feed raw pointer input for pair `i` through its focus tracker.
    pub fn on_pointer(
        &mut self,
        doc: &mut Document,
        viewport: &Viewport,
        i: usize,
        input: PointerInput,
    ) -> Option<FocusChange> {
        let change = self.slots.get_mut(i)?.focus.feed(input)?;
        match change {
            FocusChange::Begin => {
                self.focus_begin(doc, viewport, i);
            }
            FocusChange::End => self.focus_end(doc, i),
        }
        Some(change)
    }

    /// Show the preview for pair `i`. Returns the overlay node.
    pub fn focus_begin(
        &mut self,
        doc: &mut Document,
        viewport: &Viewport,
        i: usize,
    ) -> Option<NodeId> {
        let host = self.overlay_host(doc);
        let overlay_class = self.options.overlay_class.clone();
        let slot = self.slots.get_mut(i)?;
        match slot.overlay {
            Overlay::Visible(node) => return Some(node),
            Overlay::FadingOut(node) => {
                doc.discard(node);
                slot.overlay = Overlay::Hidden;
            }
            Overlay::Hidden => {}
        }
        let Some(template) = slot.template else {
            log::debug!("footnote {} has no block to preview", i);
            return None;
        };
        let content = doc.clone_subtree(template)?;

        let overlay = doc.create_element("aside");
        doc.append_child(host, overlay);
        doc.add_class(overlay, &overlay_class);
        doc.append_child(overlay, content);
        let top =
            doc.bounding_client_rect(slot.pair.reference, viewport).top() + viewport.scroll_y;
        doc.set_style(overlay, "position", "absolute");
        doc.set_style(overlay, "top", &format!("{}px", top));
        doc.set_style(overlay, "opacity", "100%");

        slot.overlay = Overlay::Visible(overlay);
        Some(overlay)
    }

    /// Start fading the preview for pair `i`; it is removed on transition end.
    pub fn focus_end(&mut self, doc: &mut Document, i: usize) {
        let Some(slot) = self.slots.get_mut(i) else {
            return;
        };
        if let Overlay::Visible(node) = slot.overlay {
            doc.set_style(node, "opacity", "0%");
            slot.overlay = Overlay::FadingOut(node);
        }
    }

    /// Drop a faded-out overlay and release its nodes. Returns whether
    /// `node` was one of ours.
    pub fn on_transition_end(&mut self, doc: &mut Document, node: NodeId) -> bool {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.overlay == Overlay::FadingOut(node))
        else {
            return false;
        };
        doc.discard(node);
        slot.overlay = Overlay::Hidden;
        true
    }

    /// Highlight the body addressed by the URL fragment, or clear the
    /// highlight when the fragment does not address a footnote body.
    pub fn select_for_hash(&self, doc: &mut Document, fragment: &str) {
        let hash = fragment.strip_prefix('#').unwrap_or(fragment);
        let targets_body = hash.starts_with(self.options.body_prefix.as_str())
            && !hash.starts_with(self.options.ref_prefix.as_str());
        if !targets_body {
            for body in &self.bodies {
                doc.remove_attr(*body, "aria-current");
            }
            return;
        }
        for body in &self.bodies {
            doc.set_attr(*body, "aria-current", "false");
        }
        match doc.element_by_id(hash) {
            Some(target) => doc.set_attr(target, "aria-current", "true"),
            None => log::debug!("no footnote with id {}", hash),
        }
    }

    fn overlay_host(&self, doc: &Document) -> NodeId {
        self.options
            .overlay_host_id
            .as_deref()
            .and_then(|id| doc.element_by_id(id))
            .or_else(|| doc.body())
            .unwrap_or(doc.root())
    }
}

/// `fnref3:1` -> `3`.
fn reference_number<'a>(id: &'a str, ref_prefix: &str) -> Option<&'a str> {
    let rest = id.strip_prefix(ref_prefix)?;
    let number = rest.split(':').next().unwrap_or(rest);
    (!number.is_empty()).then_some(number)
}

fn pair_by_identifier(
    doc: &Document,
    refs: &[NodeId],
    bodies: &[NodeId],
    options: &FootnoteOptions,
) -> Vec<FootnotePair> {
    refs.iter()
        .enumerate()
        .filter_map(|(i, reference)| {
            let by_id = doc
                .id(*reference)
                .and_then(|id| reference_number(id, &options.ref_prefix))
                .and_then(|n| {
                    let wanted = format!("{}{}", options.body_prefix, n);
                    bodies.iter().copied().find(|b| doc.id(*b) == Some(wanted.as_str()))
                });
            let body = by_id.or_else(|| bodies.get(i).copied())?;
            Some(FootnotePair {
                reference: *reference,
                body,
            })
        })
        .collect()
}
