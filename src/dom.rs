//! Arena-backed document tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Detached
//! nodes stay in the arena until [`Document::discard`] hands their slots
//! back for reuse; queries only report nodes connected to the root. Element boxes are kept in page coordinates and translated into
//! client space on demand.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::geometry::{Rect, Viewport};

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// HTML elements that never have children.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Clone, Debug, Default)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
    layout: Option<Rect>,
}

#[derive(Clone, Debug)]
enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    /// Slot on the free list.
    Vacant,
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// A rendered page.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::with_capacity(4),
                kind: NodeKind::Root,
            }],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Arena slots in use or waiting for reuse.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Slots currently on the free list.
    pub fn vacant_count(&self) -> usize {
        self.free.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Node {
                parent: None,
                children: Vec::new(),
                kind,
            };
            return NodeId(slot);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create a detached element. The tag is stored lower-case.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            ..Element::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Append text under `parent`, extending a trailing text run in place.
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.child_nodes(parent).last().copied() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Append `child` as last child of `parent`, moving it if attached
    /// elsewhere. Refuses to create cycles or to give text nodes children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let parent_ok = matches!(
            self.node(parent).map(|n| &n.kind),
            Some(NodeKind::Root) | Some(NodeKind::Element(_))
        );
        let child_ok = matches!(
            self.node(child).map(|n| &n.kind),
            Some(NodeKind::Element(_)) | Some(NodeKind::Text(_))
        );
        if !parent_ok || !child_ok || self.contains(child, parent) {
            return false;
        }
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        true
    }

    /// Detach `id` from its parent. Returns whether it was attached.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return false;
        };
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;
        true
    }

    /// Detach `id` and release it and its subtree to the free list. Handles
    /// to released nodes must not be used again: their slots are reused by
    /// later `create_*` calls. Returns the number of slots released.
    pub fn discard(&mut self, id: NodeId) -> usize {
        if !matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Element(_)) | Some(NodeKind::Text(_))
        ) {
            return 0;
        }
        self.remove(id);
        let mut released = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let node = &mut self.nodes[current.0];
            pending.append(&mut node.children);
            node.parent = None;
            node.kind = NodeKind::Vacant;
            self.free.push(current.0);
            released += 1;
        }
        released
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if old == new || !self.is_element(new) || self.contains(new, parent) {
            return false;
        }
        self.remove(new);
        let Some(pos) = self.nodes[parent.0].children.iter().position(|c| *c == old) else {
            return false;
        };
        self.nodes[parent.0].children[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        true
    }

    /// Deep copy of `id` and its subtree, detached. Layout boxes are copied.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let kind = match &self.node(id)?.kind {
            NodeKind::Root | NodeKind::Vacant => return None,
            other => other.clone(),
        };
        let copy = self.push_node(kind);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                self.nodes[child_copy.0].parent = Some(copy);
                self.nodes[copy.0].children.push(child_copy);
            }
        }
        Some(copy)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// All child nodes, text included.
    pub fn child_nodes(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.child_nodes(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).next()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn set_tag_name(&mut self, id: NodeId, tag: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.tag = tag.to_ascii_lowercase();
                true
            }
            None => false,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => {
                v.clear();
                v.push_str(value);
            }
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    /// Attributes in source order.
    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.element(id)
            .into_iter()
            .flat_map(|el| el.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id")
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) || !self.is_element(id) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    /// Inline style property, e.g. `width` or `opacity`.
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?
            .style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.style.iter_mut().find(|(k, _)| k == property) {
            Some((_, v)) => {
                v.clear();
                v.push_str(value);
            }
            None => el.style.push((property.to_string(), value.to_string())),
        }
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) {
        if let Some(el) = self.element_mut(id) {
            el.style.retain(|(k, _)| k != property);
        }
    }

    /// Box in page coordinates, if the element has been laid out.
    pub fn layout(&self, id: NodeId) -> Option<Rect> {
        self.element(id)?.layout
    }

    pub fn set_layout(&mut self, id: NodeId, rect: Rect) {
        if let Some(el) = self.element_mut(id) {
            el.layout = Some(rect);
        }
    }

    pub fn clear_layout(&mut self, id: NodeId) {
        if let Some(el) = self.element_mut(id) {
            el.layout = None;
        }
    }

    /// Client-space box of a laid out element.
    pub fn client_rect(&self, id: NodeId, viewport: &Viewport) -> Option<Rect> {
        self.layout(id).map(|r| r.to_client(viewport))
    }

    /// `getBoundingClientRect` semantics: elements without a box report an
    /// empty rectangle at the origin.
    pub fn bounding_client_rect(&self, id: NodeId, viewport: &Viewport) -> Rect {
        self.client_rect(id, viewport).unwrap_or_default()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Vacant => {}
            NodeKind::Root | NodeKind::Element(_) => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some() && self.contains(self.root(), id)
    }

    /// Ancestor chain from `id` up to (excluding) the root, nearest first.
    pub fn ancestors_inclusive(&self, id: NodeId) -> SmallVec<[NodeId; 16]> {
        let mut chain = SmallVec::new();
        let mut cursor = self.node(id).map(|_| id);
        while let Some(current) = cursor {
            if current == self.root() {
                break;
            }
            chain.push(current);
            cursor = self.parent(current);
        }
        chain
    }

    /// Element descendants of `scope` in document (pre-)order, excluding
    /// `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let mut stack = Vec::with_capacity(16);
        stack.extend(self.child_nodes(scope).iter().rev().copied());
        Descendants { doc: self, stack }
    }

    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements_by_class_within(self.root(), class)
    }

    pub fn elements_by_class_within(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements_by_tag_within(self.root(), tag)
    }

    pub fn elements_by_tag_within(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|id| self.tag_name(*id) == Some(tag))
            .collect()
    }

    /// First connected element with the given `id` attribute.
    pub fn element_by_id(&self, id_value: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|id| self.id(*id) == Some(id_value))
    }

    /// Elements named `tag` whose `id` starts with `prefix`, like
    /// `a[id^="fnref"]`.
    pub fn elements_with_id_prefix_within(
        &self,
        scope: NodeId,
        tag: &str,
        prefix: &str,
    ) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|id| {
                self.tag_name(*id) == Some(tag)
                    && self.id(*id).is_some_and(|v| v.starts_with(prefix))
            })
            .collect()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|id| self.tag_name(*id) == Some("body"))
    }

    /// Lowest layout edge among connected elements.
    pub fn content_bottom(&self) -> f64 {
        self.descendants(self.root())
            .filter_map(|id| self.layout(id))
            .map(|r| r.bottom())
            .fold(0.0, f64::max)
    }

    /// Index from `id` attribute to node for the connected tree. Later
    /// duplicates do not replace the first occurrence.
    pub fn id_index(&self) -> HashMap<String, NodeId> {
        let mut index = HashMap::new();
        for node in self.descendants(self.root()) {
            if let Some(value) = self.id(node) {
                index.entry(value.to_string()).or_insert(node);
            }
        }
        index
    }

    /// Serialize `id` and its subtree as HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialize the children of `id` as HTML.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.child_nodes(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Root => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&quick_xml::escape::escape(text.as_str())),
            NodeKind::Vacant => {}
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (key, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&quick_xml::escape::escape(value.as_str()));
                    out.push('"');
                }
                if !el.style.is_empty() {
                    let css = el
                        .style
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    out.push_str(" style=\"");
                    out.push_str(&quick_xml::escape::escape(css.as_str()));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&el.tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

/// Pre-order walk over element descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            if !self.doc.is_element(id) {
                continue;
            }
            self.stack
                .extend(self.doc.child_nodes(id).iter().rev().copied());
            return Some(id);
        }
        None
    }
}
