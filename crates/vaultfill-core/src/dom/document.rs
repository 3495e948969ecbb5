use super::snapshot::{FlatKind, FlatSnapshot, NodeSnapshot, PageSnapshot};
use super::types::{DomEvent, Element, Node, NodeId, NodeKind, SyntheticEvent, Viewport};
use crate::{Error, Result};

/// Arena-backed page model
///
/// Node `0` is always the document node. Reads return `Option` so a node that
/// vanished between capture and use is an ordinary empty case.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    viewport: Viewport,
    nodes: Vec<Node>,
    focused: Option<NodeId>,
    events: Vec<DomEvent>,
}

impl Document {
    /// An empty document with only the document node
    pub fn new(url: &str, viewport: Viewport) -> Self {
        Self {
            url: url.to_string(),
            viewport,
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            focused: None,
            events: Vec::new(),
        }
    }

    /// Build from a nested snapshot. Node ids follow document pre-order with
    /// shadow trees visited right after their host.
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut doc = Self::new(&snapshot.url, snapshot.viewport);

        // Explicit stack keeps deep pages off the call stack
        let mut stack: Vec<(&NodeSnapshot, NodeId)> = vec![(&snapshot.root, doc.root())];
        while let Some((node, parent)) = stack.pop() {
            let id = doc.push_element(parent, element_from_snapshot(node));
            if let Some(text) = &node.text {
                doc.push(Some(id), NodeKind::Text(text.clone()));
            }

            // Pushed in reverse so they pop in document order, children last
            for child in node.children.iter().rev() {
                stack.push((child, id));
            }
            if let Some(shadow_children) = &node.shadow_root {
                let root = doc.attach_shadow(id);
                for child in shadow_children.iter().rev() {
                    stack.push((child, root));
                }
            }
        }

        tracing::debug!(
            "Built document for {} with {} nodes",
            snapshot.url,
            doc.nodes.len()
        );
        doc
    }

    /// Build from a flat pre-order snapshot, keeping snapshot indices as ids
    pub fn from_flat(snapshot: FlatSnapshot) -> Result<Self> {
        let mut nodes = snapshot.nodes.into_iter();
        match nodes.next() {
            Some(first) if matches!(first.kind, FlatKind::Document) => {}
            _ => {
                return Err(Error::InvalidSnapshot(
                    "First node must be the document".to_string(),
                ));
            }
        }

        let mut doc = Self::new(&snapshot.url, snapshot.viewport);
        for (offset, node) in nodes.enumerate() {
            let index = offset + 1;
            let parent = match node.parent {
                Some(p) if p < index => NodeId(p),
                Some(p) => {
                    return Err(Error::InvalidSnapshot(format!(
                        "Node {} names parent {} which does not precede it",
                        index, p
                    )));
                }
                None => {
                    return Err(Error::InvalidSnapshot(format!(
                        "Node {} has no parent",
                        index
                    )));
                }
            };

            match node.kind {
                FlatKind::Document => {
                    return Err(Error::InvalidSnapshot(format!(
                        "Node {} is a second document node",
                        index
                    )));
                }
                FlatKind::Element {
                    tag,
                    attributes,
                    style,
                    rect,
                    value,
                } => {
                    let element = Element {
                        tag: tag.to_lowercase(),
                        attributes: attributes
                            .into_iter()
                            .map(|(k, v)| (k.to_lowercase(), v))
                            .collect(),
                        style,
                        rect,
                        shadow_root: None,
                        value,
                    };
                    doc.push_element(parent, element);
                }
                FlatKind::ShadowRoot => {
                    match doc.element(parent) {
                        Some(host) if host.shadow_root.is_none() => {}
                        Some(_) => {
                            return Err(Error::InvalidSnapshot(format!(
                                "Shadow root {} attaches to a host that already has one",
                                index
                            )));
                        }
                        None => {
                            return Err(Error::InvalidSnapshot(format!(
                                "Shadow root {} is not attached to an element",
                                index
                            )));
                        }
                    }
                    doc.attach_shadow(parent);
                }
                FlatKind::Text { text } => {
                    doc.push(Some(parent), NodeKind::Text(text));
                }
            }
        }

        Ok(doc)
    }

    /// Convert back into a nested snapshot, carrying current field values
    pub fn to_snapshot(&self) -> Option<PageSnapshot> {
        let root = self
            .children(self.root())
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())?;
        Some(PageSnapshot {
            url: self.url.clone(),
            viewport: self.viewport,
            root: self.node_snapshot(root)?,
        })
    }

    fn node_snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        let element = self.element(id)?;
        let mut snapshot = NodeSnapshot {
            tag: element.tag.clone(),
            attributes: element.attributes.clone(),
            style: element.style.clone(),
            rect: element.rect,
            value: element.value.clone(),
            text: None,
            children: Vec::new(),
            shadow_root: None,
        };

        for &child in self.children(id) {
            match self.node(child).map(|n| &n.kind) {
                Some(NodeKind::Text(text)) if snapshot.children.is_empty() => {
                    snapshot
                        .text
                        .get_or_insert_with(String::new)
                        .push_str(text);
                }
                Some(NodeKind::Element(_)) => {
                    if let Some(c) = self.node_snapshot(child) {
                        snapshot.children.push(c);
                    }
                }
                _ => {}
            }
        }

        if let Some(root) = element.shadow_root {
            let shadow = self
                .children(root)
                .iter()
                .filter_map(|&c| self.node_snapshot(c))
                .collect();
            snapshot.shadow_root = Some(shadow);
        }

        Some(snapshot)
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            p.children.push(id);
        }
        id
    }

    /// Append an element under `parent`
    pub fn push_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.push(Some(parent), NodeKind::Element(element))
    }

    /// Attach (or return the existing) shadow root of `host`
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.element(host).and_then(|e| e.shadow_root) {
            return existing;
        }
        let root = self.push(None, NodeKind::ShadowRoot { host });
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(root);
        }
        root
    }

    // ---- Reads ----

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// `parentNode`: element, document, or nothing for a shadow root
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// `parentElement`: the parent only when it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.element(parent).map(|_| parent)
    }

    /// Parent in the flat tree: crosses from a shadow root to its host
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        match &self.node(parent)?.kind {
            NodeKind::Element(_) => Some(parent),
            NodeKind::ShadowRoot { host } => Some(*host),
            _ => None,
        }
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::ShadowRoot { .. })
        )
    }

    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        match self.node(root)?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    pub fn shadow_root_of(&self, host: NodeId) -> Option<NodeId> {
        self.element(host)?.shadow_root
    }

    /// Descendants of `id` in document order, excluding `id` and without
    /// entering shadow trees
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Element descendants of `id` in document order
    pub fn descendant_elements(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.descendants(id)
            .filter_map(move |d| self.element(d).map(|e| (d, e)))
    }

    /// `querySelectorAll(tag)` scoped to `id`
    pub fn elements_by_tag<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendant_elements(id)
            .filter(move |(_, e)| e.is(tag))
            .map(|(d, _)| d)
    }

    /// `input` descendants of `id` in document order
    pub fn inputs(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.descendant_elements(id).filter(|(_, e)| e.is_input())
    }

    /// Inclusive containment over `parentNode`, never crossing a shadow root
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        // A well formed tree never needs more steps than it has nodes
        for _ in 0..=self.nodes.len() {
            match current {
                Some(c) if c == ancestor => return true,
                Some(c) => current = self.parent(c),
                None => return false,
            }
        }
        false
    }

    /// First `<body>` of the light tree
    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag(self.root(), "body").next()
    }

    /// `getElementById`: first light-tree element with this id
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendant_elements(self.root())
            .find(|(_, e)| e.id() == id)
            .map(|(d, _)| d)
    }

    /// `getElementsByClassName` with a single class token
    pub fn elements_by_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendant_elements(self.root())
            .filter(move |(_, e)| e.has_class(class))
            .map(|(d, _)| d)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| match &self.node(d)?.kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn describe(&self, id: NodeId) -> String {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(e)) => e.describe(),
            Some(NodeKind::Document) => "#document".to_string(),
            Some(NodeKind::ShadowRoot { .. }) => "#shadow-root".to_string(),
            Some(NodeKind::Text(_)) => "#text".to_string(),
            None => format!("<missing {}>", id),
        }
    }

    // ---- Interaction (in-memory page) ----

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.value.as_str())
    }

    pub fn focus(&mut self, id: NodeId) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        self.focused = Some(id);
        self.events.push(DomEvent::Focus { target: id });
        true
    }

    pub fn blur(&mut self, id: NodeId) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        self.events.push(DomEvent::Blur { target: id });
        true
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.value = value.to_string();
                self.events.push(DomEvent::ValueSet { target: id });
                true
            }
            None => false,
        }
    }

    pub fn dispatch(&mut self, id: NodeId, event: SyntheticEvent, bubbles: bool) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        self.events.push(DomEvent::Dispatched {
            target: id,
            event,
            bubbles,
        });
        true
    }

    /// Every interaction recorded so far
    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    /// Event type strings dispatched on `target`, in order
    pub fn dispatched_types(&self, target: NodeId) -> Vec<&'static str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DomEvent::Dispatched { target: t, event, .. } if *t == target => {
                    Some(event.event_type())
                }
                _ => None,
            })
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<DomEvent> {
        std::mem::take(&mut self.events)
    }
}

fn element_from_snapshot(node: &NodeSnapshot) -> Element {
    Element {
        tag: node.tag.to_lowercase(),
        attributes: node
            .attributes
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect(),
        style: node.style.clone(),
        rect: node.rect,
        shadow_root: None,
        value: node.value.clone(),
    }
}

/// Pre-order iterator produced by [`Document::descendants`]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
