use super::types::{ComputedStyle, Rect, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A page captured as a nested tree, the format used for snapshot files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub viewport: Viewport,
    pub root: NodeSnapshot,
}

impl PageSnapshot {
    pub fn new(url: &str, root: NodeSnapshot) -> Self {
        Self {
            url: url.to_string(),
            viewport: Viewport::default(),
            root,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

/// One element of a nested snapshot
///
/// `text`, when present, becomes a text node placed before `children`.
/// `shadow_root` holds the children of an attached shadow root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_root: Option<Vec<NodeSnapshot>>,
}

impl NodeSnapshot {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    /// An `<input>` of the given type
    pub fn input(input_type: &str) -> Self {
        Self::new("input").attr("type", input_type)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn name(self, name: &str) -> Self {
        self.attr("name", name)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn rect(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect::new(left, top, width, height));
        self
    }

    pub fn display(mut self, display: &str) -> Self {
        self.style.display = display.to_string();
        self
    }

    pub fn visibility(mut self, visibility: &str) -> Self {
        self.style.visibility = visibility.to_string();
        self
    }

    pub fn opacity(mut self, opacity: &str) -> Self {
        self.style.opacity = Some(opacity.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSnapshot>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn shadow(mut self, children: impl IntoIterator<Item = NodeSnapshot>) -> Self {
        self.shadow_root
            .get_or_insert_with(Vec::new)
            .extend(children);
        self
    }
}

/// A page captured as a pre-order node list, the format produced by a live page
///
/// `nodes[0]` must be the document node. Every other node names its parent by
/// index, and parents always precede their children. A shadow root names its
/// host as parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSnapshot {
    pub url: String,
    #[serde(default)]
    pub viewport: Viewport,
    pub nodes: Vec<FlatNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatNode {
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(flatten)]
    pub kind: FlatKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlatKind {
    Document,
    Element {
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        style: ComputedStyle,
        #[serde(default)]
        rect: Option<Rect>,
        #[serde(default)]
        value: String,
    },
    ShadowRoot,
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_lowercases_names() {
        let node = NodeSnapshot::new("DIV").attr("Data-Role", "login");
        assert_eq!(node.tag, "div");
        assert_eq!(
            node.attributes.get("data-role").map(String::as_str),
            Some("login")
        );
    }

    #[test]
    fn test_parse_nested_snapshot_defaults() {
        let json = r#"{
            "url": "https://example.com/login",
            "root": {
                "tag": "html",
                "children": [
                    {"tag": "input", "attributes": {"type": "password"},
                     "rect": {"left": 0, "top": 0, "width": 100, "height": 20}}
                ]
            }
        }"#;

        let snapshot: PageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.viewport, Viewport::default());
        let input = &snapshot.root.children[0];
        assert_eq!(input.style, ComputedStyle::default());
        assert_eq!(input.rect.map(|r| r.width), Some(100.0));
    }

    #[test]
    fn test_parse_flat_snapshot() {
        let json = r#"{
            "url": "https://example.com",
            "nodes": [
                {"kind": "document"},
                {"kind": "element", "parent": 0, "tag": "html"},
                {"kind": "shadowRoot", "parent": 1},
                {"kind": "text", "parent": 2, "text": "hi"}
            ]
        }"#;

        let snapshot: FlatSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.nodes.len(), 4);
        assert!(matches!(snapshot.nodes[0].kind, FlatKind::Document));
        assert!(matches!(snapshot.nodes[2].kind, FlatKind::ShadowRoot));
        assert_eq!(snapshot.nodes[3].parent, Some(2));
    }
}
