use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `type` values an `input` element recognizes; anything else acts as `text`
const INPUT_TYPES: &[&str] = &[
    "button",
    "checkbox",
    "color",
    "date",
    "datetime-local",
    "email",
    "file",
    "hidden",
    "image",
    "month",
    "number",
    "password",
    "radio",
    "range",
    "reset",
    "search",
    "submit",
    "tel",
    "text",
    "time",
    "url",
    "week",
];

/// Index of a node inside a [`Document`](super::Document) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the page arena
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    /// Root of a shadow tree. Its parent is `None`; the host is kept here.
    ShadowRoot { host: NodeId },
    Text(String),
}

/// Element data captured from the rendered page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes keyed by lowercase name
    pub attributes: BTreeMap<String, String>,
    pub style: ComputedStyle,
    /// Bounding client rect, `None` when geometry could not be read
    pub rect: Option<Rect>,
    pub shadow_root: Option<NodeId>,
    /// Current value of form controls
    pub value: String,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `id` attribute, empty when absent
    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or("")
    }

    /// The raw `class` attribute, empty when absent
    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    /// Whether the class list contains `token` as a whole word
    pub fn has_class(&self, token: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == token)
    }

    /// Normalized input type: lowercase, `text` when missing, blank or not
    /// a type browsers know
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(|t| t.trim().to_lowercase())
            .filter(|t| INPUT_TYPES.contains(&t.as_str()))
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_input(&self) -> bool {
        self.is("input")
    }

    pub fn is_password_input(&self) -> bool {
        self.is_input() && self.input_type() == "password"
    }

    /// Short CSS-like label, e.g. `div#login.card`
    pub fn describe(&self) -> String {
        let mut label = self.tag.clone();
        if !self.id().is_empty() {
            label.push('#');
            label.push_str(self.id());
        }
        for class in self.class_name().split_whitespace() {
            label.push('.');
            label.push_str(class);
        }
        if self.is_input() {
            label.push_str(&format!("[type={}]", self.input_type()));
        }
        label
    }
}

/// The computed style properties the visibility check reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: None,
        }
    }
}

impl ComputedStyle {
    /// Parsed opacity; absent or non-numeric values count as fully opaque
    pub fn effective_opacity(&self) -> f64 {
        self.opacity
            .as_deref()
            .and_then(|o| o.trim().parse::<f64>().ok())
            .filter(|o| !o.is_nan())
            .unwrap_or(1.0)
    }

    /// `display: none`, `visibility: hidden` or zero opacity
    pub fn hides_subtree(&self) -> bool {
        self.display.trim().eq_ignore_ascii_case("none")
            || self.visibility.trim().eq_ignore_ascii_case("hidden")
            || self.effective_opacity() == 0.0
    }
}

/// Bounding client rectangle in CSS pixels, relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Viewport size and scroll offsets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Events dispatched on a field to make host frameworks notice a new value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntheticEvent {
    Input,
    Change,
    /// `input` constructed through the `InputEvent` interface
    InputEvent,
    Blur,
}

impl SyntheticEvent {
    /// The DOM event type string
    pub fn event_type(&self) -> &'static str {
        match self {
            SyntheticEvent::Input | SyntheticEvent::InputEvent => "input",
            SyntheticEvent::Change => "change",
            SyntheticEvent::Blur => "blur",
        }
    }

    /// The DOM constructor used to build the event
    pub fn interface(&self) -> &'static str {
        match self {
            SyntheticEvent::InputEvent => "InputEvent",
            _ => "Event",
        }
    }
}

/// Interaction recorded by an in-memory document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomEvent {
    Focus { target: NodeId },
    Blur { target: NodeId },
    ValueSet { target: NodeId },
    Dispatched {
        target: NodeId,
        event: SyntheticEvent,
        bubbles: bool,
    },
}

impl DomEvent {
    pub fn target(&self) -> NodeId {
        match self {
            DomEvent::Focus { target }
            | DomEvent::Blur { target }
            | DomEvent::ValueSet { target }
            | DomEvent::Dispatched { target, .. } => *target,
        }
    }
}
