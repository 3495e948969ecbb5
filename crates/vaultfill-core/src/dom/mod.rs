mod document;
mod reader;
mod snapshot;
mod types;

pub use document::{Descendants, Document};
pub use reader::SnapshotReader;
pub use snapshot::{FlatKind, FlatNode, FlatSnapshot, NodeSnapshot, PageSnapshot};
pub use types::{ComputedStyle, DomEvent, Element, Node, NodeId, NodeKind, Rect, SyntheticEvent, Viewport};
