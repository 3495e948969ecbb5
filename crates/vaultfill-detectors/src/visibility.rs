use vaultfill_core::{Document, NodeId};

/// Minimum rendered size, in CSS pixels, for a field to count as real.
/// Zero-size and 1x1 honeypot inputs fall at or below it.
const MIN_RENDERED_SIZE: f64 = 1.0;

/// Decides whether a node is meaningfully visible and interactable
///
/// Every failure to read style or geometry answers "not visible". Results
/// describe the document at call time only and are never cached.
pub struct Visibility;

impl Visibility {
    pub fn is_visible(doc: &Document, node: NodeId) -> bool {
        if !Self::ancestors_rendered(doc, node) {
            return false;
        }

        let Some(rect) = doc.element(node).and_then(|e| e.rect) else {
            tracing::trace!("No geometry for {}", node);
            return false;
        };

        if rect.width <= MIN_RENDERED_SIZE || rect.height <= MIN_RENDERED_SIZE {
            return false;
        }

        let viewport = doc.viewport();
        !(rect.right() < 0.0
            || rect.bottom() < 0.0
            || rect.left > viewport.width
            || rect.top > viewport.height)
    }

    /// Walks the node and every flat-tree ancestor (shadow hosts included)
    /// looking for a style that hides the subtree
    fn ancestors_rendered(doc: &Document, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0usize;

        while let Some(id) = current {
            let Some(element) = doc.element(id) else {
                return false;
            };
            if element.style.hides_subtree() {
                return false;
            }

            steps += 1;
            if steps > doc.len() {
                tracing::debug!("Ancestor walk from {} did not terminate", node);
                return false;
            }
            current = doc.composed_parent(id);
        }

        true
    }
}
