use crate::scoring::is_submit_control;
use vaultfill_core::dom::Element;
use vaultfill_core::{Document, NodeId};

const SUBMIT_KEYWORDS: &[&str] = &[
    "login", "log in", "sign in", "signin", "submit", "continue", "next",
];

/// Finds the control that submits a detected form
pub struct SubmitLocator;

impl SubmitLocator {
    /// Explicit submit controls first, then buttons labelled like one, then
    /// any link or generic element labelled like one
    pub fn find_submit_button(doc: &Document, boundary: NodeId) -> Option<NodeId> {
        let explicit = doc
            .descendant_elements(boundary)
            .find(|(_, e)| is_submit_control(e));
        if let Some((id, _)) = explicit {
            return Some(id);
        }

        let labelled = doc
            .descendant_elements(boundary)
            .filter(|(_, e)| Self::is_button(e))
            .find(|&(id, e)| Self::has_submit_label(&Self::label(doc, id, e)));
        if let Some((id, _)) = labelled {
            tracing::debug!("Submit control {} found by label", doc.describe(id));
            return Some(id);
        }

        doc.descendant_elements(boundary)
            .filter(|(_, e)| e.is("a") || e.is("div") || e.is("span"))
            .find(|&(id, _)| Self::has_submit_label(&doc.text_content(id)))
            .map(|(id, _)| id)
    }

    fn is_button(element: &Element) -> bool {
        element.is("button") || (element.is_input() && element.input_type() == "button")
    }

    /// Buttons are labelled by their text, `input[type=button]` by its value
    fn label(doc: &Document, id: NodeId, element: &Element) -> String {
        if element.is_input() {
            element.attr("value").unwrap_or_default().to_string()
        } else {
            doc.text_content(id)
        }
    }

    fn has_submit_label(text: &str) -> bool {
        let text = text.to_lowercase();
        SUBMIT_KEYWORDS.iter().any(|keyword| text.contains(keyword))
    }
}
