use serde::{Deserialize, Serialize};
use vaultfill_core::NodeId;

/// Where a detected form boundary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormOrigin {
    /// A real `<form>` element
    RealForm,
    /// A scored container standing in for a missing `<form>`
    SyntheticContainer,
    /// An ancestor inside a shadow tree
    ShadowDom,
}

impl FormOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            FormOrigin::RealForm => "Form",
            FormOrigin::SyntheticContainer => "Container",
            FormOrigin::ShadowDom => "Shadow DOM",
        }
    }
}

/// A login form found by one scan
///
/// Recomputed on every scan and never mutated. `boundary` always contains
/// `password_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedForm {
    pub boundary: NodeId,
    pub username_field: Option<NodeId>,
    pub password_field: NodeId,
    pub origin: FormOrigin,
}

impl DetectedForm {
    /// Fields of this form in fill order
    pub fn fields(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.username_field
            .into_iter()
            .chain(std::iter::once(self.password_field))
    }
}
