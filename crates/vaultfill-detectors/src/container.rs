use crate::scoring::{score, ContainerSignals, CONTAINER_RULES};
use crate::{Error, Result};
use vaultfill_core::{Document, NodeId};

/// Conventional ids of login widgets, trusted over any score
const CONTAINER_IDS: &[&str] = &[
    "loginForm",
    "login-form",
    "login_form",
    "signin",
    "sign-in",
    "auth",
    "authForm",
    "login-container",
    "credentials",
];

/// Conventional class names of login widgets, checked after the ids
const CONTAINER_CLASSES: &[&str] = &[
    "login",
    "signin",
    "sign-in",
    "auth",
    "form",
    "login-form",
    "login_form",
    "login-container",
    "credentials",
];

/// Finds the logical form boundary of a password field that has no `<form>`
pub struct ContainerResolver;

impl ContainerResolver {
    /// Resolve the boundary for a light-DOM password field. Never empty:
    /// falls back to the field's parent element.
    pub fn find_form_container(doc: &Document, password: NodeId) -> Result<NodeId> {
        if let Some(known) = Self::known_container(doc, password) {
            tracing::debug!(
                "Password field {} is inside known container {}",
                password,
                doc.describe(known)
            );
            return Ok(known);
        }

        Self::best_scoring_ancestor(doc, password, doc.body())
    }

    /// Step 1: allow-listed ids, then class names, that contain the field
    fn known_container(doc: &Document, password: NodeId) -> Option<NodeId> {
        let by_id = CONTAINER_IDS.iter().find_map(|id| {
            doc.element_by_id(id)
                .filter(|&container| doc.contains(container, password))
        });
        if by_id.is_some() {
            return by_id;
        }

        CONTAINER_CLASSES.iter().find_map(|class| {
            doc.elements_by_class(class)
                .find(|&container| doc.contains(container, password))
        })
    }

    /// Step 2: score every ancestor element from the parent up to, but not
    /// including, `stop`. The walk also ends where parent elements run out,
    /// which bounds it to the enclosing shadow root for shadow content.
    ///
    /// Strictly greater scores replace the best, so the innermost ancestor
    /// wins ties.
    pub fn best_scoring_ancestor(
        doc: &Document,
        field: NodeId,
        stop: Option<NodeId>,
    ) -> Result<NodeId> {
        doc.element(field)
            .ok_or_else(|| Error::Traversal(format!("Field {} is not an element", field)))?;

        let parent = doc.parent_element(field);
        let mut best: Option<(NodeId, i32)> = None;
        let mut current = parent;
        let mut steps = 0usize;

        while let Some(ancestor) = current {
            if Some(ancestor) == stop {
                break;
            }

            steps += 1;
            if steps > doc.len() {
                return Err(Error::Traversal(format!(
                    "Ancestor walk from {} did not terminate",
                    field
                )));
            }

            let signals = ContainerSignals::collect(doc, ancestor).ok_or_else(|| {
                Error::Traversal(format!("Ancestor {} vanished during walk", ancestor))
            })?;
            let candidate = score(&signals, CONTAINER_RULES);
            tracing::trace!("Candidate {} scored {}", doc.describe(ancestor), candidate);

            if candidate > best.map_or(0, |(_, s)| s) {
                best = Some((ancestor, candidate));
            }

            current = doc.parent_element(ancestor);
        }

        match best.map(|(id, _)| id).or(parent) {
            Some(container) => Ok(container),
            None => Err(Error::Traversal(format!(
                "Field {} has no parent element",
                field
            ))),
        }
    }
}
