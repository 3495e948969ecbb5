use crate::classifier::FieldClassifier;
use crate::container::ContainerResolver;
use crate::form::{DetectedForm, FormOrigin};
use crate::{Error, Result};
use std::collections::HashSet;
use vaultfill_core::{Document, NodeId};

/// Finds every login form on a page
///
/// Three tiers run in sequence and their results are concatenated in order:
/// real forms, then (only when no real form matched) orphan password fields,
/// then shadow trees. A failing tier contributes nothing and never discards
/// what earlier tiers found.
pub struct FormLocator;

impl FormLocator {
    pub fn find_login_forms(doc: &Document) -> Vec<DetectedForm> {
        tracing::debug!("Scanning {} for login forms", doc.url());

        let mut forms = Self::run_tier("real form", || Self::real_forms(doc));

        if forms.is_empty() {
            forms = Self::run_tier("orphan field", || Self::orphan_fields(doc));
        }

        forms.extend(Self::run_tier("shadow DOM", || Self::shadow_forms(doc)));

        tracing::info!("Found {} login form(s) on {}", forms.len(), doc.url());
        forms
    }

    fn run_tier(
        name: &str,
        tier: impl FnOnce() -> Result<Vec<DetectedForm>>,
    ) -> Vec<DetectedForm> {
        match tier() {
            Ok(forms) => {
                tracing::debug!("{} tier found {} form(s)", name, forms.len());
                forms
            }
            Err(e) => {
                tracing::warn!("{} tier failed, ignoring its results: {}", name, e);
                Vec::new()
            }
        }
    }

    /// Tier A: `<form>` elements holding a password input
    fn real_forms(doc: &Document) -> Result<Vec<DetectedForm>> {
        let mut forms = Vec::new();

        for form in doc.elements_by_tag(doc.root(), "form") {
            let Some((password, _)) = doc.inputs(form).find(|(_, e)| e.is_password_input())
            else {
                continue;
            };

            forms.push(DetectedForm {
                boundary: form,
                username_field: FieldClassifier::find_username_field(doc, form),
                password_field: password,
                origin: FormOrigin::RealForm,
            });
        }

        Ok(forms)
    }

    /// Tier B: every light-DOM password input, each with a resolved container
    fn orphan_fields(doc: &Document) -> Result<Vec<DetectedForm>> {
        let passwords: Vec<NodeId> = Self::password_inputs(doc, doc.root());
        let mut forms = Vec::with_capacity(passwords.len());

        for password in passwords {
            let container = ContainerResolver::find_form_container(doc, password)?;
            forms.push(DetectedForm {
                boundary: container,
                username_field: FieldClassifier::find_username_field(doc, container),
                password_field: password,
                origin: FormOrigin::SyntheticContainer,
            });
        }

        Ok(forms)
    }

    /// Tier C: password inputs inside every reachable shadow root
    fn shadow_forms(doc: &Document) -> Result<Vec<DetectedForm>> {
        let mut forms = Vec::new();

        for root in Self::shadow_roots(doc)? {
            for password in Self::password_inputs(doc, root) {
                // A field directly under the shadow root is its own boundary;
                // its username is looked up across the whole shadow tree
                let (boundary, scope) = if doc.parent_element(password).is_some() {
                    let container = ContainerResolver::best_scoring_ancestor(doc, password, None)?;
                    (container, container)
                } else {
                    (password, root)
                };

                forms.push(DetectedForm {
                    boundary,
                    username_field: FieldClassifier::find_username_field(doc, scope),
                    password_field: password,
                    origin: FormOrigin::ShadowDom,
                });
            }
        }

        Ok(forms)
    }

    /// Every shadow root reachable from the document, depth-first in
    /// document order. Worklist based, with a visited set so a malformed
    /// tree cannot loop.
    pub fn shadow_roots(doc: &Document) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut pending: Vec<NodeId> = Self::hosted_roots(doc, doc.root());
        pending.reverse();

        while let Some(root) = pending.pop() {
            if !visited.insert(root) {
                tracing::debug!("Shadow root {} already visited", root);
                continue;
            }
            if !doc.is_shadow_root(root) {
                return Err(Error::Traversal(format!("{} is not a shadow root", root)));
            }

            found.push(root);

            let mut nested = Self::hosted_roots(doc, root);
            nested.reverse();
            pending.extend(nested);
        }

        Ok(found)
    }

    /// Shadow roots attached to elements under `scope`, in document order
    fn hosted_roots(doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.descendant_elements(scope)
            .filter_map(|(_, e)| e.shadow_root)
            .collect()
    }

    fn password_inputs(doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.inputs(scope)
            .filter(|(_, e)| e.is_password_input())
            .map(|(id, _)| id)
            .collect()
    }
}
