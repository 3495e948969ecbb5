use serde::Serialize;
use vaultfill_core::{Document, NodeId};
use vaultfill_detectors::{DetectedForm, Visibility};

/// Which credential a tracked field takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Username,
    Password,
}

/// Page coordinates of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayPosition {
    pub top: f64,
    pub left: f64,
}

/// An indicator tracking one field. It only indexes the field, it never owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub field: NodeId,
    pub role: FieldRole,
    /// `None` while the field is not visible
    pub position: Option<OverlayPosition>,
}

/// The live indicators of one page
#[derive(Debug, Default)]
pub struct OverlayIndex {
    overlays: Vec<Overlay>,
}

impl OverlayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a field. Invisible fields are not tracked; an already tracked
    /// field only gets its position refreshed.
    pub fn add(&mut self, doc: &Document, field: NodeId, role: FieldRole) -> bool {
        let position = Self::position_of(doc, field);

        if let Some(existing) = self.overlays.iter_mut().find(|o| o.field == field) {
            existing.position = position;
            return false;
        }

        if position.is_none() {
            return false;
        }

        tracing::debug!("Tracking {:?} field {}", role, field);
        self.overlays.push(Overlay {
            field,
            role,
            position,
        });
        true
    }

    /// Track both fields of every form
    pub fn add_forms(&mut self, doc: &Document, forms: &[DetectedForm]) {
        for (field, role) in Self::fields_of(forms) {
            self.add(doc, field, role);
        }
    }

    /// Make the index mirror the fields of `forms` in `doc`
    ///
    /// Node ids are only meaningful within one snapshot, so overlays whose
    /// field is not a detected field of the same role in `doc` are dropped.
    /// Kept overlays get their position recomputed. Returns whether any
    /// overlay was removed or created.
    pub fn sync_forms(&mut self, doc: &Document, forms: &[DetectedForm]) -> bool {
        let wanted = Self::fields_of(forms);

        let before = self.overlays.len();
        self.overlays
            .retain(|overlay| wanted.contains(&(overlay.field, overlay.role)));
        let removed = before - self.overlays.len();
        if removed > 0 {
            tracing::debug!("Dropped {} overlay(s) for fields no longer detected", removed);
        }

        let mut created = false;
        for (field, role) in wanted {
            created |= self.add(doc, field, role);
        }

        removed > 0 || created
    }

    pub fn clear(&mut self) {
        if !self.overlays.is_empty() {
            tracing::debug!("Removing {} overlay(s)", self.overlays.len());
        }
        self.overlays.clear();
    }

    pub fn get(&self, field: NodeId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    fn fields_of(forms: &[DetectedForm]) -> Vec<(NodeId, FieldRole)> {
        forms
            .iter()
            .flat_map(|form| {
                form.username_field
                    .map(|field| (field, FieldRole::Username))
                    .into_iter()
                    .chain([(form.password_field, FieldRole::Password)])
            })
            .collect()
    }

    fn position_of(doc: &Document, field: NodeId) -> Option<OverlayPosition> {
        if !Visibility::is_visible(doc, field) {
            return None;
        }
        let rect = doc.element(field)?.rect?;
        let viewport = doc.viewport();

        Some(OverlayPosition {
            top: viewport.scroll_y + rect.top + rect.height / 2.0 - 10.0,
            left: viewport.scroll_x + rect.right() + 5.0,
        })
    }
}
