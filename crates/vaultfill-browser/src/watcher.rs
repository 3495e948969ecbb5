use crate::overlay::OverlayIndex;
use std::time::Duration;
use tokio::time::Instant;
use vaultfill_core::Document;
use vaultfill_detectors::DetectedForm;

/// Attributes whose changes can reveal or hide a login form
const OBSERVED_ATTRIBUTES: &[&str] = &["style", "class"];

/// A change reported by a page backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageChange {
    /// Nodes inserted or removed anywhere in the document
    ChildList,
    /// An attribute changed on some element
    Attribute { name: String },
    /// The top-level document was replaced
    Navigated,
}

impl PageChange {
    /// Child-list changes and `style` / `class` attribute changes
    pub fn is_observed(&self) -> bool {
        match self {
            PageChange::ChildList => true,
            PageChange::Attribute { name } => OBSERVED_ATTRIBUTES
                .iter()
                .any(|a| a.eq_ignore_ascii_case(name)),
            PageChange::Navigated => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PendingScan { deadline: Instant },
}

/// What a polling pass did to the overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Unchanged,
    /// Forms are gone, stale overlays were removed
    Cleared,
    /// Forms appeared with nothing tracked, overlays were created
    Created(usize),
    /// Tracked fields no longer matched the detected ones and were replaced
    Resynced(usize),
}

/// Debounces page changes into scans and owns the page's overlays
///
/// Pure state machine: callers pass the current time and run the scans. A
/// burst of changes restarts the same timer, so it yields exactly one scan.
#[derive(Debug)]
pub struct MutationWatcher {
    state: WatchState,
    debounce: Duration,
    running: bool,
    overlays: OverlayIndex,
}

impl MutationWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: WatchState::Idle,
            debounce,
            running: false,
            overlays: OverlayIndex::new(),
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::debug!("Mutation watcher started");
        }
        self.running = true;
    }

    /// Stop observing, drop any pending scan and every overlay
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("Mutation watcher stopped");
        }
        self.running = false;
        self.state = WatchState::Idle;
        self.overlays.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, WatchState::PendingScan { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::PendingScan { deadline } => Some(deadline),
            WatchState::Idle => None,
        }
    }

    /// Arm (or re-arm) the debounce timer. Returns whether the change was
    /// observed.
    pub fn on_change(&mut self, change: &PageChange, now: Instant) -> bool {
        if !self.running || !change.is_observed() {
            return false;
        }

        let deadline = now + self.debounce;
        if self.is_pending() {
            tracing::trace!("Debounce timer restarted");
        } else {
            tracing::debug!("Change observed, scan pending");
        }
        self.state = WatchState::PendingScan { deadline };
        true
    }

    /// Timer check. Returns `true` exactly once per pending scan, when its
    /// deadline has passed, and goes back to Idle.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::PendingScan { deadline } if now >= deadline => {
                self.state = WatchState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Record the results of a triggered scan. The overlays end up tracking
    /// exactly the fields detected in `doc`.
    pub fn apply_scan(&mut self, doc: &Document, forms: &[DetectedForm]) {
        self.overlays.sync_forms(doc, forms);
    }

    /// Safety-net pass run on the polling interval
    pub fn reconcile(&mut self, doc: &Document, forms: &[DetectedForm]) -> Reconciled {
        if forms.is_empty() {
            if self.overlays.is_empty() {
                return Reconciled::Unchanged;
            }
            self.overlays.clear();
            return Reconciled::Cleared;
        }

        if self.overlays.is_empty() {
            self.overlays.add_forms(doc, forms);
            if !self.overlays.is_empty() {
                return Reconciled::Created(self.overlays.len());
            }
            return Reconciled::Unchanged;
        }

        if self.overlays.sync_forms(doc, forms) {
            Reconciled::Resynced(self.overlays.len())
        } else {
            Reconciled::Unchanged
        }
    }

    pub fn overlays(&self) -> &OverlayIndex {
        &self.overlays
    }

    pub fn overlays_mut(&mut self) -> &mut OverlayIndex {
        &mut self.overlays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultfill_core::dom::{NodeSnapshot, PageSnapshot};
    use vaultfill_detectors::FormLocator;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn started() -> MutationWatcher {
        let mut watcher = MutationWatcher::new(DEBOUNCE);
        watcher.start();
        watcher
    }

    fn login_page() -> Document {
        page_with(Vec::new())
    }

    /// The login page with `leading` nodes inserted ahead of the form
    fn page_with(leading: Vec<NodeSnapshot>) -> Document {
        let form = NodeSnapshot::new("form").children([
            NodeSnapshot::input("email").rect(10.0, 10.0, 200.0, 30.0),
            NodeSnapshot::input("password").rect(10.0, 50.0, 200.0, 30.0),
        ]);
        let body = NodeSnapshot::new("body").children(leading.into_iter().chain([form]));
        let root = NodeSnapshot::new("html").child(body);
        Document::from_snapshot(&PageSnapshot::new("https://example.com", root))
    }

    fn tracked(watcher: &MutationWatcher, doc: &Document) -> Vec<String> {
        watcher.overlays().iter().map(|o| doc.describe(o.field)).collect()
    }

    #[test]
    fn test_observed_changes() {
        assert!(PageChange::ChildList.is_observed());
        assert!(PageChange::Attribute { name: "style".to_string() }.is_observed());
        assert!(PageChange::Attribute { name: "CLASS".to_string() }.is_observed());
        assert!(!PageChange::Attribute { name: "value".to_string() }.is_observed());
        assert!(!PageChange::Navigated.is_observed());
    }

    #[test]
    fn test_idle_until_started() {
        let mut watcher = MutationWatcher::new(DEBOUNCE);
        assert!(!watcher.on_change(&PageChange::ChildList, Instant::now()));
        assert_eq!(watcher.state(), WatchState::Idle);
    }

    #[test]
    fn test_burst_coalesces_into_one_scan() {
        let mut watcher = started();
        let t0 = Instant::now();

        watcher.on_change(&PageChange::ChildList, t0);
        watcher.on_change(&PageChange::ChildList, t0 + Duration::from_millis(200));
        watcher.on_change(
            &PageChange::Attribute { name: "class".to_string() },
            t0 + Duration::from_millis(400),
        );
        assert_eq!(watcher.deadline(), Some(t0 + Duration::from_millis(900)));

        // The first deadline would have been 500ms; the timer was restarted
        assert!(!watcher.on_timer(t0 + Duration::from_millis(600)));
        assert!(watcher.on_timer(t0 + Duration::from_millis(900)));
        assert!(!watcher.on_timer(t0 + Duration::from_millis(1000)));
        assert_eq!(watcher.state(), WatchState::Idle);
    }

    #[test]
    fn test_ignored_attribute_does_not_arm() {
        let mut watcher = started();
        assert!(!watcher.on_change(
            &PageChange::Attribute { name: "aria-label".to_string() },
            Instant::now()
        ));
        assert!(!watcher.is_pending());
    }

    #[test]
    fn test_stop_drops_pending_scan_and_overlays() {
        let doc = login_page();
        let forms = FormLocator::find_login_forms(&doc);
        let mut watcher = started();
        watcher.apply_scan(&doc, &forms);
        watcher.on_change(&PageChange::ChildList, Instant::now());

        watcher.stop();
        assert!(!watcher.is_pending());
        assert!(watcher.overlays().is_empty());
    }

    #[test]
    fn test_reconcile_creates_then_clears() {
        let doc = login_page();
        let forms = FormLocator::find_login_forms(&doc);
        let mut watcher = started();

        assert_eq!(watcher.reconcile(&doc, &forms), Reconciled::Created(2));
        assert_eq!(watcher.reconcile(&doc, &forms), Reconciled::Unchanged);
        assert_eq!(watcher.reconcile(&doc, &[]), Reconciled::Cleared);
        assert_eq!(watcher.reconcile(&doc, &[]), Reconciled::Unchanged);
    }

    #[test]
    fn test_rescan_after_nodes_shift() {
        let first = login_page();
        let mut watcher = started();
        watcher.apply_scan(&first, &FormLocator::find_login_forms(&first));

        let second = page_with(vec![NodeSnapshot::new("div").child(NodeSnapshot::new("span"))]);
        let forms = FormLocator::find_login_forms(&second);
        watcher.apply_scan(&second, &forms);

        assert_eq!(
            tracked(&watcher, &second),
            vec!["input[type=email]", "input[type=password]"]
        );
        assert_eq!(watcher.reconcile(&second, &forms), Reconciled::Unchanged);
        assert_eq!(watcher.overlays().len(), 2);
    }

    #[test]
    fn test_reconcile_replaces_stale_overlays() {
        let first = login_page();
        let mut watcher = started();
        watcher.apply_scan(&first, &FormLocator::find_login_forms(&first));

        // A mutation the observer missed moved the form
        let second = page_with(vec![
            NodeSnapshot::new("header"),
            NodeSnapshot::new("nav"),
            NodeSnapshot::new("p"),
        ]);
        let forms = FormLocator::find_login_forms(&second);
        assert_eq!(watcher.reconcile(&second, &forms), Reconciled::Resynced(2));
        assert_eq!(
            tracked(&watcher, &second),
            vec!["input[type=email]", "input[type=password]"]
        );
    }

    #[test]
    fn test_scan_without_forms_drops_overlays() {
        let doc = login_page();
        let mut watcher = started();
        watcher.apply_scan(&doc, &FormLocator::find_login_forms(&doc));
        assert_eq!(watcher.overlays().len(), 2);

        watcher.apply_scan(&doc, &[]);
        assert!(watcher.overlays().is_empty());
    }
}
