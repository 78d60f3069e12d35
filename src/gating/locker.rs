//! Feature locking for view fragments.
//!
//! [`UiLocker::apply_locks`] reconciles the lock decoration of every marked
//! element under a root against [`FeatureQuery`]. It is meant to run after
//! each render of a fragment, as often as needed: a scan with unchanged
//! entitlement state leaves the document untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::audit::{GateAuditEvent, GateAuditLogger};
use super::query::FeatureQuery;
use super::signal::{SignalBus, UpgradeSignal};
use crate::config::GatingConfig;
use crate::view::{Document, ListenerId, NodeId, ViewError};

/// Counts from one [`UiLocker::apply_locks`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockReport {
    /// Marked elements visited.
    pub scanned: usize,
    /// Elements newly locked or relocked, counting those whose lost badge was restored.
    pub locked: usize,
    pub unlocked: usize,
    pub unchanged: usize,
    /// Elements that failed mid-update and were left as they were.
    pub skipped: usize,
}

impl LockReport {
    /// Whether the pass mutated the document.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.locked > 0 || self.unlocked > 0
    }
}

type Guards = HashMap<NodeId, LockGuard>;

/// What the locker attached to a locked element.
#[derive(Debug, Clone)]
struct LockGuard {
    feature: String,
    listener: ListenerId,
    badge: Option<NodeId>,
}

enum Reconciled {
    Locked,
    Unlocked,
    Unchanged,
}

/// Applies and removes lock decoration on marked elements.
pub struct UiLocker {
    document: Document,
    query: FeatureQuery,
    signals: SignalBus,
    audit: Arc<dyn GateAuditLogger>,
    config: GatingConfig,
    guards: Mutex<Guards>,
}

impl UiLocker {
    #[must_use]
    pub fn new(
        document: Document,
        query: FeatureQuery,
        signals: SignalBus,
        audit: Arc<dyn GateAuditLogger>,
        config: GatingConfig,
    ) -> Self {
        Self {
            document,
            query,
            signals,
            audit,
            config,
            guards: Mutex::new(HashMap::new()),
        }
    }

    fn guards(&self) -> MutexGuard<'_, Guards> {
        match self.guards.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(target: "vitrine::gating", "locker guard lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Lock or unlock every marked element under `root`, `root` included.
    ///
    /// The guard map stays locked for the whole pass, so concurrent scans of
    /// the same document run one after the other.
    pub fn apply_locks(&self, root: NodeId) -> LockReport {
        let mut guards = self.guards();
        self.prune_removed(&mut guards);

        let mut report = LockReport::default();
        let candidates: Vec<NodeId> = self
            .document
            .descendants_inclusive(root)
            .into_iter()
            .filter(|node| {
                self.document.has_attribute(*node, &self.config.feature_attribute)
                    || self.document.has_attribute(*node, &self.config.locked_attribute)
            })
            .collect();

        for node in candidates {
            report.scanned += 1;
            match self.reconcile(&mut guards, node) {
                Ok(Reconciled::Locked) => report.locked += 1,
                Ok(Reconciled::Unlocked) => report.unlocked += 1,
                Ok(Reconciled::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    tracing::debug!(
                        target: "vitrine::gating",
                        node = %node,
                        error = %e,
                        "skipping element"
                    );
                    report.skipped += 1;
                }
            }
        }

        if report.changed() {
            tracing::debug!(
                target: "vitrine::gating",
                scanned = report.scanned,
                locked = report.locked,
                unlocked = report.unlocked,
                skipped = report.skipped,
                "applied feature locks"
            );
        }
        report
    }

    /// Whether `node` currently carries a lock from this locker.
    pub fn is_locked(&self, node: NodeId) -> bool {
        self.guards().contains_key(&node) && self.document.exists(node)
    }

    /// Feature `node` is locked for, if any.
    pub fn locked_feature(&self, node: NodeId) -> Option<String> {
        self.guards().get(&node).map(|guard| guard.feature.clone())
    }

    /// Number of elements currently locked.
    pub fn locked_count(&self) -> usize {
        self.guards().len()
    }

    /// Unlock every element this locker has locked. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let mut guards = self.guards();
        let mut released = 0;
        for (node, guard) in guards.drain() {
            match self.unlock(node, &guard) {
                Ok(()) => released += 1,
                Err(e) => tracing::debug!(
                    target: "vitrine::gating",
                    node = %node,
                    error = %e,
                    "element gone before release"
                ),
            }
        }
        released
    }

    fn reconcile(&self, guards: &mut Guards, node: NodeId) -> Result<Reconciled, ViewError> {
        let feature = self
            .document
            .attribute(node, &self.config.feature_attribute)
            .unwrap_or_default();
        let entitled = feature.trim().is_empty() || self.query.is_entitled(&feature);

        match (guards.remove(&node), entitled) {
            (Some(mut guard), false) if guard.feature == feature => {
                let restored = self.restore_badge(node, &mut guard);
                guards.insert(node, guard);
                if restored? {
                    Ok(Reconciled::Locked)
                } else {
                    Ok(Reconciled::Unchanged)
                }
            }
            (Some(guard), false) => {
                self.unlock(node, &guard)?;
                guards.insert(node, self.lock(node, &feature)?);
                Ok(Reconciled::Locked)
            }
            (None, false) => {
                guards.insert(node, self.lock(node, &feature)?);
                Ok(Reconciled::Locked)
            }
            (Some(guard), true) => {
                self.unlock(node, &guard)?;
                Ok(Reconciled::Unlocked)
            }
            (None, true) => {
                // Leftover marker from markup rendered elsewhere.
                if self.document.has_attribute(node, &self.config.locked_attribute) {
                    self.document.remove_attribute(node, &self.config.locked_attribute)?;
                    self.document.remove_class(node, &self.config.locked_class)?;
                    return Ok(Reconciled::Unlocked);
                }
                Ok(Reconciled::Unchanged)
            }
        }
    }

    fn lock(&self, node: NodeId, feature: &str) -> Result<LockGuard, ViewError> {
        let required = self.query.entitlements().required_tier(feature);

        self.document.add_class(node, &self.config.locked_class)?;
        self.document.set_attribute(node, &self.config.locked_attribute, feature)?;
        let badge = self.attach_badge(node, feature)?;

        let signals = self.signals.clone();
        let signal = UpgradeSignal::new(feature);
        let listener = self.document.add_click_listener(node, true, move |event| {
            event.prevent_default();
            event.stop_immediate_propagation();
            signals.emit(&signal);
        })?;

        self.audit.log(GateAuditEvent::FeatureLocked {
            feature: feature.to_string(),
            required,
        });
        Ok(LockGuard {
            feature: feature.to_string(),
            listener,
            badge: Some(badge),
        })
    }

    fn attach_badge(&self, node: NodeId, feature: &str) -> Result<NodeId, ViewError> {
        let badge = self.document.create_element("span");
        self.document.add_class(badge, &self.config.badge_class)?;
        if let Some(tier) = self.query.entitlements().required_tier(feature) {
            self.document.set_text(badge, tier.display_name())?;
        }
        self.document.append_child(node, badge)?;
        Ok(badge)
    }

    /// Put the badge back when a re-render dropped it. Returns whether it had to.
    fn restore_badge(&self, node: NodeId, guard: &mut LockGuard) -> Result<bool, ViewError> {
        if let Some(badge) = guard.badge {
            if self.document.parent(badge) == Some(node) {
                return Ok(false);
            }
            if self.document.exists(badge) {
                self.document.append_child(node, badge)?;
                return Ok(true);
            }
        }
        guard.badge = Some(self.attach_badge(node, &guard.feature)?);
        tracing::debug!(target: "vitrine::gating", node = %node, feature = %guard.feature, "badge restored");
        Ok(true)
    }

    fn unlock(&self, node: NodeId, guard: &LockGuard) -> Result<(), ViewError> {
        self.document.remove_click_listener(guard.listener);
        if let Some(badge) = guard.badge {
            if let Err(e) = self.document.remove(badge) {
                tracing::debug!(target: "vitrine::gating", node = %node, error = %e, "badge already detached");
            }
        }
        self.document.remove_class(node, &self.config.locked_class)?;
        self.document.remove_attribute(node, &self.config.locked_attribute)?;
        self.audit.log(GateAuditEvent::FeatureUnlocked {
            feature: guard.feature.clone(),
        });
        Ok(())
    }

    fn prune_removed(&self, guards: &mut Guards) {
        guards.retain(|node, _| self.document.exists(*node));
    }
}

impl std::fmt::Debug for UiLocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiLocker")
            .field("locked", &self.locked_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gating::audit::RecordingAuditLogger;
    use crate::gating::{EntitlementMap, PlanResolver, PlanTier};
    use crate::tenant::{InMemoryTenantStore, StoreTenantSource, TenantRecord};
    use std::thread;

    struct Fixture {
        doc: Document,
        resolver: Arc<PlanResolver>,
        signals: SignalBus,
        audit: Arc<RecordingAuditLogger>,
        locker: UiLocker,
        seen: Arc<Mutex<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let doc = Document::new();
        let audit = Arc::new(RecordingAuditLogger::new());
        let source = Arc::new(StoreTenantSource::new(Arc::new(InMemoryTenantStore::new()), "t_1"));
        let resolver = Arc::new(PlanResolver::with_audit_logger(source, audit.clone()));
        let map = EntitlementMap::builder()
            .grant("order-tracking", [PlanTier::Pro])
            .grant("bulk-import", [PlanTier::Pro])
            .build();
        let query = FeatureQuery::new(Arc::new(map), Arc::clone(&resolver));
        let signals = SignalBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            signals.subscribe(move |signal| seen.lock().unwrap().push(signal.feature_name.clone()));
        }
        let locker = UiLocker::new(
            doc.clone(),
            query,
            signals.clone(),
            audit.clone(),
            GatingConfig::default(),
        );
        Fixture {
            doc,
            resolver,
            signals,
            audit,
            locker,
            seen,
        }
    }

    fn set_tier(resolver: &PlanResolver, tier: PlanTier) {
        resolver.initialize(Some(&TenantRecord::new("t_1", "Loja").with_plan(tier.as_str())));
    }

    fn feature_link(doc: &Document, feature: &str) -> NodeId {
        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "/admin/orders/tracking").unwrap();
        doc.set_attribute(link, "data-feature", feature).unwrap();
        doc.append_child(doc.root(), link).unwrap();
        link
    }

    fn badges(doc: &Document, node: NodeId) -> usize {
        doc.query_by_class(node, "plan-badge").len()
    }

    #[test]
    fn test_locks_unentitled_element() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");

        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.scanned, 1);
        assert_eq!(report.locked, 1);

        assert!(f.locker.is_locked(link));
        assert!(f.doc.has_class(link, "feature-locked"));
        assert_eq!(f.doc.attribute(link, "data-locked-feature").as_deref(), Some("order-tracking"));
        let badge = f.doc.query_by_class(link, "plan-badge");
        assert_eq!(badge.len(), 1);
        assert_eq!(f.doc.text(badge[0]).as_deref(), Some("Pro"));
    }

    #[test]
    fn test_repeated_scans_are_idempotent() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");

        f.locker.apply_locks(f.doc.root());
        for _ in 0..3 {
            let report = f.locker.apply_locks(f.doc.root());
            assert!(!report.changed());
            assert_eq!(report.unchanged, 1);
        }

        assert_eq!(badges(&f.doc, link), 1);
        assert_eq!(f.doc.listener_count(link), 1);
        assert_eq!(f.doc.classes(link), vec!["feature-locked"]);

        let outcome = f.doc.click(link).unwrap();
        assert_eq!(outcome.handlers_invoked, 1);
        assert_eq!(f.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_upgrade_unlocks_and_click_passes_through() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());

        set_tier(&f.resolver, PlanTier::Pro);
        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.unlocked, 1);

        assert!(!f.locker.is_locked(link));
        assert!(!f.doc.has_class(link, "feature-locked"));
        assert!(!f.doc.has_attribute(link, "data-locked-feature"));
        assert_eq!(badges(&f.doc, link), 0);
        assert_eq!(f.doc.listener_count(link), 0);

        let outcome = f.doc.click(link).unwrap();
        assert!(!outcome.default_prevented);
        assert_eq!(outcome.navigated_to.as_deref(), Some("/admin/orders/tracking"));
        assert!(f.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_downgrade_locks_and_click_is_intercepted() {
        let f = fixture();
        set_tier(&f.resolver, PlanTier::Pro);
        let link = feature_link(&f.doc, "bulk-import");
        assert_eq!(f.locker.apply_locks(f.doc.root()).unchanged, 1);

        set_tier(&f.resolver, PlanTier::Plus);
        assert_eq!(f.locker.apply_locks(f.doc.root()).locked, 1);

        let outcome = f.doc.click(link).unwrap();
        assert!(outcome.default_prevented);
        assert!(outcome.navigated_to.is_none());
        assert_eq!(*f.seen.lock().unwrap(), vec!["bulk-import"]);
    }

    #[test]
    fn test_guard_runs_before_other_listeners() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        let icon = f.doc.create_element("i");
        f.doc.append_child(link, icon).unwrap();

        let inner_clicks = Arc::new(Mutex::new(0));
        {
            let inner_clicks = Arc::clone(&inner_clicks);
            f.doc
                .add_click_listener(link, false, move |_| *inner_clicks.lock().unwrap() += 1)
                .unwrap();
        }
        f.locker.apply_locks(f.doc.root());

        f.doc.click(icon).unwrap();
        f.doc.click(link).unwrap();
        assert_eq!(*inner_clicks.lock().unwrap(), 0);
        assert_eq!(f.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_feature_change_relocks() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());

        f.doc.set_attribute(link, "data-feature", "bulk-import").unwrap();
        assert_eq!(f.locker.apply_locks(f.doc.root()).locked, 1);

        assert_eq!(f.locker.locked_feature(link).as_deref(), Some("bulk-import"));
        assert_eq!(f.doc.attribute(link, "data-locked-feature").as_deref(), Some("bulk-import"));
        assert_eq!(badges(&f.doc, link), 1);
        assert_eq!(f.doc.listener_count(link), 1);

        f.doc.click(link).unwrap();
        assert_eq!(*f.seen.lock().unwrap(), vec!["bulk-import"]);
    }

    #[test]
    fn test_badge_restored_after_children_replaced() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());

        for child in f.doc.children(link) {
            f.doc.remove(child).unwrap();
        }
        let label = f.doc.create_element("span");
        f.doc.set_text(label, "Tracking").unwrap();
        f.doc.append_child(link, label).unwrap();

        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.locked, 1);
        assert_eq!(badges(&f.doc, link), 1);
        assert_eq!(f.doc.listener_count(link), 1);

        assert_eq!(f.locker.apply_locks(f.doc.root()).unchanged, 1);
        assert_eq!(badges(&f.doc, link), 1);
    }

    #[test]
    fn test_moved_badge_is_reattached() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());

        let badge = f.doc.query_by_class(link, "plan-badge")[0];
        f.doc.append_child(f.doc.root(), badge).unwrap();

        assert_eq!(f.locker.apply_locks(f.doc.root()).locked, 1);
        assert_eq!(f.doc.parent(badge), Some(link));
        assert_eq!(f.doc.query_by_class(f.doc.root(), "plan-badge").len(), 1);
    }

    fn scan_concurrently(locker: &Arc<UiLocker>, root: NodeId, threads: usize, passes: usize) {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let locker = Arc::clone(locker);
                thread::spawn(move || {
                    for _ in 0..passes {
                        locker.apply_locks(root);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_scans_keep_one_guard_per_element() {
        let f = fixture();
        let links: Vec<NodeId> = (0..8).map(|_| feature_link(&f.doc, "order-tracking")).collect();
        let root = f.doc.root();
        let locker = Arc::new(f.locker);

        scan_concurrently(&locker, root, 4, 500);

        assert_eq!(locker.locked_count(), links.len());
        for link in &links {
            assert_eq!(badges(&f.doc, *link), 1);
            assert_eq!(f.doc.listener_count(*link), 1);
        }

        // Entitled now: no orphaned guard may keep intercepting clicks.
        set_tier(&f.resolver, PlanTier::Pro);
        scan_concurrently(&locker, root, 4, 50);

        assert_eq!(locker.locked_count(), 0);
        for link in links {
            assert_eq!(badges(&f.doc, link), 0);
            assert_eq!(f.doc.listener_count(link), 0);
            let outcome = f.doc.click(link).unwrap();
            assert_eq!(outcome.navigated_to.as_deref(), Some("/admin/orders/tracking"));
        }
        assert!(f.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_feature_ids_match_exactly() {
        let f = fixture();
        let padded = feature_link(&f.doc, " order-tracking ");

        assert_eq!(f.locker.apply_locks(f.doc.root()).unchanged, 1);
        assert!(!f.locker.is_locked(padded));
        assert_eq!(badges(&f.doc, padded), 0);
    }

    #[test]
    fn test_marker_removed_unlocks() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());

        f.doc.remove_attribute(link, "data-feature").unwrap();
        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.unlocked, 1);
        assert!(!f.locker.is_locked(link));
        assert!(!f.doc.has_class(link, "feature-locked"));
    }

    #[test]
    fn test_unmapped_and_blank_markers_untouched() {
        let f = fixture();
        let open = feature_link(&f.doc, "catalog");
        let blank = feature_link(&f.doc, "   ");

        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.scanned, 2);
        assert_eq!(report.unchanged, 2);
        for node in [open, blank] {
            assert!(f.doc.classes(node).is_empty());
            assert_eq!(f.doc.children(node).len(), 0);
        }
    }

    #[test]
    fn test_stale_marker_cleared_when_entitled() {
        let f = fixture();
        let link = feature_link(&f.doc, "catalog");
        f.doc.set_attribute(link, "data-locked-feature", "catalog").unwrap();
        f.doc.add_class(link, "feature-locked").unwrap();

        assert_eq!(f.locker.apply_locks(f.doc.root()).unlocked, 1);
        assert!(!f.doc.has_attribute(link, "data-locked-feature"));
        assert!(!f.doc.has_class(link, "feature-locked"));
    }

    #[test]
    fn test_detached_badge_does_not_block_unlock() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        let sibling = feature_link(&f.doc, "bulk-import");
        f.locker.apply_locks(f.doc.root());

        let badge = f.doc.query_by_class(link, "plan-badge")[0];
        f.doc.remove(badge).unwrap();

        set_tier(&f.resolver, PlanTier::Pro);
        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.unlocked, 2);
        assert!(!f.locker.is_locked(link));
        assert!(!f.locker.is_locked(sibling));
    }

    #[test]
    fn test_removed_elements_are_forgotten() {
        let f = fixture();
        let link = feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());
        assert_eq!(f.locker.locked_count(), 1);

        f.doc.remove(link).unwrap();
        let report = f.locker.apply_locks(f.doc.root());
        assert_eq!(report.scanned, 0);
        assert_eq!(f.locker.locked_count(), 0);
    }

    #[test]
    fn test_scan_limited_to_root() {
        let f = fixture();
        let section = f.doc.create_element("section");
        f.doc.append_child(f.doc.root(), section).unwrap();
        let inside = f.doc.create_element("button");
        f.doc.set_attribute(inside, "data-feature", "order-tracking").unwrap();
        f.doc.append_child(section, inside).unwrap();
        let outside = feature_link(&f.doc, "bulk-import");

        f.locker.apply_locks(section);
        assert!(f.locker.is_locked(inside));
        assert!(!f.locker.is_locked(outside));
    }

    #[test]
    fn test_release_all() {
        let f = fixture();
        let a = feature_link(&f.doc, "order-tracking");
        let b = feature_link(&f.doc, "bulk-import");
        f.locker.apply_locks(f.doc.root());

        assert_eq!(f.locker.release_all(), 2);
        for node in [a, b] {
            assert!(!f.doc.has_class(node, "feature-locked"));
            assert_eq!(f.doc.listener_count(node), 0);
        }
        assert_eq!(f.locker.locked_count(), 0);
        assert_eq!(f.signals.subscriber_count(), 1);
    }

    #[test]
    fn test_lock_changes_are_audited() {
        let f = fixture();
        feature_link(&f.doc, "order-tracking");
        f.locker.apply_locks(f.doc.root());
        set_tier(&f.resolver, PlanTier::Pro);
        f.locker.apply_locks(f.doc.root());

        let changes: Vec<_> = f
            .audit
            .events()
            .into_iter()
            .filter(|e| !matches!(e, GateAuditEvent::TierResolved { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![
                GateAuditEvent::FeatureLocked {
                    feature: "order-tracking".to_string(),
                    required: Some(PlanTier::Pro),
                },
                GateAuditEvent::FeatureUnlocked {
                    feature: "order-tracking".to_string(),
                },
            ]
        );
    }
}
