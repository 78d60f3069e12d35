//! Upgrade prompt overlay.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::audit::{GateAuditEvent, GateAuditLogger};
use super::entitlements::EntitlementMap;
use super::signal::{SignalBus, SubscriptionId};
use crate::view::{Document, NodeId, ViewError};

pub const VISIBLE_CLASS: &str = "is-visible";

const FALLBACK_LABEL: &str = "This feature";
const FALLBACK_TIER: &str = "a higher plan";

/// Display label for a feature id.
pub fn feature_label(feature: &str) -> &'static str {
    match feature {
        "order-tracking" => "Order tracking",
        "bulk-import" => "Bulk product import",
        "pdf-invoices" => "PDF invoices",
        "sales-analytics" => "Sales analytics",
        "custom-links" => "Custom links",
        _ => FALLBACK_LABEL,
    }
}

/// Nodes making up the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOverlay {
    pub root: NodeId,
    pub modal: NodeId,
    pub close: NodeId,
    pub title: NodeId,
    pub message: NodeId,
    pub cta: NodeId,
    pub later: NodeId,
}

#[derive(Default)]
struct PromptState {
    overlay: Option<PromptOverlay>,
    visible: bool,
    last_feature: Option<String>,
}

struct PromptInner {
    document: Document,
    map: Arc<EntitlementMap>,
    upgrade_url: String,
    audit: Arc<dyn GateAuditLogger>,
    state: Mutex<PromptState>,
}

/// Paywall overlay shown when a locked element is clicked.
///
/// Subscribes to the signal bus on construction and unsubscribes on drop.
/// The overlay is built on the first [`show`](Self::show) and reused after.
pub struct UpgradePrompt {
    inner: Arc<PromptInner>,
    signals: SignalBus,
    subscription: SubscriptionId,
}

impl UpgradePrompt {
    pub fn new(
        document: Document,
        map: Arc<EntitlementMap>,
        signals: SignalBus,
        upgrade_url: impl Into<String>,
        audit: Arc<dyn GateAuditLogger>,
    ) -> Self {
        let inner = Arc::new(PromptInner {
            document,
            map,
            upgrade_url: upgrade_url.into(),
            audit,
            state: Mutex::new(PromptState::default()),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = signals.subscribe(move |signal| {
            if let Some(inner) = weak.upgrade() {
                inner.show(&signal.feature_name);
            }
        });

        Self {
            inner,
            signals,
            subscription,
        }
    }

    /// Show the overlay for `feature`. Unknown features get generic copy.
    pub fn show(&self, feature: &str) {
        self.inner.show(feature);
    }

    /// Hide the overlay. Safe to call at any time.
    pub fn hide(&self) {
        self.inner.hide();
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state().visible
    }

    /// Feature passed to the most recent [`show`](Self::show).
    pub fn last_feature(&self) -> Option<String> {
        self.inner.state().last_feature.clone()
    }

    /// Overlay nodes, once built.
    pub fn overlay(&self) -> Option<PromptOverlay> {
        self.inner.state().overlay
    }
}

impl Drop for UpgradePrompt {
    fn drop(&mut self) {
        self.signals.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for UpgradePrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("UpgradePrompt")
            .field("visible", &state.visible)
            .field("last_feature", &state.last_feature)
            .finish_non_exhaustive()
    }
}

impl PromptInner {
    fn state(&self) -> MutexGuard<'_, PromptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(target: "vitrine::gating", "prompt state lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn show(self: &Arc<Self>, feature: &str) {
        let mut state = self.state();
        let overlay = match self.ensure_overlay(state.overlay) {
            Ok(overlay) => overlay,
            Err(e) => {
                tracing::warn!(
                    target: "vitrine::gating",
                    feature = %feature,
                    error = %e,
                    "failed to build upgrade prompt"
                );
                return;
            }
        };
        state.overlay = Some(overlay);

        if let Err(e) = self.render_copy(&overlay, feature) {
            tracing::warn!(target: "vitrine::gating", error = %e, "failed to render upgrade prompt");
            return;
        }
        if let Err(e) = self.document.add_class(overlay.root, VISIBLE_CLASS) {
            tracing::warn!(target: "vitrine::gating", error = %e, "failed to show upgrade prompt");
            return;
        }
        state.visible = true;
        state.last_feature = Some(feature.to_string());
        drop(state);

        self.audit.log(GateAuditEvent::UpgradePromptShown {
            feature: feature.to_string(),
        });
    }

    fn hide(&self) {
        let mut state = self.state();
        if let Some(overlay) = state.overlay {
            if let Err(e) = self.document.remove_class(overlay.root, VISIBLE_CLASS) {
                tracing::debug!(target: "vitrine::gating", error = %e, "overlay already removed");
            }
        }
        state.visible = false;
    }

    fn render_copy(&self, overlay: &PromptOverlay, feature: &str) -> Result<(), ViewError> {
        let label = feature_label(feature);
        let (title, message) = match self.map.required_tier(feature) {
            Some(tier) => (
                format!("Upgrade to {}", tier.display_name()),
                format!(
                    "{} is available on the {} plan. Upgrade to unlock it for your store.",
                    label,
                    tier.display_name()
                ),
            ),
            None => (
                format!("Upgrade to {}", FALLBACK_TIER),
                format!("{} is available on {}. Upgrade to unlock it for your store.", label, FALLBACK_TIER),
            ),
        };

        self.document.set_text(overlay.title, &title)?;
        self.document.set_text(overlay.message, &message)?;
        Ok(())
    }

    /// Reuse the existing overlay, reattaching or rebuilding it when the page dropped it.
    fn ensure_overlay(self: &Arc<Self>, existing: Option<PromptOverlay>) -> Result<PromptOverlay, ViewError> {
        let root = self.document.root();
        if let Some(overlay) = existing {
            if self.document.exists(overlay.root) {
                if !self.document.contains(root, overlay.root) {
                    self.document.append_child(root, overlay.root)?;
                }
                return Ok(overlay);
            }
        }
        self.build_overlay(root)
    }

    fn build_overlay(self: &Arc<Self>, parent: NodeId) -> Result<PromptOverlay, ViewError> {
        let doc = &self.document;
        let element = |tag: &str, class: &str| -> Result<NodeId, ViewError> {
            let node = doc.create_element(tag);
            doc.add_class(node, class)?;
            Ok(node)
        };

        let overlay = PromptOverlay {
            root: element("div", "upgrade-overlay")?,
            modal: element("div", "upgrade-modal")?,
            close: element("button", "upgrade-close")?,
            title: element("h3", "upgrade-title")?,
            message: element("p", "upgrade-message")?,
            cta: element("a", "upgrade-cta")?,
            later: element("button", "upgrade-later")?,
        };

        doc.set_text(overlay.close, "Close")?;
        doc.set_attribute(overlay.close, "aria-label", "Close")?;
        doc.set_text(overlay.cta, "See plans")?;
        doc.set_attribute(overlay.cta, "href", &self.upgrade_url)?;
        doc.set_text(overlay.later, "Maybe later")?;

        for child in [overlay.close, overlay.title, overlay.message, overlay.cta, overlay.later] {
            doc.append_child(overlay.modal, child)?;
        }
        doc.append_child(overlay.root, overlay.modal)?;

        for button in [overlay.close, overlay.later] {
            let weak = Arc::downgrade(self);
            doc.add_click_listener(button, false, move |_| hide_weak(&weak))?;
        }
        let weak = Arc::downgrade(self);
        doc.add_click_listener(overlay.root, false, move |event| {
            if event.target() == event.current_target() {
                hide_weak(&weak);
            }
        })?;

        doc.append_child(parent, overlay.root)?;
        tracing::debug!(target: "vitrine::gating", overlay = %overlay.root, "built upgrade prompt");
        Ok(overlay)
    }
}

fn hide_weak(weak: &Weak<PromptInner>) {
    if let Some(inner) = weak.upgrade() {
        inner.hide();
    }
}
