//! Upgrade-required signal bus.
//!
//! Locked elements emit an [`UpgradeSignal`] when clicked. The upgrade
//! prompt subscribes to it, and so may anything else (analytics, logging)
//! without changing behavior. Emission is fire-and-forget.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Name of the signal, as used in logs and analytics.
pub const UPGRADE_REQUIRED: &str = "upgrade-required";

/// Payload carried by the upgrade-required signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSignal {
    pub feature_name: String,
}

impl UpgradeSignal {
    pub fn new(feature_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
        }
    }
}

/// Handle returned by [`SignalBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&UpgradeSignal) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
}

/// Observer list for [`UpgradeSignal`]s. Clones share subscribers.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl SignalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(target: "vitrine::gating", "signal bus lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&UpgradeSignal) + Send + Sync + 'static,
    {
        let mut subs = self.subscribers();
        let id = subs.next_id;
        subs.next_id += 1;
        subs.listeners.insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers().listeners.remove(&id.0).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().listeners.len()
    }

    /// Deliver `signal` to every subscriber, returning how many were notified.
    ///
    /// Listeners run outside the bus lock and may subscribe or emit.
    pub fn emit(&self, signal: &UpgradeSignal) -> usize {
        let listeners: Vec<Listener> = self.subscribers().listeners.values().cloned().collect();
        tracing::debug!(
            target: "vitrine::gating",
            signal = UPGRADE_REQUIRED,
            feature = %signal.feature_name,
            listeners = listeners.len(),
            "emitting signal"
        );
        for listener in &listeners {
            listener(signal);
        }
        listeners.len()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_every_subscriber() {
        let bus = SignalBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |signal| seen.lock().unwrap().push(signal.feature_name.clone()));
        }

        assert_eq!(bus.emit(&UpgradeSignal::new("order-tracking")), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["order-tracking", "order-tracking"]);
    }

    #[test]
    fn test_emit_without_subscribers() {
        assert_eq!(SignalBus::new().emit(&UpgradeSignal::new("bulk-import")), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = SignalBus::new();
        let id = bus.subscribe(|_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let bus = SignalBus::new();
        let handle = bus.clone();
        bus.subscribe(move |_| {
            handle.subscribe(|_| {});
        });

        assert_eq!(bus.emit(&UpgradeSignal::new("pdf-invoices")), 1);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(UpgradeSignal::new("order-tracking")).unwrap();
        assert_eq!(json, serde_json::json!({ "featureName": "order-tracking" }));
    }
}
