//! Plan entitlement gating.
//!
//! A tenant's plan tier decides which features are unlocked. Elements that
//! depend on a feature declare it with a marker attribute
//! (`data-feature="order-tracking"`); the [`UiLocker`] decorates the ones
//! the tenant is not entitled to and intercepts their clicks, which opens
//! the [`UpgradePrompt`].
//!
//! Gating is a UX affordance. It does not replace access control in the
//! tenant store.
//!
//! Most applications only need a [`GateContext`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use vitrine::gating::{GateContext, PlanTier};
//! use vitrine::tenant::{InMemoryTenantStore, StoreTenantSource, TenantRecord};
//!
//! let store = Arc::new(InMemoryTenantStore::new());
//! let gate = GateContext::builder()
//!     .tenant_source(Arc::new(StoreTenantSource::new(store, "t_1")))
//!     .build()
//!     .unwrap();
//!
//! let tier = gate.bootstrap(Some(&TenantRecord::new("t_1", "Padaria").with_plan("pro")));
//! assert_eq!(tier, PlanTier::Pro);
//! assert!(gate.query().is_entitled("order-tracking"));
//! ```

pub mod audit;
mod context;
mod entitlements;
mod locker;
mod prompt;
mod query;
mod resolver;
mod signal;
mod tier;

pub use audit::{GateAuditEvent, GateAuditLogger, NoOpAuditLogger, RecordingAuditLogger, TracingAuditLogger};
pub use context::{GateContext, GateContextBuilder};
pub use entitlements::{EntitlementMap, EntitlementMapBuilder, TierInversion};
pub use locker::{LockReport, UiLocker};
pub use prompt::{PromptOverlay, UpgradePrompt, VISIBLE_CLASS, feature_label};
pub use query::{FeatureAccess, FeatureQuery};
pub use resolver::{PlanResolver, resolve_tier};
pub use signal::{SignalBus, SubscriptionId, UPGRADE_REQUIRED, UpgradeSignal};
pub use tier::PlanTier;
