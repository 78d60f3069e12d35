//! Feature entitlement decisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::entitlements::EntitlementMap;
use super::resolver::PlanResolver;
use super::tier::PlanTier;

/// Result of a feature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureAccess {
    /// Feature is available on the current tier.
    Allowed,
    /// Feature needs a tier the tenant is not on.
    Locked {
        feature: String,
        required_tier: PlanTier,
        current_tier: PlanTier,
    },
}

impl FeatureAccess {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Decides whether features are unlocked for the resolver's current tier.
///
/// Reads a snapshot of the tier on every call and has no side effects.
#[derive(Clone)]
pub struct FeatureQuery {
    map: Arc<EntitlementMap>,
    resolver: Arc<PlanResolver>,
}

impl FeatureQuery {
    #[must_use]
    pub fn new(map: Arc<EntitlementMap>, resolver: Arc<PlanResolver>) -> Self {
        Self { map, resolver }
    }

    /// Whether `feature` is unlocked. Unknown and blank identifiers are unlocked.
    ///
    /// Identifiers are compared as-is, so `" order-tracking "` is an unknown feature.
    pub fn is_entitled(&self, feature: &str) -> bool {
        if feature.trim().is_empty() {
            return true;
        }
        self.map.allows(feature, self.resolver.current_tier())
    }

    /// Detailed form of [`is_entitled`](Self::is_entitled).
    pub fn access(&self, feature: &str) -> FeatureAccess {
        let current_tier = self.resolver.current_tier();
        if feature.trim().is_empty() || self.map.allows(feature, current_tier) {
            return FeatureAccess::Allowed;
        }
        FeatureAccess::Locked {
            feature: feature.to_string(),
            required_tier: self.map.required_tier(feature).unwrap_or(PlanTier::BASELINE),
            current_tier,
        }
    }

    /// Entitlement of every gated feature under the current tier.
    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.map.snapshot_for(self.resolver.current_tier())
    }

    pub fn entitlements(&self) -> &EntitlementMap {
        &self.map
    }

    pub fn resolver(&self) -> &Arc<PlanResolver> {
        &self.resolver
    }
}
