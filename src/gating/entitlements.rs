//! Declarative feature-to-plan mapping.
//!
//! A feature that is not listed is open to every tier. The map is built
//! once at startup, either in code or from a deployment-supplied JSON
//! object, and never changes afterwards.
//!
//! ```rust
//! use vitrine::gating::{EntitlementMap, PlanTier};
//!
//! let map = EntitlementMap::builder()
//!     .grant("order-tracking", [PlanTier::Pro])
//!     .grant_from("catalog-themes", PlanTier::Plus)
//!     .build();
//!
//! assert!(map.allows("order-tracking", PlanTier::Pro));
//! assert!(!map.allows("order-tracking", PlanTier::Plus));
//! assert!(map.allows("not-listed", PlanTier::Plus));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use super::tier::PlanTier;

/// Immutable table of gated features.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntitlementMap {
    features: BTreeMap<String, BTreeSet<PlanTier>>,
}

/// A feature granted to a lower tier but withheld from a higher one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierInversion {
    pub feature: String,
    pub granted: PlanTier,
    pub withheld: PlanTier,
}

impl EntitlementMap {
    #[must_use]
    pub fn builder() -> EntitlementMapBuilder {
        EntitlementMapBuilder::default()
    }

    /// The map shipped with the product.
    #[must_use]
    pub fn standard() -> Self {
        Self::builder()
            .grant("order-tracking", [PlanTier::Pro])
            .grant("bulk-import", [PlanTier::Pro])
            .grant("pdf-invoices", [PlanTier::Pro])
            .grant("sales-analytics", [PlanTier::Pro])
            .grant("custom-links", [PlanTier::Pro])
            .build()
    }

    /// Build a map from `{ "feature": ["tier", ...] }`.
    ///
    /// Unknown tier names are skipped and features left without any tier are
    /// dropped, which leaves them open. Both cases are logged.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        let Some(obj) = json.as_object() else {
            tracing::warn!(target: "vitrine::gating", "entitlement map is not a JSON object, using an empty map");
            return Self::default();
        };

        let mut builder = Self::builder();
        for (feature, tiers) in obj {
            let names: Vec<&str> = match tiers {
                serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
                serde_json::Value::String(single) => vec![single.as_str()],
                _ => Vec::new(),
            };

            let mut parsed = BTreeSet::new();
            for name in names {
                match PlanTier::parse(name) {
                    Some(tier) => {
                        parsed.insert(tier);
                    }
                    None => tracing::warn!(
                        target: "vitrine::gating",
                        feature = %feature,
                        tier = %name,
                        "unknown tier in entitlement map, skipping"
                    ),
                }
            }

            if parsed.is_empty() {
                tracing::warn!(
                    target: "vitrine::gating",
                    feature = %feature,
                    "feature has no valid tiers and will be open to everyone"
                );
                continue;
            }
            builder = builder.grant(feature.as_str(), parsed);
        }
        builder.build()
    }

    /// Tiers unlocking `feature`; `None` means the feature is not gated.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&BTreeSet<PlanTier>> {
        self.features.get(feature)
    }

    /// Whether `tier` may use `feature`.
    #[must_use]
    pub fn allows(&self, feature: &str, tier: PlanTier) -> bool {
        self.get(feature).is_none_or(|tiers| tiers.contains(&tier))
    }

    /// Lowest-ranked tier unlocking `feature`, if it is gated.
    #[must_use]
    pub fn required_tier(&self, feature: &str) -> Option<PlanTier> {
        self.get(feature).and_then(|tiers| tiers.iter().min_by_key(|t| t.rank()).copied())
    }

    /// Entitlement of every gated feature for `tier`.
    #[must_use]
    pub fn snapshot_for(&self, tier: PlanTier) -> BTreeMap<String, bool> {
        self.features
            .iter()
            .map(|(feature, tiers)| (feature.clone(), tiers.contains(&tier)))
            .collect()
    }

    /// Gated feature identifiers in sorted order.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose grants do not respect tier rank.
    #[must_use]
    pub fn inversions(&self) -> Vec<TierInversion> {
        let mut out = Vec::new();
        for (feature, tiers) in &self.features {
            for granted in tiers {
                for withheld in granted.and_above().filter(|t| !tiers.contains(t)) {
                    out.push(TierInversion {
                        feature: feature.clone(),
                        granted: *granted,
                        withheld,
                    });
                }
            }
        }
        out
    }
}

/// Builder for [`EntitlementMap`].
#[derive(Debug, Default)]
#[must_use = "builder does nothing until you call build()"]
pub struct EntitlementMapBuilder {
    features: BTreeMap<String, BTreeSet<PlanTier>>,
}

impl EntitlementMapBuilder {
    /// Gate `feature` to exactly `tiers`. An empty set leaves the feature open.
    pub fn grant(mut self, feature: impl Into<String>, tiers: impl IntoIterator<Item = PlanTier>) -> Self {
        let feature = feature.into();
        let tiers: BTreeSet<PlanTier> = tiers.into_iter().collect();
        if tiers.is_empty() {
            self.features.remove(&feature);
        } else {
            self.features.insert(feature, tiers);
        }
        self
    }

    /// Gate `feature` to `min_tier` and every tier ranked above it.
    pub fn grant_from(self, feature: impl Into<String>, min_tier: PlanTier) -> Self {
        self.grant(feature, min_tier.and_above())
    }

    /// Finish the map, logging any rank inversions.
    pub fn build(self) -> EntitlementMap {
        let map = EntitlementMap { features: self.features };
        for inversion in map.inversions() {
            tracing::warn!(
                target: "vitrine::gating",
                feature = %inversion.feature,
                granted = %inversion.granted,
                withheld = %inversion.withheld,
                "feature is granted to a lower tier than one it is withheld from"
            );
        }
        map
    }
}
