//! Session plan resolution.
//!
//! The resolver is the single owner of "which plan is this tenant on".
//! It never fails: unknown plans and fetch errors both degrade to
//! [`PlanTier::BASELINE`], which renders the most restricted UI.

use std::sync::{Arc, RwLock};

use super::audit::{GateAuditEvent, GateAuditLogger, TracingAuditLogger};
use super::tier::PlanTier;
use crate::tenant::{TenantRecord, TenantSource};

/// Tier for a tenant record, without touching any session state.
pub fn resolve_tier(tenant: Option<&TenantRecord>) -> PlanTier {
    match tenant.and_then(|t| t.plan.as_deref()) {
        Some(raw) => PlanTier::parse(raw).unwrap_or_else(|| {
            tracing::debug!(
                target: "vitrine::gating",
                plan = %raw,
                "unrecognized plan, using baseline tier"
            );
            PlanTier::BASELINE
        }),
        None => PlanTier::BASELINE,
    }
}

/// Holds the current tenant's plan tier for one session.
///
/// Construct one per session at bootstrap and share it by `Arc`.
pub struct PlanResolver {
    tier: RwLock<PlanTier>,
    source: Arc<dyn TenantSource>,
    audit: Arc<dyn GateAuditLogger>,
}

impl PlanResolver {
    /// Resolver at the baseline tier, auditing through `tracing`.
    #[must_use]
    pub fn new(source: Arc<dyn TenantSource>) -> Self {
        Self::with_audit_logger(source, Arc::new(TracingAuditLogger))
    }

    #[must_use]
    pub fn with_audit_logger(source: Arc<dyn TenantSource>, audit: Arc<dyn GateAuditLogger>) -> Self {
        Self {
            tier: RwLock::new(PlanTier::BASELINE),
            source,
            audit,
        }
    }

    /// Seed the tier from a tenant record. Missing or unrecognized plans map to the baseline.
    pub fn initialize(&self, tenant: Option<&TenantRecord>) -> PlanTier {
        let tier = resolve_tier(tenant);
        self.store(tier);
        self.audit.log(GateAuditEvent::TierResolved {
            tier,
            raw_plan: tenant.and_then(|t| t.plan.clone()),
        });
        tier
    }

    /// Current tier; the baseline until initialized.
    pub fn current_tier(&self) -> PlanTier {
        // A poisoned lock still holds a valid tier.
        match self.tier.read() {
            Ok(tier) => *tier,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Re-fetch the tenant and re-resolve.
    ///
    /// Never returns an error: on fetch failure the failure is logged and
    /// the baseline tier is stored and returned. The stored tier is updated
    /// before this future completes.
    pub async fn refresh(&self) -> PlanTier {
        match self.source.current_tenant().await {
            Ok(tenant) => self.initialize(tenant.as_ref()),
            Err(e) => {
                tracing::warn!(
                    target: "vitrine::gating",
                    error = %e,
                    "failed to refresh tenant plan, falling back to baseline tier"
                );
                self.store(PlanTier::BASELINE);
                self.audit.log(GateAuditEvent::ResolutionFailed {
                    error: e.to_string(),
                    fallback: PlanTier::BASELINE,
                });
                PlanTier::BASELINE
            }
        }
    }

    pub fn is_tier(&self, tier: PlanTier) -> bool {
        self.current_tier() == tier
    }

    /// String form of [`is_tier`](Self::is_tier); unknown names never match.
    pub fn is_tier_named(&self, name: &str) -> bool {
        PlanTier::parse(name).is_some_and(|tier| self.is_tier(tier))
    }

    fn store(&self, tier: PlanTier) {
        match self.tier.write() {
            Ok(mut current) => *current = tier,
            Err(poisoned) => *poisoned.into_inner() = tier,
        }
    }
}

impl std::fmt::Debug for PlanResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanResolver")
            .field("tier", &self.current_tier())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gating::audit::RecordingAuditLogger;
    use crate::tenant::{InMemoryTenantStore, StoreTenantSource, TenantStore};

    fn resolver_for(store: &InMemoryTenantStore, tenant_id: &str) -> (PlanResolver, Arc<RecordingAuditLogger>) {
        let audit = Arc::new(RecordingAuditLogger::new());
        let source = Arc::new(StoreTenantSource::new(Arc::new(store.clone()), tenant_id));
        (PlanResolver::with_audit_logger(source, audit.clone()), audit)
    }

    #[test]
    fn test_baseline_before_initialize() {
        let (resolver, _) = resolver_for(&InMemoryTenantStore::new(), "t_1");
        assert_eq!(resolver.current_tier(), PlanTier::Plus);
        assert!(resolver.is_tier(PlanTier::Plus));
    }

    #[test]
    fn test_initialize_reads_plan() {
        let (resolver, audit) = resolver_for(&InMemoryTenantStore::new(), "t_1");
        let tenant = TenantRecord::new("t_1", "Loja").with_plan("Pro");

        assert_eq!(resolver.initialize(Some(&tenant)), PlanTier::Pro);
        assert!(resolver.is_tier_named("pro"));
        assert!(!resolver.is_tier_named("gold"));
        assert_eq!(
            audit.events(),
            vec![GateAuditEvent::TierResolved {
                tier: PlanTier::Pro,
                raw_plan: Some("Pro".to_string()),
            }]
        );
    }

    #[test]
    fn test_initialize_defaults() {
        let (resolver, _) = resolver_for(&InMemoryTenantStore::new(), "t_1");

        resolver.initialize(Some(&TenantRecord::new("t_1", "Loja").with_plan("pro")));
        assert_eq!(resolver.initialize(Some(&TenantRecord::new("t_1", "Loja").with_plan("gold"))), PlanTier::Plus);

        resolver.initialize(Some(&TenantRecord::new("t_1", "Loja").with_plan("pro")));
        assert_eq!(resolver.initialize(Some(&TenantRecord::new("t_1", "Loja"))), PlanTier::Plus);

        resolver.initialize(Some(&TenantRecord::new("t_1", "Loja").with_plan("pro")));
        assert_eq!(resolver.initialize(None), PlanTier::Plus);
    }

    #[test]
    fn test_resolve_tier() {
        assert_eq!(resolve_tier(Some(&TenantRecord::new("t_1", "Loja").with_plan(" PRO "))), PlanTier::Pro);
        assert_eq!(resolve_tier(Some(&TenantRecord::new("t_1", "Loja").with_plan(""))), PlanTier::Plus);
        assert_eq!(resolve_tier(None), PlanTier::Plus);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_plan_change() {
        let store = InMemoryTenantStore::with_tenants([TenantRecord::new("t_1", "Loja").with_plan("plus")]);
        let (resolver, _) = resolver_for(&store, "t_1");
        assert_eq!(resolver.refresh().await, PlanTier::Plus);

        store.save_tenant(&TenantRecord::new("t_1", "Loja").with_plan("pro")).await.unwrap();
        assert_eq!(resolver.refresh().await, PlanTier::Pro);
        assert_eq!(resolver.current_tier(), PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_refresh_failure_falls_back_to_baseline() {
        let store = InMemoryTenantStore::with_tenants([TenantRecord::new("t_1", "Loja").with_plan("pro")]);
        let (resolver, audit) = resolver_for(&store, "t_1");
        assert_eq!(resolver.refresh().await, PlanTier::Pro);

        store.set_unavailable(true);
        assert_eq!(resolver.refresh().await, PlanTier::Plus);
        assert_eq!(resolver.current_tier(), PlanTier::Plus);

        let failures: Vec<_> = audit
            .events()
            .into_iter()
            .filter(|e| matches!(e, GateAuditEvent::ResolutionFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_missing_tenant_is_baseline() {
        let (resolver, _) = resolver_for(&InMemoryTenantStore::new(), "t_missing");
        assert_eq!(resolver.refresh().await, PlanTier::Plus);
    }
}
