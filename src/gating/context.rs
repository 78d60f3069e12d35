//! Per-session wiring of the gating components.

use std::sync::Arc;

use super::audit::{GateAuditLogger, TracingAuditLogger};
use super::entitlements::EntitlementMap;
use super::locker::{LockReport, UiLocker};
use super::prompt::UpgradePrompt;
use super::query::FeatureQuery;
use super::resolver::PlanResolver;
use super::signal::SignalBus;
use super::tier::PlanTier;
use crate::config::GatingConfig;
use crate::error::{Result, VitrineError};
use crate::tenant::{TenantRecord, TenantSource};
use crate::view::{Document, NodeId};

/// Owns one resolver, query, signal bus, locker and upgrade prompt for a session.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use vitrine::gating::GateContext;
/// use vitrine::tenant::{InMemoryTenantStore, StoreTenantSource, TenantRecord};
///
/// let store = Arc::new(InMemoryTenantStore::new());
/// let gate = GateContext::builder()
///     .tenant_source(Arc::new(StoreTenantSource::new(store, "t_1")))
///     .build()
///     .unwrap();
///
/// gate.bootstrap(Some(&TenantRecord::new("t_1", "Padaria").with_plan("plus")));
///
/// let doc = gate.document();
/// let link = doc.create_element("a");
/// doc.set_attribute(link, "data-feature", "order-tracking").unwrap();
/// doc.append_child(doc.root(), link).unwrap();
///
/// gate.render(doc.root());
/// assert!(gate.locker().is_locked(link));
/// ```
pub struct GateContext {
    config: GatingConfig,
    document: Document,
    entitlements: Arc<EntitlementMap>,
    resolver: Arc<PlanResolver>,
    query: FeatureQuery,
    signals: SignalBus,
    locker: UiLocker,
    prompt: UpgradePrompt,
}

impl GateContext {
    pub fn builder() -> GateContextBuilder {
        GateContextBuilder::new()
    }

    /// Seed the plan tier from the session's tenant record.
    pub fn bootstrap(&self, tenant: Option<&TenantRecord>) -> PlanTier {
        self.resolver.initialize(tenant)
    }

    /// Reconcile feature locks under `root` after it was (re)rendered.
    pub fn render(&self, root: NodeId) -> LockReport {
        self.locker.apply_locks(root)
    }

    /// Re-fetch the tenant's plan and re-apply locks over the whole document.
    pub async fn refresh(&self) -> PlanTier {
        let tier = self.resolver.refresh().await;
        self.locker.apply_locks(self.document.root());
        tier
    }

    pub fn config(&self) -> &GatingConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn entitlements(&self) -> &Arc<EntitlementMap> {
        &self.entitlements
    }

    pub fn resolver(&self) -> &Arc<PlanResolver> {
        &self.resolver
    }

    pub fn query(&self) -> &FeatureQuery {
        &self.query
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn locker(&self) -> &UiLocker {
        &self.locker
    }

    pub fn prompt(&self) -> &UpgradePrompt {
        &self.prompt
    }
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("resolver", &self.resolver)
            .field("locker", &self.locker)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GateContext`].
#[derive(Default)]
#[must_use = "builder does nothing until you call build()"]
pub struct GateContextBuilder {
    entitlements: Option<EntitlementMap>,
    tenant_source: Option<Arc<dyn TenantSource>>,
    audit_logger: Option<Arc<dyn GateAuditLogger>>,
    config: Option<GatingConfig>,
    document: Option<Document>,
}

impl GateContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entitlement map to gate with. Defaults to the map in the gating config.
    pub fn entitlements(mut self, map: EntitlementMap) -> Self {
        self.entitlements = Some(map);
        self
    }

    pub fn tenant_source(mut self, source: Arc<dyn TenantSource>) -> Self {
        self.tenant_source = Some(source);
        self
    }

    pub fn audit_logger(mut self, logger: Arc<dyn GateAuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    pub fn config(mut self, config: GatingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Document to lock. Defaults to a fresh empty document.
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// # Errors
    ///
    /// Returns an error if no tenant source was provided.
    pub fn build(self) -> Result<GateContext> {
        let source = self
            .tenant_source
            .ok_or_else(|| VitrineError::internal("Tenant source not configured"))?;
        let config = self.config.unwrap_or_default();
        let audit = self
            .audit_logger
            .unwrap_or_else(|| Arc::new(TracingAuditLogger) as Arc<dyn GateAuditLogger>);
        let document = self.document.unwrap_or_default();
        let entitlements = Arc::new(self.entitlements.unwrap_or_else(|| config.entitlement_map()));

        let resolver = Arc::new(PlanResolver::with_audit_logger(source, Arc::clone(&audit)));
        let query = FeatureQuery::new(Arc::clone(&entitlements), Arc::clone(&resolver));
        let signals = SignalBus::new();
        let locker = UiLocker::new(
            document.clone(),
            query.clone(),
            signals.clone(),
            Arc::clone(&audit),
            config.clone(),
        );
        let prompt = UpgradePrompt::new(
            document.clone(),
            Arc::clone(&entitlements),
            signals.clone(),
            config.upgrade_url.clone(),
            audit,
        );

        tracing::debug!(
            target: "vitrine::gating",
            features = entitlements.len(),
            "gate context ready"
        );

        Ok(GateContext {
            config,
            document,
            entitlements,
            resolver,
            query,
            signals,
            locker,
            prompt,
        })
    }
}
