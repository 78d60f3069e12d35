//! Storage traits for tenant data.
//!
//! Implement these traits over the hosted backend's client.

use std::sync::Arc;

use async_trait::async_trait;

use super::TenantRecord;
use crate::error::Result;

/// Fetches the tenant signed in to the current session.
#[async_trait]
pub trait TenantSource: Send + Sync {
    /// `Ok(None)` when the session has no tenant yet (e.g. mid-onboarding).
    async fn current_tenant(&self) -> Result<Option<TenantRecord>>;
}

/// Looks tenants up by id.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>>;

    /// Insert or replace a tenant record.
    async fn save_tenant(&self, tenant: &TenantRecord) -> Result<()>;
}

/// A [`TenantSource`] reading one tenant id from a [`TenantStore`].
pub struct StoreTenantSource<S: TenantStore> {
    store: Arc<S>,
    tenant_id: String,
}

impl<S: TenantStore> StoreTenantSource<S> {
    #[must_use]
    pub fn new(store: Arc<S>, tenant_id: impl Into<String>) -> Self {
        Self {
            store,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

#[async_trait]
impl<S: TenantStore> TenantSource for StoreTenantSource<S> {
    async fn current_tenant(&self) -> Result<Option<TenantRecord>> {
        self.store.get_tenant(&self.tenant_id).await
    }
}
