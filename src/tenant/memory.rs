//! In-memory tenant store for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::TenantRecord;
use super::storage::TenantStore;
use crate::error::{Result, VitrineError};

/// In-memory tenant store.
///
/// Wraps data in Arc for cheap cloning. Can be switched into a failing
/// mode to exercise fallback paths.
#[derive(Default, Clone)]
pub struct InMemoryTenantStore {
    inner: Arc<InMemoryTenantStoreInner>,
}

#[derive(Default)]
struct InMemoryTenantStoreInner {
    tenants: RwLock<HashMap<String, TenantRecord>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryTenantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given tenants.
    #[must_use]
    pub fn with_tenants(tenants: impl IntoIterator<Item = TenantRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.inner.tenants.write() {
            for tenant in tenants {
                map.insert(tenant.id.clone(), tenant);
            }
        }
        store
    }

    /// Make every subsequent call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_tenant` calls served or failed so far.
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(VitrineError::service_unavailable("tenant store is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let tenants = self
            .inner
            .tenants
            .read()
            .map_err(|_| VitrineError::internal("tenant store lock poisoned"))?;
        Ok(tenants.get(tenant_id).cloned())
    }

    async fn save_tenant(&self, tenant: &TenantRecord) -> Result<()> {
        self.check_available()?;
        let mut tenants = self
            .inner
            .tenants
            .write()
            .map_err(|_| VitrineError::internal("tenant store lock poisoned"))?;
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }
}
