//! Tenant records and the stores they are fetched from.
//!
//! The hosted backend owns tenant data. This module only describes the
//! shape Vitrine reads and the traits used to fetch it:
//!
//! - [`TenantSource`] answers "who is the signed-in tenant" for one session.
//! - [`TenantStore`] looks tenants up by id, for server-side callers.
//! - [`StoreTenantSource`] bridges a store and a session's tenant id.

mod memory;
mod storage;

pub use memory::InMemoryTenantStore;
pub use storage::{StoreTenantSource, TenantSource, TenantStore};

use serde::{Deserialize, Serialize};

/// A business account as stored in the tenant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// Raw plan value; parsed leniently by the plan resolver.
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
}

impl TenantRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: None,
            plan: None,
            whatsapp: None,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    #[must_use]
    pub fn with_whatsapp(mut self, number: impl Into<String>) -> Self {
        self.whatsapp = Some(number.into());
        self
    }
}
