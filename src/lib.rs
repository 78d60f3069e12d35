//! Vitrine - plan entitlement gating for a multi-tenant catalog SaaS
//!
//! Stores on the platform are on a plan tier (`plus` or `pro`). Vitrine
//! decides which features a tier unlocks, locks the matching elements of a
//! rendered view, and opens an upgrade prompt when a locked element is
//! clicked.
//!
//! # Features
//!
//! - **Gating**: entitlement map, plan resolver, feature query, UI locker
//!   and upgrade prompt, wired per session by [`gating::GateContext`]
//! - **View**: an in-memory element tree with click dispatch
//! - **Tenants**: async tenant source/store traits and an in-memory store
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitrine::gating::GateContext;
//! use vitrine::tenant::{InMemoryTenantStore, StoreTenantSource, TenantSource};
//! use vitrine::ConfigBuilder;
//!
//! #[tokio::main]
//! async fn main() -> vitrine::Result<()> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     vitrine::init_tracing_with_config(&config);
//!
//!     let store = Arc::new(InMemoryTenantStore::new());
//!     let source = Arc::new(StoreTenantSource::new(store, "t_1"));
//!     let tenant = source.current_tenant().await?;
//!
//!     let gate = GateContext::builder()
//!         .config(config.gating)
//!         .tenant_source(source)
//!         .build()?;
//!     gate.bootstrap(tenant.as_ref());
//!     gate.render(gate.document().root());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
pub mod gating;
pub mod tenant;
mod utils;
pub mod view;

// Re-exports for public API
pub use config::{Config, ConfigBuilder, GatingConfig, LoggingConfig};
pub use error::{Result, VitrineError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "vitrine::gating=debug")
/// - `VITRINE_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// vitrine::init_tracing();
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
