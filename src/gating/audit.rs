//! Audit logging for gating decisions.
//!
//! Provides a trait-based audit logging system for plan resolution and
//! lock changes, useful for debugging why a tenant saw a paywall.

use std::fmt;

use super::tier::PlanTier;

/// Audit event types for gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAuditEvent {
    /// The resolver settled on a tier.
    TierResolved {
        tier: PlanTier,
        /// Raw plan value read from the tenant record.
        raw_plan: Option<String>,
    },
    /// Fetching the tenant failed; the resolver fell back to the baseline tier.
    ResolutionFailed { error: String, fallback: PlanTier },
    /// An element was locked.
    FeatureLocked { feature: String, required: Option<PlanTier> },
    /// A previously locked element was unlocked.
    FeatureUnlocked { feature: String },
    /// The upgrade prompt was shown.
    UpgradePromptShown { feature: String },
}

impl fmt::Display for GateAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TierResolved { tier, raw_plan } => {
                write!(f, "Tier resolved: tier={}, raw={}", tier, raw_plan.as_deref().unwrap_or("-"))
            }
            Self::ResolutionFailed { error, fallback } => {
                write!(f, "Tier resolution failed: fallback={}, error={}", fallback, error)
            }
            Self::FeatureLocked { feature, required } => match required {
                Some(required) => write!(f, "Feature locked: feature={}, required={}", feature, required),
                None => write!(f, "Feature locked: feature={}", feature),
            },
            Self::FeatureUnlocked { feature } => write!(f, "Feature unlocked: feature={}", feature),
            Self::UpgradePromptShown { feature } => write!(f, "Upgrade prompt shown: feature={}", feature),
        }
    }
}

/// Trait for audit logging backends.
///
/// Called synchronously from render paths, so implementations must not block.
pub trait GateAuditLogger: Send + Sync {
    fn log(&self, event: GateAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl GateAuditLogger for NoOpAuditLogger {
    fn log(&self, _event: GateAuditEvent) {}
}

/// Tracing-based audit logger.
///
/// Resolution failures are logged at WARN, everything else at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl GateAuditLogger for TracingAuditLogger {
    fn log(&self, event: GateAuditEvent) {
        match &event {
            GateAuditEvent::ResolutionFailed { .. } => tracing::warn!(
                target: "vitrine::audit",
                event_type = %event_kind(&event),
                "{}", event
            ),
            _ => tracing::debug!(
                target: "vitrine::audit",
                event_type = %event_kind(&event),
                "{}", event
            ),
        }
    }
}

/// Get the event kind as a string for structured logging.
pub(crate) fn event_kind(event: &GateAuditEvent) -> &'static str {
    match event {
        GateAuditEvent::TierResolved { .. } => "tier_resolved",
        GateAuditEvent::ResolutionFailed { .. } => "resolution_failed",
        GateAuditEvent::FeatureLocked { .. } => "feature_locked",
        GateAuditEvent::FeatureUnlocked { .. } => "feature_unlocked",
        GateAuditEvent::UpgradePromptShown { .. } => "upgrade_prompt_shown",
    }
}

/// Audit logger that captures events in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditLogger {
    events: std::sync::Mutex<Vec<GateAuditEvent>>,
}

impl RecordingAuditLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event logged so far.
    pub fn events(&self) -> Vec<GateAuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl GateAuditLogger for RecordingAuditLogger {
    fn log(&self, event: GateAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
