//! Plan tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subscription level of a tenant.
///
/// Tiers are ranked (`Plus` < `Pro`). The rank only drives display and
/// consistency reports; entitlement decisions are set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Plus,
    Pro,
}

impl PlanTier {
    /// Tier used whenever the real one is unknown.
    pub const BASELINE: PlanTier = PlanTier::Plus;

    /// Every tier, lowest rank first.
    pub const ALL: [PlanTier; 2] = [PlanTier::Plus, PlanTier::Pro];

    /// Parse a stored plan value. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plus" => Some(Self::Plus),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Pro => "pro",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Plus => "Plus",
            Self::Pro => "Pro",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::Plus => 0,
            Self::Pro => 1,
        }
    }

    /// Tiers ranked at or above this one.
    pub fn and_above(self) -> impl Iterator<Item = PlanTier> {
        Self::ALL.into_iter().filter(move |t| t.rank() >= self.rank())
    }
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
