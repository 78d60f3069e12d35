use serde::{Deserialize, Serialize};

use crate::error::{Result, VitrineError};
use crate::gating::EntitlementMap;
use crate::utils::get_env_with_prefix;

/// Main configuration for Vitrine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub gating: GatingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// Markup contract and copy used by the feature locker and upgrade prompt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatingConfig {
    /// Attribute naming the feature an element depends on.
    #[serde(default = "default_feature_attribute")]
    pub feature_attribute: String,
    /// Attribute recording the feature an element is locked for.
    #[serde(default = "default_locked_attribute")]
    pub locked_attribute: String,
    #[serde(default = "default_locked_class")]
    pub locked_class: String,
    #[serde(default = "default_badge_class")]
    pub badge_class: String,
    /// Target of the upgrade prompt's call to action.
    #[serde(default = "default_upgrade_url")]
    pub upgrade_url: String,
    /// Deployment override of the entitlement map, `{ "feature": ["pro"] }`.
    #[serde(default)]
    pub entitlements: Option<serde_json::Value>,
}

impl GatingConfig {
    /// The configured entitlement map, or the standard one.
    pub fn entitlement_map(&self) -> EntitlementMap {
        match &self.entitlements {
            Some(json) => EntitlementMap::from_json(json),
            None => EntitlementMap::standard(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            feature_attribute: default_feature_attribute(),
            locked_attribute: default_locked_attribute(),
            locked_class: default_locked_class(),
            badge_class: default_badge_class(),
            upgrade_url: default_upgrade_url(),
            entitlements: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feature_attribute() -> String {
    "data-feature".to_string()
}

fn default_locked_attribute() -> String {
    "data-locked-feature".to_string()
}

fn default_locked_class() -> String {
    "feature-locked".to_string()
}

fn default_badge_class() -> String {
    "plan-badge".to_string()
}

fn default_upgrade_url() -> String {
    "/admin/plans".to_string()
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    entitlements_raw: Option<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            entitlements_raw: None,
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_gating(mut self, gating: GatingConfig) -> Self {
        self.config.gating = gating;
        self
    }

    pub fn with_upgrade_url(mut self, url: impl Into<String>) -> Self {
        self.config.gating.upgrade_url = url.into();
        self
    }

    pub fn with_feature_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.gating.feature_attribute = attribute.into();
        self
    }

    pub fn with_locked_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.gating.locked_attribute = attribute.into();
        self
    }

    pub fn with_locked_class(mut self, class: impl Into<String>) -> Self {
        self.config.gating.locked_class = class.into();
        self
    }

    pub fn with_badge_class(mut self, class: impl Into<String>) -> Self {
        self.config.gating.badge_class = class.into();
        self
    }

    /// Override the entitlement map with a JSON object.
    pub fn with_entitlements(mut self, json: serde_json::Value) -> Self {
        self.config.gating.entitlements = Some(json);
        self.entitlements_raw = None;
        self
    }

    /// Load configuration from environment variables with VITRINE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(url) = get_env_with_prefix("UPGRADE_URL") {
            self.config.gating.upgrade_url = url;
        }
        if let Some(attribute) = get_env_with_prefix("FEATURE_ATTRIBUTE") {
            self.config.gating.feature_attribute = attribute;
        }
        if let Some(attribute) = get_env_with_prefix("LOCKED_ATTRIBUTE") {
            self.config.gating.locked_attribute = attribute;
        }
        if let Some(class) = get_env_with_prefix("LOCKED_CLASS") {
            self.config.gating.locked_class = class;
        }
        if let Some(class) = get_env_with_prefix("BADGE_CLASS") {
            self.config.gating.badge_class = class;
        }
        // Parsed in build() so a malformed value is reported instead of ignored.
        if let Some(raw) = get_env_with_prefix("ENTITLEMENTS") {
            self.entitlements_raw = Some(raw);
        }
        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the log level is invalid
    /// - an attribute or class name is empty, or the two attributes collide
    /// - the upgrade URL is empty
    /// - the entitlement override is not a JSON object
    pub fn build(mut self) -> Result<Config> {
        if let Some(raw) = self.entitlements_raw.take() {
            let json: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                VitrineError::bad_request(format!("Invalid VITRINE_ENTITLEMENTS JSON: {}", e))
            })?;
            self.config.gating.entitlements = Some(json);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(VitrineError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let gating = &self.config.gating;
        for (name, value) in [
            ("feature_attribute", &gating.feature_attribute),
            ("locked_attribute", &gating.locked_attribute),
            ("locked_class", &gating.locked_class),
            ("badge_class", &gating.badge_class),
            ("upgrade_url", &gating.upgrade_url),
        ] {
            if value.trim().is_empty() {
                return Err(VitrineError::bad_request(format!("Gating {} must not be empty", name)));
            }
        }

        if gating.feature_attribute == gating.locked_attribute {
            return Err(VitrineError::bad_request(
                "Gating feature_attribute and locked_attribute must differ",
            ));
        }

        if let Some(json) = &gating.entitlements {
            if !json.is_object() {
                return Err(VitrineError::bad_request(
                    "Entitlement override must be a JSON object of feature -> tiers",
                ));
            }
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
