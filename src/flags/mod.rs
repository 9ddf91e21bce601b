//! Tiered feature flags
//!
//! Three layers, later ones winning:
//! 1. compiled-in defaults (always present)
//! 2. environment overlay, chosen once at startup
//! 3. runtime overrides set through the admin endpoint, lost on restart
//!
//! Layers 1 and 2 are merged once at construction. Overrides live in their own
//! map and are consulted first on every read, so a read never re-merges.

pub mod defaults;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use defaults::{default_flags, environment_overlay, DEFAULT_ENVIRONMENT};

/// A flag value: a plain switch or a structured configuration blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Structured(serde_json::Value),
}

impl FlagValue {
    /// Whether the flag counts as enabled
    ///
    /// Structured values follow JSON truthiness: `null`, `false`, `0` and `""`
    /// are off; objects and arrays are on.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(enabled) => *enabled,
            FlagValue::Structured(value) => match value {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
            },
        }
    }
}

impl From<bool> for FlagValue {
    fn from(enabled: bool) -> Self {
        FlagValue::Bool(enabled)
    }
}

impl From<serde_json::Value> for FlagValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => FlagValue::Bool(b),
            other => FlagValue::Structured(other),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(enabled) => write!(f, "{}", enabled),
            FlagValue::Structured(value) => write!(f, "{}", value),
        }
    }
}

/// Flag name to value
pub type FeatureFlagSet = BTreeMap<String, FlagValue>;

/// Merge an environment overlay onto the defaults
///
/// Overlay keys override or extend; every default key survives.
pub fn compose_flags(defaults: &FeatureFlagSet, overlay: Option<&FeatureFlagSet>) -> FeatureFlagSet {
    let mut composed = defaults.clone();
    if let Some(overlay) = overlay {
        composed.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    composed
}

/// Rejected runtime flag update
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagUpdateError {
    #[error("Missing required fields")]
    MissingFields,
}

/// Body of a runtime flag update
///
/// An absent `value` is `None`; an explicit `null` is kept as a structured
/// null so it can be stored as a (disabled) override.
#[derive(Debug, Default, Deserialize)]
pub struct FlagUpdate {
    #[serde(default)]
    pub flag: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present_value")]
    pub value: Option<FlagValue>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<FlagValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    FlagValue::deserialize(deserializer).map(Some)
}

impl FlagUpdate {
    /// `flag` must be truthy and `value` present (`null` counts as present)
    ///
    /// Non-string flag names are keyed by their JSON text, e.g. `42`.
    pub fn validate(self) -> Result<(String, FlagValue), FlagUpdateError> {
        let flag = self
            .flag
            .filter(|name| FlagValue::Structured(name.clone()).is_truthy())
            .map(|name| match name {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });

        match (flag, self.value) {
            (Some(flag), Some(value)) => Ok((flag, value)),
            _ => Err(FlagUpdateError::MissingFields),
        }
    }
}

/// Process-wide flag registry
pub struct FeatureFlagManager {
    environment: String,
    base: FeatureFlagSet,
    overrides: RwLock<FeatureFlagSet>,
}

impl FeatureFlagManager {
    /// Compose the built-in defaults with the overlay for `environment`
    pub fn new(environment: impl Into<String>) -> Self {
        let environment = environment.into();
        let overlay = environment_overlay(&environment);
        Self::with_layers(environment, &default_flags(), overlay.as_ref())
    }

    /// Compose explicit layers
    pub fn with_layers(
        environment: impl Into<String>,
        defaults: &FeatureFlagSet,
        overlay: Option<&FeatureFlagSet>,
    ) -> Self {
        let manager = Self {
            environment: environment.into(),
            base: compose_flags(defaults, overlay),
            overrides: RwLock::new(FeatureFlagSet::new()),
        };

        info!(
            environment = %manager.environment,
            overlay = overlay.is_some(),
            "Feature flags initialized"
        );
        info!(enabled = %manager.enabled_features().join(", "), "Enabled features");
        manager
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// False for unknown flags
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get_flag(name).is_some_and(|v| v.is_truthy())
    }

    /// Raw value, override layer first
    pub fn get_flag(&self, name: &str) -> Option<FlagValue> {
        if let Some(value) = self.overrides.read().get(name) {
            return Some(value.clone());
        }
        self.base.get(name).cloned()
    }

    /// Owned snapshot of every flag
    pub fn get_all_flags(&self) -> FeatureFlagSet {
        let mut flags = self.base.clone();
        flags.extend(
            self.overrides
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        flags
    }

    /// Apply a runtime override, visible to every subsequent read
    pub fn set_flag(&self, name: impl Into<String>, value: impl Into<FlagValue>) {
        let name = name.into();
        let value = value.into();
        info!(flag = %name, value = %value, "Feature flag updated");
        self.overrides.write().insert(name, value);
    }

    /// Names of flags that are strictly `true`
    pub fn enabled_features(&self) -> Vec<String> {
        self.get_all_flags()
            .into_iter()
            .filter(|(_, value)| matches!(value, FlagValue::Bool(true)))
            .map(|(name, _)| name)
            .collect()
    }
}

/// Read-only view of the flag registry attached to requests
///
/// Handlers get conditional behavior without being able to mutate flags.
#[derive(Clone)]
pub struct FlagsHandle {
    manager: Arc<FeatureFlagManager>,
}

impl FlagsHandle {
    pub fn new(manager: Arc<FeatureFlagManager>) -> Self {
        Self { manager }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.manager.is_enabled(name)
    }

    pub fn get_flag(&self, name: &str) -> Option<FlagValue> {
        self.manager.get_flag(name)
    }

    pub fn get_all_flags(&self) -> FeatureFlagSet {
        self.manager.get_all_flags()
    }
}

#[cfg(test)]
#[path = "flags_test.rs"]
mod tests;
