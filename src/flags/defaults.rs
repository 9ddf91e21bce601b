//! Compiled-in flag tables
//!
//! Defaults are always present in the composed set. Overlays may flip values
//! or add keys for their environment, never remove defaults.

use crate::flags::{FeatureFlagSet, FlagValue};

/// Environment used when none is configured
pub const DEFAULT_ENVIRONMENT: &str = "development";

const DEFAULT_FLAGS: &[(&str, bool)] = &[
    // Core platform
    ("medhelm_evaluation", true),
    ("cs_agent_optimization", true),
    ("voice_controlled_development", true),
    // Advanced
    ("advanced_ai_processing", false),
    ("real_time_collaboration", true),
    ("advanced_analytics", true),
    // Security
    ("enhanced_hipaa_compliance", true),
    ("advanced_audit_logging", true),
    ("multi_factor_auth", false),
    // Performance
    ("caching_optimization", true),
    ("lazy_loading", true),
    ("performance_monitoring", true),
    // Experimental
    ("ai_code_generation", false),
    ("automated_testing", true),
    ("deployment_automation", true),
    // Medical
    ("clinical_decision_support", true),
    ("medical_imaging_analysis", false),
    ("genomics_integration", false),
    // Business
    ("innovation_portfolio_tracking", true),
    ("revenue_analytics", true),
    ("competitive_analysis", true),
];

const DEVELOPMENT_OVERLAY: &[(&str, bool)] = &[
    ("advanced_ai_processing", true),
    ("ai_code_generation", true),
    ("medical_imaging_analysis", true),
    ("genomics_integration", true),
    ("multi_factor_auth", true),
];

const PRODUCTION_OVERLAY: &[(&str, bool)] = &[
    ("advanced_ai_processing", false),
    ("ai_code_generation", false),
    ("medical_imaging_analysis", false),
    ("genomics_integration", false),
];

// Everything on for comprehensive test runs
const TESTING_OVERLAY: &[(&str, bool)] = &[
    ("advanced_ai_processing", true),
    ("ai_code_generation", true),
    ("medical_imaging_analysis", true),
    ("genomics_integration", true),
    ("multi_factor_auth", true),
    ("automated_testing", true),
];

fn to_set(table: &[(&str, bool)]) -> FeatureFlagSet {
    table
        .iter()
        .map(|(name, enabled)| (name.to_string(), FlagValue::Bool(*enabled)))
        .collect()
}

/// Layer 1: flags every environment starts from
pub fn default_flags() -> FeatureFlagSet {
    to_set(DEFAULT_FLAGS)
}

/// Layer 2: overlay for a named environment, if one exists
pub fn environment_overlay(environment: &str) -> Option<FeatureFlagSet> {
    match environment {
        "development" => Some(to_set(DEVELOPMENT_OVERLAY)),
        "production" => Some(to_set(PRODUCTION_OVERLAY)),
        "testing" => Some(to_set(TESTING_OVERLAY)),
        _ => None,
    }
}
