//! Threat Rules & Thresholds
//!
//! Định nghĩa các threshold cho risk scoring và auto-response.
//! KHÔNG chứa engine logic - chỉ constants và presets.

use super::types::{SensitivityLevel, Severity};

// ============================================================================
// RISK THRESHOLDS
// ============================================================================

/// More than this many High threats in the risk window = High risk
pub const HIGH_RISK_HIGH_COUNT: usize = 2;

/// More than this many threats in the risk window = Medium risk
pub const MEDIUM_RISK_TOTAL_COUNT: usize = 3;

// ============================================================================
// SENSITIVITY PRESETS
// ============================================================================

pub const LOW_SENSITIVITY_THRESHOLD: usize = 5;
pub const MEDIUM_SENSITIVITY_THRESHOLD: usize = 3;
pub const HIGH_SENSITIVITY_THRESHOLD: usize = 1;

/// alertThreshold derived from the sensitivity level.
/// Higher sensitivity = fewer threats needed before responding.
pub fn alert_threshold_for(level: SensitivityLevel) -> usize {
    match level {
        SensitivityLevel::Low => LOW_SENSITIVITY_THRESHOLD,
        SensitivityLevel::Medium => MEDIUM_SENSITIVITY_THRESHOLD,
        SensitivityLevel::High => HIGH_SENSITIVITY_THRESHOLD,
    }
}

// ============================================================================
// SYNTHESIZED THREATS
// ============================================================================

/// Severity of the threat synthesized for a usage burst
pub const USAGE_BURST_SEVERITY: Severity = Severity::Medium;
