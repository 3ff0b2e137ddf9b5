//! Threat Types
//!
//! Core types cho threat detection.
//! KHÔNG chứa logic - chỉ data structures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::mode::SecurityMode;
use crate::logic::response::ThreatResponseAction;

// ============================================================================
// THREAT TYPE / SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    Jailbreak,
    Debugging,
    Tamper,
    UnusualPattern,
    Custom,
    Unknown,
}

impl ThreatType {
    pub const ALL: [ThreatType; 6] = [
        ThreatType::Jailbreak,
        ThreatType::Debugging,
        ThreatType::Tamper,
        ThreatType::UnusualPattern,
        ThreatType::Custom,
        ThreatType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Jailbreak => "jailbreak",
            ThreatType::Debugging => "debugging",
            ThreatType::Tamper => "tamper",
            ThreatType::UnusualPattern => "unusual_pattern",
            ThreatType::Custom => "custom",
            ThreatType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ThreatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Totally ordered: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// THREAT
// ============================================================================

/// Per-source payload, only the fields that source needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThreatDetails {
    Environment { indicator: String },
    Debugger { indicator: String },
    Tamper { indicator: String },
    #[serde(rename_all = "camelCase")]
    UsageBurst { action: String, count: usize, window_secs: i64 },
    PatternMatch { pattern: String, signal: String },
    External { source: String },
}

/// Immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityThreat {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ThreatDetails>,
}

impl SecurityThreat {
    pub fn new(
        threat_type: ThreatType,
        severity: Severity,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            threat_type,
            severity,
            description: description.into(),
            timestamp,
            pattern_id: None,
            details: None,
        }
    }

    pub fn with_details(mut self, details: ThreatDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_pattern(mut self, pattern_id: impl Into<String>) -> Self {
        self.pattern_id = Some(pattern_id.into());
        self
    }
}

// ============================================================================
// USAGE PATTERN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePattern {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================================================
// RISK / SENSITIVITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SensitivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

// ============================================================================
// CUSTOM PATTERN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomThreatPattern {
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub is_regex: bool,
    pub severity: Severity,
    pub enabled: bool,
}

// ============================================================================
// CONFIG
// ============================================================================

/// Threat detection policy (persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreatDetectionConfig {
    pub is_enabled: bool,
    pub jailbreak_detection: bool,
    pub debug_detection: bool,
    pub tamper_detection: bool,
    pub usage_pattern_detection: bool,
    pub auto_response_enabled: bool,
    /// Recent threats needed before response actions fire (>= 1)
    pub alert_threshold: usize,
    pub scan_interval_secs: u64,
    pub sensitivity_level: SensitivityLevel,
    pub custom_patterns: HashMap<String, CustomThreatPattern>,
    pub response_actions: Vec<ThreatResponseAction>,
}

impl Default for ThreatDetectionConfig {
    fn default() -> Self {
        let sensitivity = SensitivityLevel::default();
        Self {
            is_enabled: true,
            jailbreak_detection: true,
            debug_detection: true,
            tamper_detection: true,
            usage_pattern_detection: true,
            auto_response_enabled: true,
            alert_threshold: super::rules::alert_threshold_for(sensitivity),
            scan_interval_secs: crate::constants::get_scan_interval(),
            sensitivity_level: sensitivity,
            custom_patterns: HashMap::new(),
            response_actions: crate::logic::response::default_actions(),
        }
    }
}

// ============================================================================
// STATUS SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub monitoring: bool,
    pub risk_level: RiskLevel,
    pub total_threats: usize,
    pub recent_threats: usize,
    pub last_scan: Option<DateTime<Utc>>,
    pub last_threat: Option<SecurityThreat>,
    pub mode: SecurityMode,
    pub restricted: bool,
}
