//! Response & Automation Module - Automated Threat Response
//!
//! Mục đích: Tự động phản ứng với threats khi vượt `alertThreshold`.
//!
//! # Components
//! - `types.rs`: ThreatResponseAction, ResponseKind, ResponseRecord
//! - `actions.rs`: Rule selection and execution
//!
//! Two built-in rules are protected and cannot be removed (only disabled).

pub mod actions;
pub mod types;

use std::collections::HashSet;

use crate::logic::threat::{Severity, ThreatType};

// Re-exports from types
pub use types::{ResponseKind, ResponseRecord, ThreatResponseAction};

// Re-exports from submodules
pub use actions::{execute_action, select_actions};

// ============================================================================
// BUILT-IN RULES
// ============================================================================

pub const NOTIFY_HIGH_SEVERITY_ID: &str = "default_notify_high_severity";
pub const LOCKDOWN_CRITICAL_ID: &str = "default_lockdown_critical";

pub const PROTECTED_ACTION_IDS: [&str; 2] = [NOTIFY_HIGH_SEVERITY_ID, LOCKDOWN_CRITICAL_ID];

pub fn is_protected(id: &str) -> bool {
    PROTECTED_ACTION_IDS.contains(&id)
}

/// Rules every fresh config starts with
pub fn default_actions() -> Vec<ThreatResponseAction> {
    vec![
        ThreatResponseAction {
            id: NOTIFY_HIGH_SEVERITY_ID.to_string(),
            name: "Notify on high severity threats".to_string(),
            threat_types: ThreatType::ALL.iter().copied().collect::<HashSet<_>>(),
            min_severity: Severity::High,
            action: ResponseKind::Notify,
            enabled: true,
        },
        ThreatResponseAction {
            id: LOCKDOWN_CRITICAL_ID.to_string(),
            name: "Lockdown on critical compromise".to_string(),
            threat_types: [ThreatType::Jailbreak, ThreatType::Tamper, ThreatType::Debugging]
                .into_iter()
                .collect(),
            min_severity: Severity::Critical,
            action: ResponseKind::Lockdown,
            enabled: true,
        },
    ]
}
