//! Response Types

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::threat::{SecurityThreat, Severity, ThreatType};

// ============================================================================
// RESPONSE ACTION TYPES
// ============================================================================

/// What a rule does when it fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Surface to the user
    Notify,
    /// Record only
    Log,
    /// Restrict sensitive operations
    Block,
    /// Restrict + hide the app behind the stealth disguise
    Lockdown,
    /// Embedder-defined handler, identified by name
    Custom { handler: String },
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Notify => "notify",
            ResponseKind::Log => "log",
            ResponseKind::Block => "block",
            ResponseKind::Lockdown => "lockdown",
            ResponseKind::Custom { .. } => "custom",
        }
    }
}

/// Policy rule: threat type/severity -> automated reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatResponseAction {
    pub id: String,
    pub name: String,
    pub threat_types: HashSet<ThreatType>,
    pub min_severity: Severity,
    pub action: ResponseKind,
    pub enabled: bool,
}

impl ThreatResponseAction {
    /// Type in `threat_types` and severity >= `min_severity`
    pub fn matches(&self, threat: &SecurityThreat) -> bool {
        self.threat_types.contains(&threat.threat_type) && threat.severity >= self.min_severity
    }
}

// ============================================================================
// RESPONSE RECORD
// ============================================================================

/// One fired response action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub action_id: String,
    pub action: ResponseKind,
    /// Threats that matched the rule
    pub threat_ids: Vec<Uuid>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
