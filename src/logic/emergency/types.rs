//! Emergency Types
//!
//! Data structures only. Contacts and config are persisted; the gesture state is not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_EMERGENCY_MESSAGE;
use crate::logic::mode::SecurityMode;

// ============================================================================
// CONTACTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub relationship: String,
    pub is_primary: bool,
}

impl EmergencyContact {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone_number: phone_number.into(),
            relationship: String::new(),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = relationship.into();
        self
    }
}

// ============================================================================
// CONFIG
// ============================================================================

/// Emergency policy (persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyConfig {
    pub is_enabled: bool,
    pub panic_gesture_enabled: bool,
    pub auto_call_enabled: bool,
    pub auto_text_enabled: bool,
    pub location_sharing_enabled: bool,
    pub emergency_message: String,
    pub quick_reset_enabled: bool,
    pub last_emergency_time: Option<DateTime<Utc>>,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            is_enabled: true,
            panic_gesture_enabled: true,
            auto_call_enabled: true,
            auto_text_enabled: true,
            location_sharing_enabled: true,
            emergency_message: DEFAULT_EMERGENCY_MESSAGE.to_string(),
            quick_reset_enabled: false,
            last_emergency_time: None,
        }
    }
}

// ============================================================================
// TRIGGER / BROADCAST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencySource {
    Manual,
    PanicGesture,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyChannel {
    PrimaryCall,
    TextBroadcast,
    LocationShare,
}

impl EmergencyChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyChannel::PrimaryCall => "call",
            EmergencyChannel::TextBroadcast => "text",
            EmergencyChannel::LocationShare => "location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ChannelStatus {
    Delivered,
    Failed { reason: String },
}

/// Result of one channel towards one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOutcome {
    pub channel: EmergencyChannel,
    /// Phone number for call/text, none for location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: ChannelStatus,
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        self.status == ChannelStatus::Delivered
    }
}

/// Emergency event log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: EmergencySource,
    /// Decided before the fan-out starts
    pub channels_attempted: Vec<EmergencyChannel>,
    /// Filled in once every channel has settled
    #[serde(default)]
    pub outcomes: Vec<ChannelOutcome>,
    #[serde(default)]
    pub quick_reset: bool,
}

impl EmergencyEvent {
    pub fn attempted(&self, channel: EmergencyChannel) -> bool {
        self.channels_attempted.contains(&channel)
    }

    pub fn delivered(&self, channel: EmergencyChannel) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.channel == channel && o.is_delivered())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmergencyError {
    #[error("emergency protocols are disabled")]
    Disabled,

    #[error("an emergency is already active")]
    AlreadyActive,
}

/// What a single tap did
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    /// Gesture disabled by policy
    Ignored,
    /// Taps currently inside the window
    Pending(usize),
    Triggered(Result<EmergencyEvent, EmergencyError>),
}

// ============================================================================
// STATUS SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionStatus {
    pub enabled: bool,
    pub emergency_active: bool,
    pub panic_gesture_enabled: bool,
    pub contact_count: usize,
    pub has_primary_contact: bool,
    pub last_emergency_time: Option<DateTime<Utc>>,
    pub mode: SecurityMode,
}
