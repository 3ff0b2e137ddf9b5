//! Threat Check Providers
//!
//! Checks được environment cung cấp (jailbreak, debugger, tamper...).
//! Engine chỉ gọi - không tự detect.

use async_trait::async_trait;

use super::types::{SecurityThreat, ThreatDetectionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    /// Jailbreak / root environment
    Environment,
    Debugging,
    Tamper,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Environment => "environment",
            CheckKind::Debugging => "debugging",
            CheckKind::Tamper => "tamper",
        }
    }

    /// Whether the policy enables checks of this kind
    pub fn is_enabled(&self, config: &ThreatDetectionConfig) -> bool {
        match self {
            CheckKind::Environment => config.jailbreak_detection,
            CheckKind::Debugging => config.debug_detection,
            CheckKind::Tamper => config.tamper_detection,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("check '{check}' failed: {message}")]
pub struct CheckError {
    pub check: String,
    pub message: String,
}

impl CheckError {
    pub fn new(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ThreatCheck: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> CheckKind;
    async fn check(&self) -> Result<Option<SecurityThreat>, CheckError>;
}
