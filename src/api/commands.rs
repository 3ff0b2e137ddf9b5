//! Core Commands - API cho UI layer
//!
//! `SecurityCore` giữ một ModeCoordinator, một ThreatEngine và một
//! EmergencyManager. UI chỉ đọc snapshot và gọi command, không đụng engine internals.
//! Rejections come back as `Err(String)` the way the UI renders them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::logic::clock::{Clock, SystemClock};
use crate::logic::emergency::{
    ActionInvoker, EmergencyConfig, EmergencyContact, EmergencyEvent, EmergencyManager,
    EmergencySource, ProtectionStatus, ScreenGuard, TapOutcome,
};
use crate::logic::mode::{ModeCoordinator, ModeSnapshot, SecurityMode};
use crate::logic::response::{ResponseRecord, ThreatResponseAction};
use crate::logic::storage::ConfigStore;
use crate::logic::threat::{
    CustomThreatPattern, SecurityStatus, SecurityThreat, SensitivityLevel, ThreatCheck,
    ThreatDetectionConfig, ThreatEngine, UsagePattern,
};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Combined snapshot cho dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreStatus {
    pub mode: ModeSnapshot,
    pub security: SecurityStatus,
    pub protection: ProtectionStatus,
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct SecurityCoreBuilder {
    store: Arc<dyn ConfigStore>,
    invoker: Arc<dyn ActionInvoker>,
    screen_guard: Option<Arc<dyn ScreenGuard>>,
    checks: Vec<Box<dyn ThreatCheck>>,
    clock: Arc<dyn Clock>,
}

impl SecurityCoreBuilder {
    pub fn with_check(mut self, check: Box<dyn ThreatCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_screen_guard(mut self, guard: Arc<dyn ScreenGuard>) -> Self {
        self.screen_guard = Some(guard);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> SecurityCore {
        let mode = Arc::new(ModeCoordinator::with_clock(Arc::clone(&self.clock)));

        let mut threats = ThreatEngine::new(Arc::clone(&self.store), Arc::clone(&mode))
            .with_clock(Arc::clone(&self.clock));
        for check in self.checks {
            threats = threats.with_check(check);
        }

        let mut emergency = EmergencyManager::new(self.store, self.invoker, Arc::clone(&mode))
            .with_clock(self.clock);
        if let Some(guard) = self.screen_guard {
            emergency = emergency.with_screen_guard(guard);
        }

        SecurityCore {
            mode,
            threats: Arc::new(threats),
            emergency: Arc::new(emergency),
        }
    }
}

// ============================================================================
// CORE
// ============================================================================

pub struct SecurityCore {
    mode: Arc<ModeCoordinator>,
    threats: Arc<ThreatEngine>,
    emergency: Arc<EmergencyManager>,
}

impl SecurityCore {
    pub fn builder(store: Arc<dyn ConfigStore>, invoker: Arc<dyn ActionInvoker>) -> SecurityCoreBuilder {
        SecurityCoreBuilder {
            store,
            invoker,
            screen_guard: None,
            checks: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Load persisted state for both engines; threat monitoring starts if enabled
    pub async fn initialize(&self) {
        self.emergency.initialize().await;
        self.threats.initialize().await;
        log::info!("Security core ready (mode: {})", self.mode.current());
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.threats.stop_monitoring();
    }

    pub fn threat_engine(&self) -> &Arc<ThreatEngine> {
        &self.threats
    }

    pub fn emergency_manager(&self) -> &Arc<EmergencyManager> {
        &self.emergency
    }

    pub fn mode_coordinator(&self) -> &Arc<ModeCoordinator> {
        &self.mode
    }

    // ========================================================================
    // MODE COMMANDS
    // ========================================================================

    pub fn get_mode(&self) -> SecurityMode {
        self.mode.current()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<SecurityMode> {
        self.mode.subscribe()
    }

    /// Normal <-> Stealth; no-op while an emergency is in progress
    pub fn toggle_mode(&self) -> SecurityMode {
        self.mode.toggle()
    }

    pub fn clear_restriction(&self) -> bool {
        self.mode.clear_restriction()
    }

    pub fn get_status(&self) -> CoreStatus {
        CoreStatus {
            mode: self.mode.snapshot(),
            security: self.threats.security_status(),
            protection: self.emergency.protection_status(),
        }
    }

    // ========================================================================
    // THREAT COMMANDS
    // ========================================================================

    pub fn get_security_status(&self) -> SecurityStatus {
        self.threats.security_status()
    }

    pub async fn start_monitoring(&self) {
        self.threats.start_monitoring().await;
    }

    pub fn stop_monitoring(&self) -> bool {
        self.threats.stop_monitoring()
    }

    pub async fn perform_security_scan(&self) -> Vec<SecurityThreat> {
        self.threats.perform_security_scan().await
    }

    pub async fn report_threat(&self, threat: SecurityThreat) {
        self.threats.report_threat(threat).await;
    }

    /// Latest threats first
    pub fn get_threat_log(&self, limit: Option<usize>) -> Vec<SecurityThreat> {
        let limit = limit.unwrap_or(50);
        self.threats.threats().into_iter().rev().take(limit).collect()
    }

    pub async fn clear_threat_log(&self) {
        self.threats.clear_threat_log().await;
    }

    pub async fn log_user_action(
        &self,
        action: &str,
        duration_ms: Option<u64>,
        details: Option<String>,
    ) -> Option<SecurityThreat> {
        self.threats.log_user_action(action, duration_ms, details).await
    }

    pub fn get_usage_patterns(&self) -> Vec<UsagePattern> {
        self.threats.usage_patterns()
    }

    pub fn get_response_history(&self) -> Vec<ResponseRecord> {
        self.threats.response_history()
    }

    pub fn get_threat_config(&self) -> ThreatDetectionConfig {
        self.threats.config()
    }

    pub async fn update_threat_config(&self, config: ThreatDetectionConfig) {
        self.threats.update_config(config).await;
    }

    pub async fn set_sensitivity(&self, level: SensitivityLevel) {
        self.threats.set_sensitivity(level).await;
    }

    pub async fn add_custom_pattern(&self, pattern: CustomThreatPattern) -> Result<(), String> {
        self.threats.add_custom_pattern(pattern).await.map_err(|e| e.to_string())
    }

    pub async fn remove_custom_pattern(&self, id: &str) -> bool {
        self.threats.remove_custom_pattern(id).await
    }

    pub async fn add_response_action(&self, action: ThreatResponseAction) -> Result<(), String> {
        self.threats.add_response_action(action).await.map_err(|e| e.to_string())
    }

    /// False for protected or unknown actions
    pub async fn remove_response_action(&self, id: &str) -> bool {
        self.threats.remove_response_action(id).await
    }

    pub async fn set_response_action_enabled(&self, id: &str, enabled: bool) -> bool {
        self.threats.set_response_action_enabled(id, enabled).await
    }

    // ========================================================================
    // EMERGENCY COMMANDS
    // ========================================================================

    pub async fn register_tap(&self) -> TapOutcome {
        self.emergency.register_tap().await
    }

    pub async fn trigger_emergency(&self) -> Result<EmergencyEvent, String> {
        self.emergency
            .trigger_emergency(EmergencySource::Manual)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn deactivate_emergency(&self) -> bool {
        self.emergency.deactivate_emergency()
    }

    pub fn get_protection_status(&self) -> ProtectionStatus {
        self.emergency.protection_status()
    }

    pub fn get_emergency_config(&self) -> EmergencyConfig {
        self.emergency.config()
    }

    pub async fn update_emergency_config(&self, config: EmergencyConfig) {
        self.emergency.update_config(config).await;
    }

    pub fn get_emergency_log(&self) -> Vec<EmergencyEvent> {
        self.emergency.event_log()
    }

    pub fn get_contacts(&self) -> Vec<EmergencyContact> {
        self.emergency.contacts()
    }

    pub async fn add_contact(&self, contact: EmergencyContact) -> Result<(), String> {
        self.emergency.add_contact(contact).await.map_err(|e| e.to_string())
    }

    pub async fn update_contact(&self, contact: EmergencyContact) -> Result<(), String> {
        self.emergency.update_contact(contact).await.map_err(|e| e.to_string())
    }

    pub async fn remove_contact(&self, id: &str) -> bool {
        self.emergency.remove_contact(id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
