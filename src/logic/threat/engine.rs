//! Threat Detection Engine
//!
//! State machine: Idle -> Monitoring -> Idle (stop), với scan định kỳ khi Monitoring.
//!
//! - Scan: gọi từng enabled check provider, match custom patterns, ghi threat log
//! - Usage anomaly: > 10 action giống nhau trong 60s => UnusualPattern threat
//! - Auto-response: số threats trong 5 phút >= alertThreshold => fire response actions
//!
//! Failures never escape: check errors are skipped, store errors are logged and
//! the in-memory state stays as is.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::checks::ThreatCheck;
use super::patterns::{match_patterns, PatternMatcher};
use super::risk::{compute_risk_level, within_window};
use super::rules::{alert_threshold_for, USAGE_BURST_SEVERITY};
use super::types::*;
use crate::constants::{
    AUTO_RESPONSE_WINDOW_SECS, MAX_RESPONSE_HISTORY, MAX_THREAT_LOG, MAX_USAGE_PATTERNS,
    SIGNAL_WINDOW_SECS, USAGE_BURST_LIMIT, USAGE_BURST_WINDOW_SECS,
};
use crate::logic::clock::{Clock, SystemClock};
use crate::logic::error::ConfigError;
use crate::logic::mode::ModeCoordinator;
use crate::logic::response::{self, ResponseRecord, ThreatResponseAction};
use crate::logic::scheduler::RepeatingTimer;
use crate::logic::storage::{keys, load_or_default, persist, ConfigStore};

// ============================================================================
// STATE
// ============================================================================

#[derive(Default)]
struct EngineState {
    config: ThreatDetectionConfig,
    threats: VecDeque<SecurityThreat>,
    usage: VecDeque<UsagePattern>,
    responses: VecDeque<ResponseRecord>,
    last_scan: Option<DateTime<Utc>>,
}

/// Holds the in-flight flag for one scan; cleared on drop, also when the
/// scan future is dropped mid-way (timeout, select, aborted task).
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Push and evict the oldest entries beyond `max`
fn push_bounded<T>(log: &mut VecDeque<T>, item: T, max: usize) {
    log.push_back(item);
    while log.len() > max {
        log.pop_front();
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ThreatEngine {
    state: Mutex<EngineState>,
    checks: Vec<Box<dyn ThreatCheck>>,
    store: Arc<dyn ConfigStore>,
    mode: Arc<ModeCoordinator>,
    clock: Arc<dyn Clock>,
    monitoring: AtomicBool,
    scan_in_flight: AtomicBool,
    timer: Mutex<Option<RepeatingTimer>>,
}

impl ThreatEngine {
    pub fn new(store: Arc<dyn ConfigStore>, mode: Arc<ModeCoordinator>) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            checks: Vec::new(),
            store,
            mode,
            clock: Arc::new(SystemClock),
            monitoring: AtomicBool::new(false),
            scan_in_flight: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    pub fn with_check(mut self, check: Box<dyn ThreatCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Load config and logs (defaults on any failure), then start monitoring
    /// if the policy is enabled.
    pub async fn initialize(self: &Arc<Self>) {
        let store = self.store.as_ref();
        let mut config: ThreatDetectionConfig = load_or_default(store, keys::THREAT_CONFIG).await;
        let threats: Vec<SecurityThreat> = load_or_default(store, keys::THREAT_LOG).await;
        let usage: Vec<UsagePattern> = load_or_default(store, keys::USAGE_PATTERNS).await;

        normalize_config(&mut config);

        let enabled = config.is_enabled;
        {
            let mut state = self.state.lock();
            state.config = config;
            state.threats = threats.into_iter().collect();
            state.usage = usage.into_iter().collect();
            while state.threats.len() > MAX_THREAT_LOG {
                state.threats.pop_front();
            }
            while state.usage.len() > MAX_USAGE_PATTERNS {
                state.usage.pop_front();
            }
            log::info!(
                "Threat engine initialized ({} threats, {} usage patterns)",
                state.threats.len(),
                state.usage.len()
            );
        }

        if enabled && crate::constants::is_monitoring_enabled() {
            self.start_monitoring().await;
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::Acquire)
    }

    /// Scan now, then every `scanIntervalSecs`. Idempotent.
    pub async fn start_monitoring(self: &Arc<Self>) {
        if self.monitoring.swap(true, Ordering::AcqRel) {
            log::warn!("Threat monitoring already running");
            return;
        }
        log::info!("Threat monitoring started");

        self.perform_security_scan().await;

        // Stopped while the first scan was running
        if !self.is_monitoring() {
            return;
        }

        let period = StdDuration::from_secs(self.state.lock().config.scan_interval_secs.max(1));
        let weak: Weak<Self> = Arc::downgrade(self);
        let timer = RepeatingTimer::spawn(period, move || {
            let weak = weak.clone();
            async move {
                if let Some(engine) = weak.upgrade() {
                    if engine.is_monitoring() {
                        engine.perform_security_scan().await;
                    }
                }
            }
        });

        if let Some(previous) = self.timer.lock().replace(timer) {
            previous.cancel();
        }
    }

    /// Prevents the next scheduled scan. A scan already running completes.
    pub fn stop_monitoring(&self) -> bool {
        let was = self.monitoring.swap(false, Ordering::AcqRel);
        if let Some(timer) = self.timer.lock().take() {
            timer.cancel();
        }
        if was {
            log::info!("Threat monitoring stopped");
        }
        was
    }

    // ------------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------------

    /// Run enabled checks and custom patterns; returns the threats found.
    pub async fn perform_security_scan(&self) -> Vec<SecurityThreat> {
        let Some(_guard) = ScanGuard::acquire(&self.scan_in_flight) else {
            log::debug!("Security scan already in flight, skipping");
            return Vec::new();
        };

        self.run_scan().await
    }

    async fn run_scan(&self) -> Vec<SecurityThreat> {
        let config = self.state.lock().config.clone();
        if !config.is_enabled {
            log::debug!("Threat detection disabled, scan skipped");
            return Vec::new();
        }

        let mut found = Vec::new();

        for check in self.checks.iter().filter(|c| c.kind().is_enabled(&config)) {
            match check.check().await {
                Ok(Some(threat)) => {
                    log::warn!(
                        "[THREAT] {} reported {} ({}): {}",
                        check.name(),
                        threat.threat_type,
                        threat.severity,
                        threat.description
                    );
                    found.push(threat);
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Threat check '{}' ({}) failed, skipping: {}",
                    check.name(),
                    check.kind().as_str(),
                    e
                ),
            }
        }

        let now = self.clock.now();
        let signals = self.collect_signals(&found, now);
        found.extend(match_patterns(config.custom_patterns.values(), &signals, now));

        self.state.lock().last_scan = Some(now);

        if !found.is_empty() {
            self.record_threats(found.clone()).await;
        }
        log::debug!("Security scan complete: {} threats", found.len());
        found
    }

    /// Descriptions of this scan's threats + recently logged user actions
    fn collect_signals(&self, found: &[SecurityThreat], now: DateTime<Utc>) -> Vec<String> {
        let cutoff = now - Duration::seconds(SIGNAL_WINDOW_SECS);
        let state = self.state.lock();

        let mut signals: Vec<String> = found.iter().map(|t| t.description.clone()).collect();
        for pattern in state.usage.iter().filter(|p| p.timestamp >= cutoff) {
            if !signals.contains(&pattern.action) {
                signals.push(pattern.action.clone());
            }
        }
        signals
    }

    // ------------------------------------------------------------------------
    // Threat log
    // ------------------------------------------------------------------------

    /// Log a threat detected outside the scan (same path as scan results)
    pub async fn report_threat(&self, threat: SecurityThreat) {
        self.record_threats(vec![threat]).await;
    }

    async fn record_threats(&self, threats: Vec<SecurityThreat>) {
        let now = self.clock.now();

        let snapshot = {
            let mut state = self.state.lock();
            for threat in threats {
                push_bounded(&mut state.threats, threat, MAX_THREAT_LOG);
            }

            if state.config.auto_response_enabled {
                let records = self.evaluate_auto_response(&state, now);
                for record in records {
                    push_bounded(&mut state.responses, record, MAX_RESPONSE_HISTORY);
                }
            }

            state.threats.iter().cloned().collect::<Vec<_>>()
        };

        persist(self.store.as_ref(), keys::THREAT_LOG, &snapshot).await;
    }

    fn evaluate_auto_response(&self, state: &EngineState, now: DateTime<Utc>) -> Vec<ResponseRecord> {
        let log: Vec<SecurityThreat> = state.threats.iter().cloned().collect();
        let recent: Vec<&SecurityThreat> =
            within_window(&log, now, Duration::seconds(AUTO_RESPONSE_WINDOW_SECS)).collect();

        let selected = response::select_actions(
            &state.config.response_actions,
            &recent,
            state.config.alert_threshold,
        );
        if selected.is_empty() {
            return Vec::new();
        }

        log::warn!(
            "Auto-response: {} recent threats >= threshold {}, firing {} actions",
            recent.len(),
            state.config.alert_threshold,
            selected.len()
        );

        selected
            .into_iter()
            .map(|(action, matched)| response::execute_action(action, &matched, &self.mode, now))
            .collect()
    }

    pub fn threats(&self) -> Vec<SecurityThreat> {
        self.state.lock().threats.iter().cloned().collect()
    }

    pub fn recent_threats(&self, window: Duration) -> Vec<SecurityThreat> {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .threats
            .iter()
            .filter(|t| t.timestamp >= now - window)
            .cloned()
            .collect()
    }

    pub async fn clear_threat_log(&self) {
        self.state.lock().threats.clear();
        persist(self.store.as_ref(), keys::THREAT_LOG, &Vec::<SecurityThreat>::new()).await;
        log::info!("Threat log cleared");
    }

    pub fn response_history(&self) -> Vec<ResponseRecord> {
        self.state.lock().responses.iter().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Usage patterns
    // ------------------------------------------------------------------------

    /// Record a user action; returns the synthesized threat on a usage burst.
    pub async fn log_user_action(
        &self,
        action: &str,
        duration_ms: Option<u64>,
        details: Option<String>,
    ) -> Option<SecurityThreat> {
        let now = self.clock.now();

        let (burst, snapshot) = {
            let mut state = self.state.lock();
            push_bounded(
                &mut state.usage,
                UsagePattern {
                    timestamp: now,
                    action: action.to_string(),
                    duration_ms,
                    details,
                },
                MAX_USAGE_PATTERNS,
            );

            let cutoff = now - Duration::seconds(USAGE_BURST_WINDOW_SECS);
            let count = state
                .usage
                .iter()
                .filter(|p| p.action == action && p.timestamp >= cutoff)
                .count();

            let burst = (state.config.is_enabled
                && state.config.usage_pattern_detection
                && count > USAGE_BURST_LIMIT)
                .then(|| {
                    SecurityThreat::new(
                        ThreatType::UnusualPattern,
                        USAGE_BURST_SEVERITY,
                        format!("Unusual usage: '{}' repeated {} times in {}s", action, count, USAGE_BURST_WINDOW_SECS),
                        now,
                    )
                    .with_details(ThreatDetails::UsageBurst {
                        action: action.to_string(),
                        count,
                        window_secs: USAGE_BURST_WINDOW_SECS,
                    })
                });

            (burst, state.usage.iter().cloned().collect::<Vec<_>>())
        };

        persist(self.store.as_ref(), keys::USAGE_PATTERNS, &snapshot).await;

        if let Some(threat) = &burst {
            log::warn!("[THREAT] {}", threat.description);
            self.record_threats(vec![threat.clone()]).await;
        }
        burst
    }

    pub fn usage_patterns(&self) -> Vec<UsagePattern> {
        self.state.lock().usage.iter().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Risk / status
    // ------------------------------------------------------------------------

    pub fn risk_level(&self) -> RiskLevel {
        let now = self.clock.now();
        let log = self.threats();
        compute_risk_level(&log, now)
    }

    pub fn security_status(&self) -> SecurityStatus {
        let now = self.clock.now();
        let (log, last_scan) = {
            let state = self.state.lock();
            (state.threats.iter().cloned().collect::<Vec<_>>(), state.last_scan)
        };
        let recent = within_window(&log, now, Duration::seconds(AUTO_RESPONSE_WINDOW_SECS)).count();
        let snapshot = self.mode.snapshot();

        SecurityStatus {
            monitoring: self.is_monitoring(),
            risk_level: compute_risk_level(&log, now),
            total_threats: log.len(),
            recent_threats: recent,
            last_scan,
            last_threat: log.last().cloned(),
            mode: snapshot.mode,
            restricted: snapshot.restricted,
        }
    }

    // ------------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------------

    pub fn config(&self) -> ThreatDetectionConfig {
        self.state.lock().config.clone()
    }

    /// Replace the policy. `alertThreshold` is clamped to >= 1 and the
    /// protected response actions are restored if missing.
    pub async fn update_config(&self, mut config: ThreatDetectionConfig) {
        normalize_config(&mut config);
        self.state.lock().config = config;
        self.save_config().await;
    }

    pub async fn set_sensitivity(&self, level: SensitivityLevel) {
        {
            let mut state = self.state.lock();
            state.config.sensitivity_level = level;
            state.config.alert_threshold = alert_threshold_for(level);
        }
        log::info!("Sensitivity set to {:?} (threshold {})", level, alert_threshold_for(level));
        self.save_config().await;
    }

    pub async fn add_custom_pattern(&self, pattern: CustomThreatPattern) -> Result<(), ConfigError> {
        validate_pattern(&pattern)?;
        self.state
            .lock()
            .config
            .custom_patterns
            .insert(pattern.id.clone(), pattern);
        self.save_config().await;
        Ok(())
    }

    pub async fn update_custom_pattern(&self, pattern: CustomThreatPattern) -> Result<(), ConfigError> {
        validate_pattern(&pattern)?;
        {
            let mut state = self.state.lock();
            match state.config.custom_patterns.get_mut(&pattern.id) {
                Some(existing) => *existing = pattern,
                None => return Err(ConfigError::NotFound(pattern.id)),
            }
        }
        self.save_config().await;
        Ok(())
    }

    /// Logged threats keep their `patternId`; nothing else references the pattern.
    pub async fn remove_custom_pattern(&self, id: &str) -> bool {
        let removed = self.state.lock().config.custom_patterns.remove(id).is_some();
        if removed {
            self.save_config().await;
        }
        removed
    }

    /// Insert, or replace the rule with the same id
    pub async fn add_response_action(&self, action: ThreatResponseAction) -> Result<(), ConfigError> {
        if action.id.trim().is_empty() {
            return Err(ConfigError::InvalidAction("empty id".to_string()));
        }
        if action.threat_types.is_empty() {
            return Err(ConfigError::InvalidAction(format!("'{}' matches no threat types", action.id)));
        }
        {
            let mut state = self.state.lock();
            let actions = &mut state.config.response_actions;
            match actions.iter_mut().find(|a| a.id == action.id) {
                Some(existing) => *existing = action,
                None => actions.push(action),
            }
        }
        self.save_config().await;
        Ok(())
    }

    /// False for protected defaults and unknown ids; state unchanged.
    pub async fn remove_response_action(&self, id: &str) -> bool {
        if response::is_protected(id) {
            log::warn!("Refusing to remove protected response action '{}'", id);
            return false;
        }
        let removed = {
            let mut state = self.state.lock();
            let before = state.config.response_actions.len();
            state.config.response_actions.retain(|a| a.id != id);
            state.config.response_actions.len() != before
        };
        if removed {
            self.save_config().await;
        }
        removed
    }

    pub async fn set_response_action_enabled(&self, id: &str, enabled: bool) -> bool {
        let found = {
            let mut state = self.state.lock();
            match state.config.response_actions.iter_mut().find(|a| a.id == id) {
                Some(action) => {
                    action.enabled = enabled;
                    true
                }
                None => false,
            }
        };
        if found {
            self.save_config().await;
        }
        found
    }

    async fn save_config(&self) {
        let config = self.config();
        persist(self.store.as_ref(), keys::THREAT_CONFIG, &config).await;
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn validate_pattern(pattern: &CustomThreatPattern) -> Result<(), ConfigError> {
    if pattern.id.trim().is_empty() {
        return Err(ConfigError::InvalidPattern {
            id: pattern.id.clone(),
            message: "empty id".to_string(),
        });
    }
    PatternMatcher::compile(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern {
            id: pattern.id.clone(),
            message: e.to_string(),
        })
}

fn normalize_config(config: &mut ThreatDetectionConfig) {
    config.alert_threshold = config.alert_threshold.max(1);
    config.scan_interval_secs = config.scan_interval_secs.max(1);

    for default in response::default_actions() {
        if !config.response_actions.iter().any(|a| a.id == default.id) {
            config.response_actions.push(default);
        }
    }
}
