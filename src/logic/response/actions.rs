//! Auto-Response Evaluation
//!
//! Mục đích: chọn và thực thi response actions khi số threats gần đây
//! đạt `alertThreshold`.

use chrono::{DateTime, Utc};

use super::types::{ResponseKind, ResponseRecord, ThreatResponseAction};
use crate::logic::mode::ModeCoordinator;
use crate::logic::threat::SecurityThreat;

/// Rules that fire for `recent` threats: none below the threshold, otherwise every
/// enabled rule matching at least one of them, with the threats it matched.
pub fn select_actions<'a>(
    actions: &'a [ThreatResponseAction],
    recent: &[&SecurityThreat],
    alert_threshold: usize,
) -> Vec<(&'a ThreatResponseAction, Vec<SecurityThreat>)> {
    if recent.len() < alert_threshold.max(1) {
        return Vec::new();
    }

    actions
        .iter()
        .filter(|a| a.enabled)
        .filter_map(|action| {
            let matched: Vec<SecurityThreat> = recent
                .iter()
                .filter(|t| action.matches(t))
                .map(|t| (*t).clone())
                .collect();
            if matched.is_empty() {
                None
            } else {
                Some((action, matched))
            }
        })
        .collect()
}

/// Carry out one rule
pub fn execute_action(
    action: &ThreatResponseAction,
    matched: &[SecurityThreat],
    mode: &ModeCoordinator,
    now: DateTime<Utc>,
) -> ResponseRecord {
    let summary = summarize(matched);

    let message = match &action.action {
        ResponseKind::Notify => {
            log::warn!("[SECURITY ALERT] {}: {}", action.name, summary);
            format!("Notified: {}", summary)
        }
        ResponseKind::Log => {
            log::info!("[SECURITY LOG] {}: {}", action.name, summary);
            format!("Logged: {}", summary)
        }
        ResponseKind::Block => {
            mode.restrict(&format!("block: {}", action.name));
            format!("Blocked sensitive operations: {}", summary)
        }
        ResponseKind::Lockdown => {
            mode.lockdown(&format!("lockdown: {}", action.name));
            format!("Lockdown engaged: {}", summary)
        }
        ResponseKind::Custom { handler } => {
            log::info!("[SECURITY CUSTOM] {} -> handler '{}': {}", action.name, handler, summary);
            format!("Custom handler '{}': {}", handler, summary)
        }
    };

    ResponseRecord {
        action_id: action.id.clone(),
        action: action.action.clone(),
        threat_ids: matched.iter().map(|t| t.id).collect(),
        message,
        timestamp: now,
    }
}

fn summarize(threats: &[SecurityThreat]) -> String {
    match threats {
        [] => "no threats".to_string(),
        [one] => format!("{} ({})", one.description, one.severity),
        many => format!(
            "{} threats, highest severity {}",
            many.len(),
            many.iter().map(|t| t.severity).max().map(|s| s.as_str()).unwrap_or("low")
        ),
    }
}

// ============================================================================
// TESTS
// ============================================================================
