//! Risk Scoring
//!
//! Deterministic, recomputed on every call. Input: threat log + now.

use chrono::{DateTime, Duration, Utc};

use super::rules::{HIGH_RISK_HIGH_COUNT, MEDIUM_RISK_TOTAL_COUNT};
use super::types::{RiskLevel, SecurityThreat, Severity};
use crate::constants::RISK_WINDOW_SECS;

/// Threats with timestamp inside `[now - window, now]`
pub fn within_window<'a>(
    threats: &'a [SecurityThreat],
    now: DateTime<Utc>,
    window: Duration,
) -> impl Iterator<Item = &'a SecurityThreat> + 'a {
    let cutoff = now - window;
    threats.iter().filter(move |t| t.timestamp >= cutoff)
}

/// - High: any Critical, or more than 2 High
/// - Medium: any High, or more than 3 threats
/// - Low: otherwise
///
/// Only threats from the last 60 minutes count.
pub fn compute_risk_level(threats: &[SecurityThreat], now: DateTime<Utc>) -> RiskLevel {
    let mut total = 0usize;
    let mut high = 0usize;
    let mut critical = 0usize;

    for threat in within_window(threats, now, Duration::seconds(RISK_WINDOW_SECS)) {
        total += 1;
        match threat.severity {
            Severity::Critical => critical += 1,
            Severity::High => high += 1,
            _ => {}
        }
    }

    if critical > 0 || high > HIGH_RISK_HIGH_COUNT {
        RiskLevel::High
    } else if high > 0 || total > MEDIUM_RISK_TOTAL_COUNT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
