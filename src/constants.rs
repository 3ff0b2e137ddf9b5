//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Timing windows của hai engine đều nằm ở đây.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Safeguard";

// ============================================
// Threat engine defaults
// ============================================

/// Default interval between scheduled security scans (seconds)
pub const DEFAULT_SCAN_INTERVAL: u64 = 30;

/// Maximum threats kept in the threat log
pub const MAX_THREAT_LOG: usize = 50;

/// Maximum entries kept in the usage-pattern log
pub const MAX_USAGE_PATTERNS: usize = 100;

/// Maximum fired response actions kept in memory
pub const MAX_RESPONSE_HISTORY: usize = 50;

/// Window used when counting threats for auto-response (seconds)
pub const AUTO_RESPONSE_WINDOW_SECS: i64 = 5 * 60;

/// Window used for risk scoring (seconds)
pub const RISK_WINDOW_SECS: i64 = 60 * 60;

/// Recent user actions offered to custom patterns as signals (seconds)
pub const SIGNAL_WINDOW_SECS: i64 = 5 * 60;

/// Window used to count identical user actions (seconds)
pub const USAGE_BURST_WINDOW_SECS: i64 = 60;

/// Identical actions above this count inside the burst window are unusual
pub const USAGE_BURST_LIMIT: usize = 10;

// ============================================
// Emergency defaults
// ============================================

/// Panic gesture rolling window / debounce (milliseconds)
pub const PANIC_GESTURE_WINDOW_MS: i64 = 3_000;

/// Taps inside the window needed to fire the panic gesture
pub const PANIC_GESTURE_TAPS: usize = 5;

/// Maximum entries kept in the emergency event log
pub const MAX_EMERGENCY_LOG: usize = 10;

/// Contacts that receive the emergency text
pub const MAX_TEXT_RECIPIENTS: usize = 3;

/// Default emergency text
pub const DEFAULT_EMERGENCY_MESSAGE: &str =
    "I need help. This is an emergency. Please contact me or call for help immediately.";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get data directory from environment or use the platform default
pub fn get_data_dir() -> PathBuf {
    std::env::var("SAFEGUARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("safeguard")
        })
}

/// Get scan interval from environment or use default
pub fn get_scan_interval() -> u64 {
    std::env::var("SAFEGUARD_SCAN_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SCAN_INTERVAL)
}

/// Check if background monitoring is enabled
pub fn is_monitoring_enabled() -> bool {
    std::env::var("SAFEGUARD_MONITORING")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}
