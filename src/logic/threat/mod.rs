//! Threat Module
//!
//! Quét môi trường runtime, ghi threat log, tính risk level và
//! kích hoạt response actions.
//!
//! ## Structure
//! - `types`: Core types (SecurityThreat, ThreatDetectionConfig, etc.)
//! - `rules`: Thresholds and sensitivity presets
//! - `checks`: Pluggable check provider trait
//! - `patterns`: Custom pattern matching
//! - `risk`: Risk scoring
//! - `engine`: ThreatEngine (monitoring, scans, usage anomalies, policy CRUD)
//!
//! ## Usage
//! ```ignore
//! let engine = Arc::new(ThreatEngine::new(store, mode).with_check(Box::new(my_check)));
//! engine.initialize().await;
//!
//! match engine.risk_level() {
//!     RiskLevel::Low => {}
//!     RiskLevel::Medium => warn_user(),
//!     RiskLevel::High => lock_sensitive_screens(),
//! }
//! ```

pub mod types;
pub mod rules;
pub mod checks;
pub mod patterns;
pub mod risk;
pub mod engine;


// Re-export main types for convenience
pub use types::{
    CustomThreatPattern,
    RiskLevel,
    SecurityStatus,
    SecurityThreat,
    SensitivityLevel,
    Severity,
    ThreatDetails,
    ThreatDetectionConfig,
    ThreatType,
    UsagePattern,
};

pub use checks::{CheckError, CheckKind, ThreatCheck};

pub use rules::alert_threshold_for;

pub use risk::compute_risk_level;

pub use engine::ThreatEngine;
