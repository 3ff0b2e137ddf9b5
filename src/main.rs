//! Safeguard Security Core - Daemon Entry Point
//!
//! Chạy core với FileStore, logging invokers (no device access) và một
//! debug-build check, đến khi Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;

use safeguard_core::constants::{self, APP_NAME, APP_VERSION};
use safeguard_core::logic::emergency::{ActionInvoker, InvokeError};
use safeguard_core::logic::storage::FileStore;
use safeguard_core::logic::threat::{
    CheckError, CheckKind, SecurityThreat, Severity, ThreatCheck, ThreatDetails, ThreatType,
};
use safeguard_core::SecurityCore;

// ============================================================================
// HEADLESS COLLABORATORS
// ============================================================================

/// No telephony on a headless host: every action is only logged
struct LoggingInvoker;

#[async_trait]
impl ActionInvoker for LoggingInvoker {
    async fn place_call(&self, number: &str) -> Result<(), InvokeError> {
        log::warn!("[EMERGENCY] would call {}", number);
        Ok(())
    }

    async fn send_text(&self, number: &str, message: &str) -> Result<(), InvokeError> {
        log::warn!("[EMERGENCY] would text {}: {}", number, message);
        Ok(())
    }

    async fn share_location(&self) -> Result<(), InvokeError> {
        Err(InvokeError::Unavailable("no location provider".to_string()))
    }
}

/// Flags binaries built with debug assertions
struct DebugBuildCheck;

#[async_trait]
impl ThreatCheck for DebugBuildCheck {
    fn name(&self) -> &str {
        "debug_build"
    }

    fn kind(&self) -> CheckKind {
        CheckKind::Debugging
    }

    async fn check(&self) -> Result<Option<SecurityThreat>, CheckError> {
        if !cfg!(debug_assertions) {
            return Ok(None);
        }
        Ok(Some(
            SecurityThreat::new(
                ThreatType::Debugging,
                Severity::Low,
                "Running a debug build",
                Utc::now(),
            )
            .with_details(ThreatDetails::Debugger {
                indicator: "debug_assertions".to_string(),
            }),
        ))
    }
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let store = FileStore::default_location();
    log::info!("Data directory: {}", store.root().display());
    if !constants::is_monitoring_enabled() {
        log::info!("Background monitoring disabled by SAFEGUARD_MONITORING");
    }

    let core = SecurityCore::builder(Arc::new(store), Arc::new(LoggingInvoker))
        .with_check(Box::new(DebugBuildCheck))
        .build();
    core.initialize().await;

    let status = core.get_status();
    log::info!(
        "Risk level: {}, {} threats logged, {} emergency contacts",
        status.security.risk_level.as_str(),
        status.security.total_threats,
        status.protection.contact_count
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    log::info!("Shutting down...");
    core.shutdown();
    Ok(())
}
