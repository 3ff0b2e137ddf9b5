//! Mode Coordinator
//!
//! Single authority cho security mode (Normal / Stealth / Emergency).
//! Threat engine và Emergency manager đều đọc/ghi qua đây, không giữ mode riêng.
//!
//! Transitions:
//! - `toggle()`: Normal <-> Stealth, no-op while Emergency
//! - `enter_emergency()`: from the emergency trigger path only
//! - `reset_to_stealth()`: quick-reset recovery, reachable from any mode
//! - `exit_emergency()`: Emergency -> Normal on deactivation
//!
//! Orthogonal to the mode, `Block`/`Lockdown` response actions put the
//! coordinator into a restricted state until `clear_restriction()`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::clock::{Clock, SystemClock};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SecurityMode {
    #[default]
    Normal,
    Stealth,
    Emergency,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::Normal => "normal",
            SecurityMode::Stealth => "stealth",
            SecurityMode::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only view for the UI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSnapshot {
    pub mode: SecurityMode,
    pub restricted: bool,
    pub restriction_reason: Option<String>,
    pub last_transition: Option<DateTime<Utc>>,
}

struct ModeState {
    mode: SecurityMode,
    restricted: bool,
    restriction_reason: Option<String>,
    last_transition: Option<DateTime<Utc>>,
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct ModeCoordinator {
    state: RwLock<ModeState>,
    tx: watch::Sender<SecurityMode>,
    clock: Arc<dyn Clock>,
}

impl Default for ModeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeCoordinator {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (tx, _rx) = watch::channel(SecurityMode::Normal);
        Self {
            state: RwLock::new(ModeState {
                mode: SecurityMode::Normal,
                restricted: false,
                restriction_reason: None,
                last_transition: None,
            }),
            tx,
            clock,
        }
    }

    pub fn current(&self) -> SecurityMode {
        self.state.read().mode
    }

    pub fn is_restricted(&self) -> bool {
        self.state.read().restricted
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        let state = self.state.read();
        ModeSnapshot {
            mode: state.mode,
            restricted: state.restricted,
            restriction_reason: state.restriction_reason.clone(),
            last_transition: state.last_transition,
        }
    }

    /// Observe mode changes
    pub fn subscribe(&self) -> watch::Receiver<SecurityMode> {
        self.tx.subscribe()
    }

    /// Flip Normal <-> Stealth. Returns the resulting mode.
    pub fn toggle(&self) -> SecurityMode {
        let (from, to) = self.apply(|mode| match mode {
            SecurityMode::Normal => SecurityMode::Stealth,
            SecurityMode::Stealth => SecurityMode::Normal,
            SecurityMode::Emergency => SecurityMode::Emergency,
        });
        if from == SecurityMode::Emergency {
            log::debug!("Toggle ignored while in emergency mode");
        }
        to
    }

    /// Policy gating happens in the emergency manager, not here
    pub fn enter_emergency(&self) {
        self.apply(|_| SecurityMode::Emergency);
    }

    /// Quick-reset recovery target
    pub fn reset_to_stealth(&self) {
        self.apply(|_| SecurityMode::Stealth);
    }

    /// Leave Emergency for Normal. No-op in any other mode.
    pub fn exit_emergency(&self) -> bool {
        let (from, _) = self.apply(|mode| match mode {
            SecurityMode::Emergency => SecurityMode::Normal,
            other => other,
        });
        from == SecurityMode::Emergency
    }

    pub fn restrict(&self, reason: &str) {
        let mut state = self.state.write();
        if !state.restricted {
            log::warn!("Security restriction engaged: {}", reason);
        }
        state.restricted = true;
        state.restriction_reason = Some(reason.to_string());
    }

    /// Restrict and move to Stealth, in one step. An active emergency keeps its mode.
    pub fn lockdown(&self, reason: &str) {
        self.restrict(reason);
        self.apply(|mode| match mode {
            SecurityMode::Emergency => SecurityMode::Emergency,
            _ => SecurityMode::Stealth,
        });
    }

    pub fn clear_restriction(&self) -> bool {
        let mut state = self.state.write();
        let was = state.restricted;
        state.restricted = false;
        state.restriction_reason = None;
        if was {
            log::info!("Security restriction cleared");
        }
        was
    }

    /// Read-decide-write under one write lock. Observers are notified inside the
    /// lock so they never see transitions out of order.
    fn apply<F>(&self, next: F) -> (SecurityMode, SecurityMode)
    where
        F: FnOnce(SecurityMode) -> SecurityMode,
    {
        let (from, to) = {
            let mut state = self.state.write();
            let from = state.mode;
            let to = next(from);
            if from != to {
                state.mode = to;
                state.last_transition = Some(self.clock.now());
                self.tx.send_replace(to);
            }
            (from, to)
        };

        if from != to {
            log::info!("Security mode: {} -> {}", from, to);
        }
        (from, to)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_normal() {
        let mode = ModeCoordinator::new();
        assert_eq!(mode.current(), SecurityMode::Normal);
        assert!(!mode.is_restricted());
        assert!(mode.snapshot().last_transition.is_none());
    }

    #[test]
    fn test_toggle_flips_normal_and_stealth() {
        let mode = ModeCoordinator::new();
        assert_eq!(mode.toggle(), SecurityMode::Stealth);
        assert_eq!(mode.toggle(), SecurityMode::Normal);
    }

    #[test]
    fn test_toggle_is_noop_in_emergency() {
        let mode = ModeCoordinator::new();
        mode.enter_emergency();
        assert_eq!(mode.toggle(), SecurityMode::Emergency);
        assert_eq!(mode.current(), SecurityMode::Emergency);
    }

    #[test]
    fn test_reset_to_stealth_from_emergency() {
        let mode = ModeCoordinator::new();
        mode.enter_emergency();
        mode.reset_to_stealth();
        assert_eq!(mode.current(), SecurityMode::Stealth);
        // Already left emergency, exit is a no-op
        assert!(!mode.exit_emergency());
        assert_eq!(mode.current(), SecurityMode::Stealth);
    }

    #[test]
    fn test_exit_emergency_returns_to_normal() {
        let mode = ModeCoordinator::new();
        mode.toggle();
        mode.enter_emergency();
        assert!(mode.exit_emergency());
        assert_eq!(mode.current(), SecurityMode::Normal);
    }

    #[test]
    fn test_restriction_is_orthogonal_to_mode() {
        let mode = ModeCoordinator::new();
        mode.restrict("lockdown: tamper");
        assert!(mode.is_restricted());
        assert_eq!(mode.current(), SecurityMode::Normal);
        assert_eq!(
            mode.snapshot().restriction_reason.as_deref(),
            Some("lockdown: tamper")
        );
        assert!(mode.clear_restriction());
        assert!(!mode.clear_restriction());
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let mode = ModeCoordinator::new();
        let rx = mode.subscribe();
        mode.toggle();
        assert_eq!(*rx.borrow(), SecurityMode::Stealth);
        mode.enter_emergency();
        assert_eq!(*rx.borrow(), SecurityMode::Emergency);
    }

    #[test]
    fn test_lockdown_moves_to_stealth_but_keeps_emergency() {
        let mode = ModeCoordinator::new();
        mode.lockdown("lockdown: tamper");
        assert!(mode.is_restricted());
        assert_eq!(mode.current(), SecurityMode::Stealth);

        mode.enter_emergency();
        mode.lockdown("lockdown: tamper");
        assert_eq!(mode.current(), SecurityMode::Emergency);
    }

    #[test]
    fn test_concurrent_toggles_never_undo_emergency() {
        let mode = Arc::new(ModeCoordinator::new());
        let rx = mode.subscribe();

        let togglers: Vec<_> = (0..4)
            .map(|_| {
                let mode = Arc::clone(&mode);
                std::thread::spawn(move || {
                    for _ in 0..20_000 {
                        mode.toggle();
                    }
                })
            })
            .collect();

        std::thread::sleep(std::time::Duration::from_millis(1));
        mode.enter_emergency();

        for handle in togglers {
            handle.join().unwrap();
        }
        assert_eq!(mode.current(), SecurityMode::Emergency);
        assert_eq!(*rx.borrow(), SecurityMode::Emergency);
    }
}
